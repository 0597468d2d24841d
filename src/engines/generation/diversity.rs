//! Helpers for replacing near-duplicate solutions.

use super::agent::AgentTree;
use crate::data::DataSet;
use crate::engines::evaluation::Objective;
use crate::error::Result;
use crate::models::{Candidate, MemeticModel};
use crate::utils::random::Randomness;
use std::cmp::Ordering;

/// Where a model sits in the agent tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Pocket(usize),
    Current(usize),
}

impl Slot {
    /// Every pocket in arena order, then every current
    pub fn all(agent_count: usize) -> Vec<Slot> {
        (0..agent_count)
            .map(Slot::Pocket)
            .chain((0..agent_count).map(Slot::Current))
            .collect()
    }

    pub fn agent(&self) -> usize {
        match *self {
            Slot::Pocket(i) | Slot::Current(i) => i,
        }
    }

    pub fn model<'t>(&self, tree: &'t AgentTree) -> &'t Candidate {
        match *self {
            Slot::Pocket(i) => &tree.agent(i).pocket,
            Slot::Current(i) => &tree.agent(i).current,
        }
    }

    pub fn model_mut<'t>(&self, tree: &'t mut AgentTree) -> &'t mut Candidate {
        match *self {
            Slot::Pocket(i) => &mut tree.agent_mut(i).pocket,
            Slot::Current(i) => &mut tree.agent_mut(i).current,
        }
    }
}

/// Two slots and how far apart their predictions are
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarPair {
    pub distance: f64,
    pub first: usize,
    pub second: usize,
}

/// Every unordered pair of `slots`, most similar first
pub fn similar_pairs(tree: &AgentTree, slots: &[Slot], objective: &Objective, data: &DataSet) -> Vec<SimilarPair> {
    let mut pairs = Vec::with_capacity(slots.len() * slots.len().saturating_sub(1) / 2);
    for first in 0..slots.len() {
        for second in first + 1..slots.len() {
            let distance = objective.compare(slots[first].model(tree), slots[second].model(tree), data);
            pairs.push(SimilarPair {
                distance,
                first,
                second,
            });
        }
    }
    pairs.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
    pairs
}

/// A slot refilled by `distinct`, with its distance to the surviving
/// member of the pair before and after the refill
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Replacement {
    pub slot: Slot,
    pub before: f64,
    pub after: f64,
}

/// Whether `a` rather than `b` should be replaced.
///
/// The deeper model goes first, then the one with fewer active parameters,
/// then a coin flip.
pub fn replace_first(a: &Candidate, b: &Candidate, random: &mut Randomness) -> Result<bool> {
    match a.depth().cmp(&b.depth()) {
        Ordering::Greater => return Ok(true),
        Ordering::Less => return Ok(false),
        Ordering::Equal => {}
    }
    match a.count_active().cmp(&b.count_active()) {
        Ordering::Less => Ok(true),
        Ordering::Greater => Ok(false),
        Ordering::Equal => random.coin(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContinuedFraction, Element, Regression};
    use crate::types::MutationPolicy;

    fn term(values: [f64; 2]) -> Regression {
        Regression::from_elements(vec![Element::new(values[0], true), Element::new(values[1], true)]).unwrap()
    }

    fn fraction(depth: usize) -> Candidate {
        let terms = (0..2 * depth + 1).map(|_| term([1.0, 1.0])).collect();
        Candidate::Fraction(ContinuedFraction::from_terms(terms, MutationPolicy::HardSoft).unwrap())
    }

    #[test]
    fn test_slot_order() {
        let slots = Slot::all(2);
        assert_eq!(
            slots,
            vec![Slot::Pocket(0), Slot::Pocket(1), Slot::Current(0), Slot::Current(1)]
        );
        assert_eq!(slots[3].agent(), 1);
    }

    #[test]
    fn test_deeper_model_replaced_first() {
        let mut random = Randomness::seeded(1);
        let shallow = fraction(0);
        let deep = fraction(2);
        assert!(replace_first(&deep, &shallow, &mut random).unwrap());
        assert!(!replace_first(&shallow, &deep, &mut random).unwrap());
    }

    #[test]
    fn test_fewer_active_replaced_next() {
        let mut random = Randomness::seeded(1);
        let full = Candidate::Regression(term([1.0, 2.0]));
        let sparse = Candidate::Regression(
            Regression::from_elements(vec![Element::new(1.0, false), Element::new(2.0, true)]).unwrap(),
        );
        assert!(replace_first(&sparse, &full, &mut random).unwrap());
        assert!(!replace_first(&full, &sparse, &mut random).unwrap());
    }
}
