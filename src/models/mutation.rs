//! Mutation policies for continued fractions.

use super::continued_fraction::ContinuedFraction;
use super::traits::{MemeticModel, MutationOutcome};
use crate::engines::generation::RunContext;
use crate::error::Result;
use crate::types::MutationPolicy;
use std::collections::{HashMap, HashSet};

/// Fitness ratio below which a model counts as nearly as good as its pocket
const HARD_LOWER_RATIO: f64 = 1.2;
/// Fitness ratio above which a model counts as far worse than its pocket
const HARD_UPPER_RATIO: f64 = 2.0;
/// Draws attempted before accepting an already seen mask
const MASK_ATTEMPTS: usize = 50;

pub trait MutationStrategy: Sync {
    fn name(&self) -> &'static str;

    /// Called once when a randomised model is built
    fn initialise(&self, model: &mut ContinuedFraction, ctx: &mut RunContext) -> Result<()>;

    /// Never changes the parameter count
    fn mutate(
        &self,
        model: &mut ContinuedFraction,
        pocket_fitness: f64,
        ctx: &mut RunContext,
    ) -> Result<MutationOutcome>;
}

impl MutationPolicy {
    pub fn strategy(&self) -> &'static dyn MutationStrategy {
        match self {
            MutationPolicy::HardSoft => &HardSoft,
            MutationPolicy::UniqueMask => &UniqueMask,
        }
    }
}

/// Toggles a variable across every term when the model is close to or far
/// from its pocket, otherwise toggles a single local flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardSoft;

impl HardSoft {
    fn is_hard(fitness: f64, pocket_fitness: f64) -> bool {
        fitness < HARD_LOWER_RATIO * pocket_fitness || fitness > HARD_UPPER_RATIO * pocket_fitness
    }
}

impl MutationStrategy for HardSoft {
    fn name(&self) -> &'static str {
        "hard-soft"
    }

    fn initialise(&self, model: &mut ContinuedFraction, _ctx: &mut RunContext) -> Result<()> {
        model.sanitise();
        Ok(())
    }

    fn mutate(
        &self,
        model: &mut ContinuedFraction,
        pocket_fitness: f64,
        ctx: &mut RunContext,
    ) -> Result<MutationOutcome> {
        let outcome = if Self::is_hard(model.fitness(), pocket_fitness) {
            if model.iv_count() == 0 {
                MutationOutcome::Skipped
            } else {
                let iv = ctx.random.index(model.iv_count())?;
                let active = !model.global_active(iv);
                model.set_global_active(iv, active);
                if active {
                    model.randomise_variable(iv, ctx)?;
                }
                MutationOutcome::Hard
            }
        } else {
            let positions = model.globally_active_positions();
            if positions.is_empty() {
                MutationOutcome::Skipped
            } else {
                let pos = positions[ctx.random.index(positions.len())?];
                let active = !model.local_active(pos);
                model.set_active(pos, active);
                MutationOutcome::Soft
            }
        };

        model.reset_fitness();
        model.sanitise();
        Ok(outcome)
    }
}

/// Applies a random flat active mask that has not been issued before for
/// the same parameter count.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniqueMask;

impl MutationStrategy for UniqueMask {
    fn name(&self) -> &'static str {
        "unique-mask"
    }

    fn initialise(&self, model: &mut ContinuedFraction, ctx: &mut RunContext) -> Result<()> {
        let fitness = model.fitness();
        self.mutate(model, fitness, ctx)?;
        Ok(())
    }

    fn mutate(
        &self,
        model: &mut ContinuedFraction,
        _pocket_fitness: f64,
        ctx: &mut RunContext,
    ) -> Result<MutationOutcome> {
        let size = model.param_count();
        if size == 0 {
            model.sanitise();
            return Ok(MutationOutcome::Skipped);
        }

        if ctx.masks.is_exhausted(size) {
            log::debug!("All {} masks of size {} issued, clearing registry", ctx.masks.issued(size), size);
            ctx.masks.clear(size);
        }

        let mut mask = Vec::with_capacity(size);
        for attempt in 0..MASK_ATTEMPTS {
            mask.clear();
            for _ in 0..size {
                mask.push(ctx.random.coin()?);
            }
            if !ctx.masks.contains(&mask) {
                break;
            }
            if attempt + 1 == MASK_ATTEMPTS {
                log::trace!("No unseen mask of size {} after {} attempts", size, MASK_ATTEMPTS);
            }
        }
        ctx.masks.insert(mask.clone());

        for param in 0..model.params_per_term() {
            model.set_global_active(param, true);
        }
        for (pos, &active) in mask.iter().enumerate() {
            model.set_active(pos, active);
        }

        model.reset_fitness();
        model.sanitise();
        Ok(MutationOutcome::Mask)
    }
}

/// Masks already issued by [`UniqueMask`], keyed by mask length.
///
/// Owned by one run so separate populations never share state.
#[derive(Debug, Clone, Default)]
pub struct MaskRegistry {
    seen: HashMap<usize, HashSet<Vec<bool>>>,
}

impl MaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, mask: &[bool]) -> bool {
        self.seen
            .get(&mask.len())
            .map_or(false, |set| set.contains(mask))
    }

    pub fn insert(&mut self, mask: Vec<bool>) -> bool {
        self.seen.entry(mask.len()).or_default().insert(mask)
    }

    pub fn issued(&self, size: usize) -> usize {
        self.seen.get(&size).map_or(0, HashSet::len)
    }

    /// True once every one of the `2^size` masks has been issued
    pub fn is_exhausted(&self, size: usize) -> bool {
        match u32::try_from(size).ok().and_then(|s| 1usize.checked_shl(s)) {
            Some(total) if size < usize::BITS as usize => self.issued(size) >= total,
            _ => false,
        }
    }

    pub fn clear(&mut self, size: usize) {
        self.seen.remove(&size);
    }
}
