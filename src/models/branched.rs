use super::continued_fraction::ContinuedFraction;
use super::depth::determine_depth;
use super::traits::{default_names, MemeticModel, MutationOutcome, UNKNOWN_FITNESS};
use crate::engines::evaluation::safe_ops::{self, NumericResult};
use crate::engines::generation::RunContext;
use crate::error::{MemeticoError, Result};
use crate::types::RecombineMethod;
use std::fmt;

/// Continued fraction whose terms are themselves continued fractions.
///
/// Flat positions run through the terms in order, each term contributing
/// its own `param_count()` positions.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchedFraction {
    depth: usize,
    iv_count: usize,
    branch_depth: usize,
    terms: Vec<ContinuedFraction>,
    fitness: f64,
    error: f64,
}

impl BranchedFraction {
    pub fn from_terms(terms: Vec<ContinuedFraction>) -> Result<Self> {
        if terms.len() % 2 == 0 {
            return Err(MemeticoError::Validation(format!(
                "A branched fraction needs an odd number of terms, got {}",
                terms.len()
            )));
        }
        let iv_count = terms[0].iv_count();
        if terms.iter().any(|t| t.iv_count() != iv_count) {
            return Err(MemeticoError::Validation(
                "All branched terms must share the same variables".to_string(),
            ));
        }
        Ok(Self {
            depth: terms.len() / 2,
            iv_count,
            branch_depth: terms[0].depth(),
            terms,
            fitness: UNKNOWN_FITNESS,
            error: UNKNOWN_FITNESS,
        })
    }

    pub fn random(iv_count: usize, ctx: &mut RunContext) -> Result<Self> {
        let depth = determine_depth(ctx)?;
        let branch_depth = ctx.config.model.branch_depth;
        let mut terms = Vec::with_capacity(2 * depth + 1);
        for _ in 0..2 * depth + 1 {
            terms.push(ContinuedFraction::random_with_depth(iv_count, branch_depth, ctx)?);
        }
        Ok(Self {
            depth,
            iv_count,
            branch_depth,
            terms,
            fitness: UNKNOWN_FITNESS,
            error: UNKNOWN_FITNESS,
        })
    }

    pub fn iv_count(&self) -> usize {
        self.iv_count
    }

    pub fn frac_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn terms(&self) -> &[ContinuedFraction] {
        &self.terms
    }

    /// `(term, position within term)` for a flat index
    pub fn locate(&self, pos: usize) -> (usize, usize) {
        let mut offset = pos;
        for (index, term) in self.terms.iter().enumerate() {
            let count = term.param_count();
            if offset < count {
                return (index, offset);
            }
            offset -= count;
        }
        // Past the end: point one beyond the last term so indexing panics
        // the same way a slice would.
        (self.terms.len(), offset)
    }

    pub fn set_depth(&mut self, depth: usize, ctx: &mut RunContext) -> Result<()> {
        let frac_terms = 2 * depth + 1;
        self.terms.truncate(frac_terms);
        while self.terms.len() < frac_terms {
            self.terms.push(ContinuedFraction::random_with_depth(
                self.iv_count,
                self.branch_depth,
                ctx,
            )?);
        }
        self.depth = depth;
        Ok(())
    }

    fn format_from(&self, index: usize, names: &[String]) -> String {
        let g = format!("[{}]", self.terms[index].to_named_string(names));
        if index + 1 >= self.terms.len() {
            return g;
        }
        let h = format!("[{}]", self.terms[index + 1].to_named_string(names));
        format!("{}+{}/({})", g, h, self.format_from(index + 2, names))
    }
}

impl MemeticModel for BranchedFraction {
    fn param_count(&self) -> usize {
        self.terms.iter().map(|t| t.param_count()).sum()
    }

    fn get_value(&self, pos: usize) -> f64 {
        let (t, p) = self.locate(pos);
        self.terms[t].get_value(p)
    }

    fn set_value(&mut self, pos: usize, value: f64) {
        let (t, p) = self.locate(pos);
        self.terms[t].set_value(p, value);
    }

    fn get_active(&self, pos: usize) -> bool {
        let (t, p) = self.locate(pos);
        self.terms[t].get_active(p)
    }

    fn set_active(&mut self, pos: usize, active: bool) {
        let (t, p) = self.locate(pos);
        self.terms[t].set_active(p, active);
    }

    fn depth(&self) -> usize {
        self.depth
    }

    fn evaluate(&self, values: &[f64]) -> NumericResult {
        let last = self.terms.len() - 1;
        let mut ret = self.terms[last].evaluate(values)?;
        let mut index = last;
        while index >= 2 {
            let numerator = self.terms[index - 1].evaluate(values)?;
            let whole = self.terms[index - 2].evaluate(values)?;
            ret = safe_ops::add(whole, safe_ops::divide(numerator, ret)?)?;
            index -= 2;
        }
        Ok(ret)
    }

    fn fitness(&self) -> f64 {
        self.fitness
    }

    fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }

    fn error(&self) -> f64 {
        self.error
    }

    fn set_error(&mut self, error: f64) {
        self.error = error;
    }

    /// Mutates one uniformly chosen term under its own policy, judged by the
    /// fitness of the whole branched model.
    fn mutate(&mut self, pocket_fitness: f64, ctx: &mut RunContext) -> Result<MutationOutcome> {
        let index = ctx.random.index(self.terms.len())?;
        let fitness = self.fitness;
        let term = &mut self.terms[index];
        term.set_fitness(fitness);
        let outcome = term.mutate(pocket_fitness, ctx)?;
        self.reset_fitness();
        self.sanitise();
        Ok(outcome)
    }

    fn recombine(
        &mut self,
        m1: &Self,
        m2: &Self,
        method: Option<RecombineMethod>,
        ctx: &mut RunContext,
    ) -> Result<()> {
        let method = match method {
            Some(method) => method,
            None => RecombineMethod::from_index(ctx.random.int(0, 2)?),
        };
        let common = self.terms.len().min(m1.terms.len()).min(m2.terms.len());
        for index in 0..common {
            self.terms[index].recombine(&m1.terms[index], &m2.terms[index], Some(method), ctx)?;
        }
        self.reset_fitness();
        Ok(())
    }

    fn sanitise(&mut self) {
        for term in self.terms.iter_mut() {
            term.sanitise();
        }
    }

    fn to_named_string(&self, names: &[String]) -> String {
        self.format_from(0, names)
    }
}

impl fmt::Display for BranchedFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_named_string(&default_names(self.iv_count)))
    }
}
