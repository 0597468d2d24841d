use super::branched::BranchedFraction;
use super::continued_fraction::ContinuedFraction;
use super::regression::Regression;
use super::traits::{MemeticModel, MutationOutcome};
use crate::engines::evaluation::safe_ops::NumericResult;
use crate::engines::generation::RunContext;
use crate::error::{MemeticoError, Result};
use crate::types::{ModelKind, RecombineMethod};
use std::fmt;

/// The model shapes a population can evolve
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    Regression(Regression),
    Fraction(ContinuedFraction),
    Branched(BranchedFraction),
}

macro_rules! dispatch {
    ($self:expr, $model:ident => $body:expr) => {
        match $self {
            Candidate::Regression($model) => $body,
            Candidate::Fraction($model) => $body,
            Candidate::Branched($model) => $body,
        }
    };
}

impl Candidate {
    pub fn random(kind: ModelKind, iv_count: usize, ctx: &mut RunContext) -> Result<Self> {
        Ok(match kind {
            ModelKind::Regression => Candidate::Regression(Regression::random(iv_count, ctx)?),
            ModelKind::ContinuedFraction => Candidate::Fraction(ContinuedFraction::random(iv_count, ctx)?),
            ModelKind::Branched => Candidate::Branched(BranchedFraction::random(iv_count, ctx)?),
        })
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Candidate::Regression(_) => ModelKind::Regression,
            Candidate::Fraction(_) => ModelKind::ContinuedFraction,
            Candidate::Branched(_) => ModelKind::Branched,
        }
    }

    /// Resize nested models; regressions have no depth
    pub fn set_depth(&mut self, depth: usize, ctx: &mut RunContext) -> Result<()> {
        match self {
            Candidate::Regression(_) => Ok(()),
            Candidate::Fraction(model) => model.set_depth(depth, ctx),
            Candidate::Branched(model) => model.set_depth(depth, ctx),
        }
    }
}

impl MemeticModel for Candidate {
    fn param_count(&self) -> usize {
        dispatch!(self, m => m.param_count())
    }

    fn get_value(&self, pos: usize) -> f64 {
        dispatch!(self, m => m.get_value(pos))
    }

    fn set_value(&mut self, pos: usize, value: f64) {
        dispatch!(self, m => m.set_value(pos, value))
    }

    fn get_active(&self, pos: usize) -> bool {
        dispatch!(self, m => m.get_active(pos))
    }

    fn set_active(&mut self, pos: usize, active: bool) {
        dispatch!(self, m => m.set_active(pos, active))
    }

    fn depth(&self) -> usize {
        dispatch!(self, m => m.depth())
    }

    fn evaluate(&self, values: &[f64]) -> NumericResult {
        dispatch!(self, m => m.evaluate(values))
    }

    fn as_fraction(&self) -> Option<&ContinuedFraction> {
        match self {
            Candidate::Fraction(model) => Some(model),
            _ => None,
        }
    }

    fn fitness(&self) -> f64 {
        dispatch!(self, m => m.fitness())
    }

    fn set_fitness(&mut self, fitness: f64) {
        dispatch!(self, m => m.set_fitness(fitness))
    }

    fn error(&self) -> f64 {
        dispatch!(self, m => m.error())
    }

    fn set_error(&mut self, error: f64) {
        dispatch!(self, m => m.set_error(error))
    }

    fn mutate(&mut self, pocket_fitness: f64, ctx: &mut RunContext) -> Result<MutationOutcome> {
        dispatch!(self, m => m.mutate(pocket_fitness, ctx))
    }

    fn recombine(
        &mut self,
        m1: &Self,
        m2: &Self,
        method: Option<RecombineMethod>,
        ctx: &mut RunContext,
    ) -> Result<()> {
        match (self, m1, m2) {
            (Candidate::Regression(c), Candidate::Regression(a), Candidate::Regression(b)) => {
                c.recombine(a, b, method, ctx)
            }
            (Candidate::Fraction(c), Candidate::Fraction(a), Candidate::Fraction(b)) => {
                c.recombine(a, b, method, ctx)
            }
            (Candidate::Branched(c), Candidate::Branched(a), Candidate::Branched(b)) => {
                c.recombine(a, b, method, ctx)
            }
            (c, a, b) => Err(MemeticoError::Validation(format!(
                "Cannot recombine a {} with a {} and a {}",
                c.kind(),
                a.kind(),
                b.kind()
            ))),
        }
    }

    fn sanitise(&mut self) {
        dispatch!(self, m => m.sanitise())
    }

    fn to_named_string(&self, names: &[String]) -> String {
        dispatch!(self, m => m.to_named_string(names))
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, m => fmt::Display::fmt(m, f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_random_candidates_match_kind() {
        let mut ctx = RunContext::new(AppConfig::default()).unwrap();
        for kind in [ModelKind::Regression, ModelKind::ContinuedFraction, ModelKind::Branched] {
            let model = Candidate::random(kind, 2, &mut ctx).unwrap();
            assert_eq!(model.kind(), kind);
            assert!(model.count_active() > 0);
        }
    }

    #[test]
    fn test_mixed_recombination_is_rejected() {
        let mut ctx = RunContext::new(AppConfig::default()).unwrap();
        let a = Candidate::random(ModelKind::Regression, 2, &mut ctx).unwrap();
        let b = Candidate::random(ModelKind::ContinuedFraction, 2, &mut ctx).unwrap();
        let mut c = a.clone();
        assert!(c.recombine(&a, &b, None, &mut ctx).is_err());
    }
}
