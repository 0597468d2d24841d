use super::continued_fraction::ContinuedFraction;
use crate::engines::evaluation::safe_ops::NumericResult;
use crate::engines::generation::RunContext;
use crate::error::Result;
use crate::types::RecombineMethod;

/// Fitness and error of a model that has not been evaluated yet
pub const UNKNOWN_FITNESS: f64 = f64::MAX;

/// What a call to `mutate` actually did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Hard,    // global flag toggled
    Soft,    // local flag toggled
    Mask,    // fresh flat mask applied
    Toggle,  // single regression flag toggled
    Skipped, // nothing to mutate, model sanitised
}

/// Capability interface shared by every evolvable model.
///
/// Parameters are addressed through a flat index so that mutation,
/// recombination and local search can be written once for all model shapes.
pub trait MemeticModel {
    fn param_count(&self) -> usize;

    fn get_value(&self, pos: usize) -> f64;

    fn set_value(&mut self, pos: usize, value: f64);

    /// Whether the parameter at `pos` takes part in evaluation
    fn get_active(&self, pos: usize) -> bool;

    fn set_active(&mut self, pos: usize, active: bool);

    fn depth(&self) -> usize;

    fn evaluate(&self, values: &[f64]) -> NumericResult;

    fn fitness(&self) -> f64;

    fn set_fitness(&mut self, fitness: f64);

    fn error(&self) -> f64;

    fn set_error(&mut self, error: f64);

    /// Change active flags (and possibly coefficients) in place
    fn mutate(&mut self, pocket_fitness: f64, ctx: &mut RunContext) -> Result<MutationOutcome>;

    /// Overwrite `self` with a combination of `m1` and `m2`
    fn recombine(
        &mut self,
        m1: &Self,
        m2: &Self,
        method: Option<RecombineMethod>,
        ctx: &mut RunContext,
    ) -> Result<()>
    where
        Self: Sized;

    /// Force the model into a state that can always be evaluated
    fn sanitise(&mut self);

    /// Human readable form using the given independent variable names
    fn to_named_string(&self, names: &[String]) -> String;

    /// The plain continued fraction behind this model, if it is one
    fn as_fraction(&self) -> Option<&ContinuedFraction> {
        None
    }

    fn active_positions(&self) -> Vec<usize> {
        (0..self.param_count()).filter(|&p| self.get_active(p)).collect()
    }

    fn count_active(&self) -> usize {
        (0..self.param_count()).filter(|&p| self.get_active(p)).count()
    }

    fn reset_fitness(&mut self) {
        self.set_fitness(UNKNOWN_FITNESS);
        self.set_error(UNKNOWN_FITNESS);
    }
}

/// Default variable names `x1..xn`
pub fn default_names(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("x{}", i)).collect()
}
