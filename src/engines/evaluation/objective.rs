//! Objective functions. Lower is better everywhere.

use super::safe_ops::{self, NumericResult};
use crate::data::DataSet;
use crate::models::{MemeticModel, UNKNOWN_FITNESS};
use crate::types::ObjectiveKind;
#[cfg(feature = "gpu")]
use super::accelerated::{accelerated_mse, FlatDataSet, PrefixProgram};
#[cfg(feature = "gpu")]
use std::sync::Arc;

fn selection<'a>(data: &DataSet, selected: &'a [usize], all: &'a mut Vec<usize>) -> &'a [usize] {
    if selected.is_empty() {
        *all = data.all_indices();
        all
    } else {
        selected
    }
}

fn weighted_sum<M, F>(model: &M, data: &DataSet, selected: &[usize], residual: F) -> NumericResult
where
    M: MemeticModel + ?Sized,
    F: Fn(f64) -> NumericResult,
{
    let mut all = Vec::new();
    let indices = selection(data, selected, &mut all);
    let mut sum = 0.0;
    for &i in indices {
        let predicted = model.evaluate(data.sample(i))?;
        let diff = safe_ops::subtract(data.target(i), predicted)?;
        let term = safe_ops::multiply(data.weight(i), residual(diff)?)?;
        sum = safe_ops::add(sum, term)?;
    }
    safe_ops::divide(sum, indices.len() as f64)
}

/// Mean squared error over `selected` (all samples when empty)
pub fn mse<M: MemeticModel + ?Sized>(model: &M, data: &DataSet, selected: &[usize]) -> NumericResult {
    weighted_sum(model, data, selected, |d| safe_ops::multiply(d, d))
}

pub fn mae<M: MemeticModel + ?Sized>(model: &M, data: &DataSet, selected: &[usize]) -> NumericResult {
    weighted_sum(model, data, selected, |d| Ok(d.abs()))
}

pub fn rmse<M: MemeticModel + ?Sized>(model: &M, data: &DataSet, selected: &[usize]) -> NumericResult {
    Ok(mse(model, data, selected)?.sqrt())
}

/// Mean squared error divided by the variance of the selected targets
pub fn nmse<M: MemeticModel + ?Sized>(model: &M, data: &DataSet, selected: &[usize]) -> NumericResult {
    let mut all = Vec::new();
    let indices = selection(data, selected, &mut all);
    let n = indices.len() as f64;
    let mean = indices.iter().map(|&i| data.target(i)).sum::<f64>() / n;
    let variance = indices
        .iter()
        .map(|&i| (data.target(i) - mean).powi(2))
        .sum::<f64>()
        / n;
    safe_ops::divide(mse(model, data, indices)?, variance)
}

/// Objective selected by name at startup, plus the complexity penalty
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    pub kind: ObjectiveKind,
    pub penalty: f64,
    #[cfg(feature = "gpu")]
    flat: Option<Arc<FlatDataSet>>,
}

impl Objective {
    pub fn new(kind: ObjectiveKind, penalty: f64) -> Self {
        Self {
            kind,
            penalty,
            #[cfg(feature = "gpu")]
            flat: None,
        }
    }

    /// Score full-dataset MSE of continued fractions on the parallel
    /// evaluator. Only calls made with `data` itself take that path.
    #[cfg(feature = "gpu")]
    pub fn accelerated(mut self, data: &DataSet) -> Self {
        self.flat = Some(Arc::new(FlatDataSet::from_dataset(data)));
        self
    }

    #[cfg(feature = "gpu")]
    pub fn is_accelerated(&self) -> bool {
        self.flat.is_some()
    }

    #[cfg(feature = "gpu")]
    fn accelerated_error<M: MemeticModel + ?Sized>(
        &self,
        model: &M,
        data: &DataSet,
        selected: &[usize],
    ) -> Option<NumericResult> {
        let flat = self.flat.as_ref()?;
        if !matches!(self.kind, ObjectiveKind::Mse) || !selected.is_empty() || flat.rows() != data.sample_count() {
            return None;
        }
        let fraction = model.as_fraction()?;
        Some(accelerated_mse(&PrefixProgram::compile(fraction), flat))
    }

    fn raw_error<M: MemeticModel + ?Sized>(&self, model: &M, data: &DataSet, selected: &[usize]) -> NumericResult {
        #[cfg(feature = "gpu")]
        {
            if let Some(result) = self.accelerated_error(model, data, selected) {
                return result;
            }
        }
        match self.kind {
            ObjectiveKind::Mse => mse(model, data, selected),
            ObjectiveKind::Mae => mae(model, data, selected),
            ObjectiveKind::Rmse => rmse(model, data, selected),
            ObjectiveKind::Nmse => nmse(model, data, selected),
        }
    }

    /// Raw error; numeric failures map to the worst value
    pub fn error<M: MemeticModel + ?Sized>(&self, model: &M, data: &DataSet, selected: &[usize]) -> f64 {
        match self.raw_error(model, data, selected) {
            Ok(error) if error.is_finite() => error,
            Ok(_) => UNKNOWN_FITNESS,
            Err(e) => {
                log::trace!("Evaluation failed ({}), fitness degraded", e);
                UNKNOWN_FITNESS
            }
        }
    }

    /// `error * (1 + active_params * penalty)`
    pub fn fitness_for(&self, error: f64, active_params: usize) -> f64 {
        if error >= UNKNOWN_FITNESS {
            return UNKNOWN_FITNESS;
        }
        let fitness = error * (1.0 + active_params as f64 * self.penalty);
        if fitness.is_finite() {
            fitness
        } else {
            UNKNOWN_FITNESS
        }
    }

    /// Store error and penalised fitness on the model, returning the fitness
    pub fn evaluate<M: MemeticModel + ?Sized>(&self, model: &mut M, data: &DataSet, selected: &[usize]) -> f64 {
        let error = self.error(&*model, data, selected);
        let fitness = self.fitness_for(error, model.count_active());
        model.set_error(error);
        model.set_fitness(fitness);
        fitness
    }

    /// Mean squared difference between two models' predictions; smaller
    /// means more alike
    pub fn compare<M: MemeticModel + ?Sized>(&self, m1: &M, m2: &M, data: &DataSet) -> f64 {
        let mut sum = 0.0;
        for i in 0..data.sample_count() {
            let diff = match (m1.evaluate(data.sample(i)), m2.evaluate(data.sample(i))) {
                (Ok(a), Ok(b)) => safe_ops::subtract(a, b),
                (Err(e), _) | (_, Err(e)) => Err(e),
            };
            let next = diff
                .and_then(|d| safe_ops::multiply(d, d))
                .and_then(|sq| safe_ops::add(sum, sq));
            match next {
                Ok(v) => sum = v,
                Err(_) => return UNKNOWN_FITNESS,
            }
        }
        if data.sample_count() == 0 {
            return 0.0;
        }
        sum / data.sample_count() as f64
    }
}
