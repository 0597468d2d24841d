//! Data-parallel evaluation of continued fractions.
//!
//! A fraction is compiled into a prefix-encoded program and run over a
//! row-major copy of the dataset on the rayon thread pool. Results match the
//! sequential objective to within [`TOLERANCE`] relative error; the order of
//! the final summation differs.

use super::safe_ops::{self, NumericResult};
use crate::data::DataSet;
use crate::error::NumericError;
use crate::models::{ContinuedFraction, MemeticModel, Regression};
use rayon::prelude::*;

pub const TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Add,
    Mul,
    Div,
    Const(f64),
    Var(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrefixProgram {
    ops: Vec<Op>,
}

impl PrefixProgram {
    pub fn compile(model: &ContinuedFraction) -> Self {
        let mut ops = Vec::new();
        Self::emit_fraction(model, 0, &mut ops);
        Self { ops }
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    fn emit_fraction(model: &ContinuedFraction, index: usize, ops: &mut Vec<Op>) {
        if index + 1 >= model.frac_terms() {
            Self::emit_term(model, index, ops);
            return;
        }
        ops.push(Op::Add);
        Self::emit_term(model, index, ops);
        ops.push(Op::Div);
        Self::emit_term(model, index + 1, ops);
        Self::emit_fraction(model, index + 2, ops);
    }

    /// Left-associated sum, the same order the sequential path adds in
    fn emit_term(model: &ContinuedFraction, index: usize, ops: &mut Vec<Op>) {
        let term: &Regression = model.term(index);
        let base = index * model.params_per_term();
        let mut items: Vec<[Op; 3]> = Vec::new();
        let mut constant = None;
        for param in 0..model.params_per_term() {
            if !model.get_active(base + param) {
                continue;
            }
            let value = term.element(param).value;
            if param == model.iv_count() {
                constant = Some(value);
            } else {
                items.push([Op::Mul, Op::Const(value), Op::Var(param)]);
            }
        }

        let count = items.len() + usize::from(constant.is_some());
        if count == 0 {
            ops.push(Op::Const(0.0));
            return;
        }
        ops.extend(std::iter::repeat(Op::Add).take(count - 1));
        for item in items {
            ops.extend_from_slice(&item);
        }
        if let Some(value) = constant {
            ops.push(Op::Const(value));
        }
    }

    pub fn evaluate(&self, row: &[f64]) -> NumericResult {
        let mut stack: Vec<f64> = Vec::with_capacity(self.ops.len());
        for op in self.ops.iter().rev() {
            let value = match *op {
                Op::Const(v) => v,
                Op::Var(i) => row[i],
                binary => {
                    let a = stack.pop().ok_or(NumericError::Domain)?;
                    let b = stack.pop().ok_or(NumericError::Domain)?;
                    match binary {
                        Op::Add => safe_ops::add(a, b)?,
                        Op::Mul => safe_ops::multiply(a, b)?,
                        _ => safe_ops::divide(a, b)?,
                    }
                }
            };
            stack.push(value);
        }
        stack.pop().ok_or(NumericError::Domain)
    }
}

/// Contiguous row-major copy of a dataset
#[derive(Debug, Clone, PartialEq)]
pub struct FlatDataSet {
    cols: usize,
    values: Vec<f64>,
    y: Vec<f64>,
    weight: Vec<f64>,
}

impl FlatDataSet {
    pub fn from_dataset(data: &DataSet) -> Self {
        let mut values = Vec::with_capacity(data.sample_count() * data.iv_count());
        for i in 0..data.sample_count() {
            values.extend_from_slice(data.sample(i));
        }
        Self {
            cols: data.iv_count(),
            values,
            y: data.targets().to_vec(),
            weight: (0..data.sample_count()).map(|i| data.weight(i)).collect(),
        }
    }

    pub fn rows(&self) -> usize {
        self.y.len()
    }

    fn row(&self, index: usize) -> &[f64] {
        &self.values[index * self.cols..(index + 1) * self.cols]
    }
}

/// Weighted mean squared error computed in parallel
pub fn accelerated_mse(program: &PrefixProgram, data: &FlatDataSet) -> NumericResult {
    let sum = (0..data.rows())
        .into_par_iter()
        .map(|i| {
            let predicted = program.evaluate(data.row(i))?;
            let diff = safe_ops::subtract(data.y[i], predicted)?;
            safe_ops::multiply(data.weight[i], safe_ops::multiply(diff, diff)?)
        })
        .try_reduce(|| 0.0, safe_ops::add)?;
    safe_ops::divide(sum, data.rows() as f64)
}
