use super::element::Element;
use super::traits::{default_names, MemeticModel, MutationOutcome, UNKNOWN_FITNESS};
use crate::engines::evaluation::safe_ops::{self, NumericResult};
use crate::engines::generation::RunContext;
use crate::error::{MemeticoError, Result};
use crate::types::RecombineMethod;
use std::fmt;

/// Linear model `c1*x1 + ... + cn*xn + c0`.
///
/// Holds one [`Element`] per independent variable followed by the constant.
/// The number of elements is fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Regression {
    params: Vec<Element>,
    fitness: f64,
    error: f64,
}

impl Regression {
    /// All-zero, all-inactive regression over `iv_count` variables
    pub fn new(iv_count: usize) -> Self {
        Self {
            params: vec![Element::default(); iv_count + 1],
            fitness: UNKNOWN_FITNESS,
            error: UNKNOWN_FITNESS,
        }
    }

    pub fn from_elements(params: Vec<Element>) -> Result<Self> {
        if params.is_empty() {
            return Err(MemeticoError::Validation(
                "A regression needs at least the constant element".to_string(),
            ));
        }
        Ok(Self {
            params,
            fitness: UNKNOWN_FITNESS,
            error: UNKNOWN_FITNESS,
        })
    }

    /// Random coefficients, each variable active on a coin flip, constant active
    pub fn random(iv_count: usize, ctx: &mut RunContext) -> Result<Self> {
        let mut model = Self::new(iv_count);
        model.randomise_values(ctx)?;
        for pos in 0..iv_count {
            model.params[pos].active = ctx.random.coin()?;
        }
        model.sanitise();
        Ok(model)
    }

    pub fn iv_count(&self) -> usize {
        self.params.len() - 1
    }

    pub fn constant_position(&self) -> usize {
        self.params.len() - 1
    }

    pub fn elements(&self) -> &[Element] {
        &self.params
    }

    pub fn element(&self, pos: usize) -> &Element {
        &self.params[pos]
    }

    pub fn element_mut(&mut self, pos: usize) -> &mut Element {
        &mut self.params[pos]
    }

    pub fn randomise_values(&mut self, ctx: &mut RunContext) -> Result<()> {
        for pos in 0..self.params.len() {
            self.randomise_value(pos, ctx)?;
        }
        Ok(())
    }

    /// Draw an integer coefficient from the configured range
    pub fn randomise_value(&mut self, pos: usize, ctx: &mut RunContext) -> Result<()> {
        let (lower, upper) = (ctx.config.model.rand_lower, ctx.config.model.rand_upper);
        self.params[pos].value = ctx.random.int(lower, upper)? as f64;
        Ok(())
    }

    fn check_shape(&self, other: &Regression) -> Result<()> {
        if self.params.len() != other.params.len() {
            return Err(MemeticoError::Validation(format!(
                "Cannot recombine regressions of {} and {} parameters",
                self.params.len(),
                other.params.len()
            )));
        }
        Ok(())
    }

    fn format_with(&self, names: &[String]) -> String {
        let mut out = String::from("(");
        let mut first = true;
        let constant = self.constant_position();
        for (pos, element) in self.params.iter().enumerate() {
            if !element.active {
                continue;
            }
            let value = element.value;
            if !first || value < 0.0 {
                out.push(if value < 0.0 { '-' } else { '+' });
            }
            let magnitude = value.abs();
            if pos == constant {
                out.push_str(&magnitude.to_string());
            } else {
                let name = names
                    .get(pos)
                    .cloned()
                    .unwrap_or_else(|| format!("x{}", pos + 1));
                if magnitude == 1.0 {
                    out.push_str(&name);
                } else {
                    out.push_str(&format!("{}*{}", magnitude, name));
                }
            }
            first = false;
        }
        if first {
            out.push('0');
        }
        out.push(')');
        out
    }
}

impl MemeticModel for Regression {
    fn param_count(&self) -> usize {
        self.params.len()
    }

    fn get_value(&self, pos: usize) -> f64 {
        self.params[pos].value
    }

    fn set_value(&mut self, pos: usize, value: f64) {
        self.params[pos].value = value;
    }

    fn get_active(&self, pos: usize) -> bool {
        self.params[pos].active
    }

    fn set_active(&mut self, pos: usize, active: bool) {
        self.params[pos].active = active;
    }

    fn depth(&self) -> usize {
        0
    }

    fn evaluate(&self, values: &[f64]) -> NumericResult {
        let constant = self.constant_position();
        let mut ret = 0.0;
        for (element, x) in self.params[..constant].iter().zip(values) {
            if element.active {
                ret = safe_ops::add(ret, safe_ops::multiply(element.value, *x)?)?;
            }
        }
        if self.params[constant].active {
            ret = safe_ops::add(ret, self.params[constant].value)?;
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

    fn mutate(&mut self, _pocket_fitness: f64, ctx: &mut RunContext) -> Result<MutationOutcome> {
        let pos = ctx.random.index(self.params.len())?;
        self.params[pos].toggle();
        self.reset_fitness();
        Ok(MutationOutcome::Toggle)
    }

    /// Active flags follow `method`; values of slots active in both parents
    /// are blended as `m1 + k * (m2 - m1) / 3` with `k` drawn from `[-1, 4]`,
    /// slots active in one parent copy that parent's value.
    fn recombine(
        &mut self,
        m1: &Self,
        m2: &Self,
        method: Option<RecombineMethod>,
        ctx: &mut RunContext,
    ) -> Result<()> {
        self.check_shape(m1)?;
        self.check_shape(m2)?;
        let method = match method {
            Some(method) => method,
            None => RecombineMethod::from_index(ctx.random.int(0, 2)?),
        };

        for pos in 0..self.params.len() {
            let (a, b) = (m1.params[pos], m2.params[pos]);
            let active = method.combine(a.active, b.active);
            self.params[pos].active = active;
            if !active {
                continue;
            }
            self.params[pos].value = match (a.active, b.active) {
                (true, true) => {
                    let k = ctx.random.int(-1, 4)? as f64;
                    a.value + k * (b.value - a.value) / 3.0
                }
                (true, false) => a.value,
                (false, true) => b.value,
                (false, false) => self.params[pos].value,
            };
        }

        self.reset_fitness();
        Ok(())
    }

    fn sanitise(&mut self) {
        let constant = self.constant_position();
        self.params[constant].active = true;
    }

    fn to_named_string(&self, names: &[String]) -> String {
        self.format_with(names)
    }
}

impl fmt::Display for Regression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_with(&default_names(self.iv_count())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::utils::random::{Randomness, SequenceSource, SeededReal};

    fn scripted_ctx(ints: Vec<i64>) -> RunContext {
        let random = Randomness::from_sources(
            Box::new(SequenceSource::new(ints, 1)),
            Box::new(SeededReal::new(1)),
        );
        RunContext::with_randomness(AppConfig::default(), random).unwrap()
    }

    fn regression(values: [f64; 6], active: [bool; 6]) -> Regression {
        let params = values
            .iter()
            .zip(active.iter())
            .map(|(v, a)| Element::new(*v, *a))
            .collect();
        Regression::from_elements(params).unwrap()
    }

    fn parents() -> (Regression, Regression) {
        let m1 = regression(
            [1.0, 12.0, 2.0, -7.0, 3.0, -20.0],
            [true, false, true, false, true, true],
        );
        let m2 = regression(
            [0.0, -3.0, 0.0, 4.0, 3.0, -3.0],
            [false, true, false, true, true, true],
        );
        (m1, m2)
    }

    #[test]
    fn test_evaluate_integer_point() {
        let (m1, _) = parents();
        let y = m1.evaluate(&[4.0, 20.0, -3.0, 15.0, -3.0]).unwrap();
        assert_eq!(y, -31.0);
    }

    #[test]
    fn test_evaluate_real_point() {
        let (m1, _) = parents();
        let y = m1.evaluate(&[3.1, -43.2, -32.1, 34.2, -3.1]).unwrap();
        assert_eq!(y, -90.4);
    }

    #[test]
    fn test_union_recombination() {
        let (m1, m2) = parents();
        let mut child = Regression::new(5);
        let mut ctx = scripted_ctx(vec![3, 4]);
        child
            .recombine(&m1, &m2, Some(RecombineMethod::Union), &mut ctx)
            .unwrap();

        let active: Vec<bool> = child.elements().iter().map(|e| e.active).collect();
        assert_eq!(active, vec![false, false, false, false, true, true]);
        assert_eq!(child.get_value(4), 3.0);
        assert!((child.get_value(5) - 8.0 / 3.0).abs() < 1e-9);
        assert_eq!(child.fitness(), UNKNOWN_FITNESS);
    }

    #[test]
    fn test_intersection_recombination() {
        let (m1, m2) = parents();
        let mut child = Regression::new(5);
        let mut ctx = scripted_ctx(vec![1, 2]);
        child
            .recombine(&m1, &m2, Some(RecombineMethod::Intersection), &mut ctx)
            .unwrap();

        assert!(child.elements().iter().all(|e| e.active));
        let values: Vec<f64> = child.elements()[..5].iter().map(|e| e.value).collect();
        assert_eq!(values, vec![1.0, -3.0, 2.0, 4.0, 3.0]);
        assert!((child.get_value(5) + 26.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_symmetric_difference_recombination() {
        let (m1, m2) = parents();
        let mut child = Regression::new(5);
        let mut ctx = scripted_ctx(vec![]);
        child
            .recombine(&m1, &m2, Some(RecombineMethod::SymmetricDifference), &mut ctx)
            .unwrap();

        let active: Vec<bool> = child.elements().iter().map(|e| e.active).collect();
        assert_eq!(active, vec![true, true, true, true, false, false]);
        assert_eq!(child.get_value(1), -3.0);
        assert_eq!(child.get_value(3), 4.0);
    }

    #[test]
    fn test_recombination_draws_method_when_unset() {
        let (m1, m2) = parents();
        let mut child = Regression::new(5);
        // method index 0 (union), then the two blend factors
        let mut ctx = scripted_ctx(vec![0, 3, 4]);
        child.recombine(&m1, &m2, None, &mut ctx).unwrap();
        assert_eq!(child.count_active(), 2);
    }

    #[test]
    fn test_recombination_rejects_mismatched_shapes() {
        let (m1, _) = parents();
        let other = Regression::new(2);
        let mut child = Regression::new(5);
        let mut ctx = scripted_ctx(vec![]);
        assert!(child.recombine(&m1, &other, None, &mut ctx).is_err());
    }

    #[test]
    fn test_mutate_toggles_one_flag() {
        let (mut m1, _) = parents();
        let before = m1.clone();
        let mut ctx = scripted_ctx(vec![1]);
        let outcome = m1.mutate(0.0, &mut ctx).unwrap();
        assert_eq!(outcome, MutationOutcome::Toggle);
        assert!(m1.get_active(1));
        assert_eq!(m1.param_count(), before.param_count());
        let changed = (0..6).filter(|&p| m1.get_active(p) != before.get_active(p)).count();
        assert_eq!(changed, 1);
    }

    #[test]
    fn test_display() {
        let (m1, _) = parents();
        assert_eq!(m1.to_string(), "(x1+2*x3+3*x5-20)");
        assert_eq!(Regression::new(2).to_string(), "(0)");
    }
}
