use super::depth::determine_depth;
use super::element::Element;
use super::regression::Regression;
use super::traits::{default_names, MemeticModel, MutationOutcome, UNKNOWN_FITNESS};
use crate::engines::evaluation::safe_ops::{self, NumericResult};
use crate::engines::generation::RunContext;
use crate::error::{MemeticoError, Result};
use crate::types::{MutationPolicy, RecombineMethod};
use std::fmt;

/// Continued fraction `g0 + h0/(g1 + h1/(g2 + ...))` whose `2*depth+1`
/// terms are regressions over the same independent variables.
///
/// Parameters are exposed through a flat index: `pos / params_per_term`
/// selects the term and `pos % params_per_term` the slot within it. A slot
/// counts as active only when both its local flag and the global flag of its
/// variable are set.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuedFraction {
    depth: usize,
    iv_count: usize,
    terms: Vec<Regression>,
    global_active: Vec<bool>,
    policy: MutationPolicy,
    fitness: f64,
    error: f64,
}

impl ContinuedFraction {
    /// All-zero fraction with every flag cleared
    pub fn new(iv_count: usize, depth: usize, policy: MutationPolicy) -> Self {
        Self {
            depth,
            iv_count,
            terms: vec![Regression::new(iv_count); 2 * depth + 1],
            global_active: vec![false; iv_count + 1],
            policy,
            fitness: UNKNOWN_FITNESS,
            error: UNKNOWN_FITNESS,
        }
    }

    /// Build from explicit terms; a variable is globally active when any
    /// term uses it.
    pub fn from_terms(terms: Vec<Regression>, policy: MutationPolicy) -> Result<Self> {
        if terms.len() % 2 == 0 {
            return Err(MemeticoError::Validation(format!(
                "A continued fraction needs an odd number of terms, got {}",
                terms.len()
            )));
        }
        let iv_count = terms[0].iv_count();
        if terms.iter().any(|t| t.iv_count() != iv_count) {
            return Err(MemeticoError::Validation(
                "All fraction terms must share the same variables".to_string(),
            ));
        }
        let global_active = (0..=iv_count)
            .map(|p| terms.iter().any(|t| t.element(p).active))
            .collect();
        Ok(Self {
            depth: terms.len() / 2,
            iv_count,
            terms,
            global_active,
            policy,
            fitness: UNKNOWN_FITNESS,
            error: UNKNOWN_FITNESS,
        })
    }

    /// Randomised fraction whose depth follows the configured depth policy
    pub fn random(iv_count: usize, ctx: &mut RunContext) -> Result<Self> {
        let depth = determine_depth(ctx)?;
        Self::random_with_depth(iv_count, depth, ctx)
    }

    /// Random integer coefficients everywhere; each variable globally active
    /// with probability 2/3 and the constant always active.
    pub fn random_with_depth(iv_count: usize, depth: usize, ctx: &mut RunContext) -> Result<Self> {
        let mut model = Self::new(iv_count, depth, ctx.config.model.mutation);
        for term in model.terms.iter_mut() {
            term.randomise_values(ctx)?;
        }
        for iv in 0..iv_count {
            let active = ctx.random.int(0, 2)? != 0;
            model.set_global_active(iv, active);
        }
        model.set_global_active(iv_count, true);

        let strategy = model.policy.strategy();
        strategy.initialise(&mut model, ctx)?;
        Ok(model)
    }

    pub fn iv_count(&self) -> usize {
        self.iv_count
    }

    pub fn frac_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn params_per_term(&self) -> usize {
        self.iv_count + 1
    }

    pub fn policy(&self) -> MutationPolicy {
        self.policy
    }

    pub fn terms(&self) -> &[Regression] {
        &self.terms
    }

    pub fn term(&self, index: usize) -> &Regression {
        &self.terms[index]
    }

    pub fn term_mut(&mut self, index: usize) -> &mut Regression {
        &mut self.terms[index]
    }

    /// `(term, param)` for a flat index
    pub fn locate(&self, pos: usize) -> (usize, usize) {
        let ppt = self.params_per_term();
        (pos / ppt, pos % ppt)
    }

    pub fn global_active(&self, param: usize) -> bool {
        self.global_active[param]
    }

    /// Set the global flag and the matching local flag in every term
    pub fn set_global_active(&mut self, param: usize, active: bool) {
        self.global_active[param] = active;
        for term in self.terms.iter_mut() {
            term.element_mut(param).active = active;
        }
    }

    pub fn local_active(&self, pos: usize) -> bool {
        let (t, p) = self.locate(pos);
        self.terms[t].element(p).active
    }

    /// Flat positions whose variable is globally active, whatever the local flag
    pub fn globally_active_positions(&self) -> Vec<usize> {
        let ppt = self.params_per_term();
        (0..self.param_count())
            .filter(|pos| self.global_active[pos % ppt])
            .collect()
    }

    /// New coefficient for `param` in every term
    pub fn randomise_variable(&mut self, param: usize, ctx: &mut RunContext) -> Result<()> {
        for term in self.terms.iter_mut() {
            term.randomise_value(param, ctx)?;
        }
        Ok(())
    }

    /// Drop trailing terms or append freshly randomised ones
    pub fn set_depth(&mut self, depth: usize, ctx: &mut RunContext) -> Result<()> {
        let frac_terms = 2 * depth + 1;
        if frac_terms < self.terms.len() {
            self.terms.truncate(frac_terms);
        }
        while self.terms.len() < frac_terms {
            let mut term = Regression::new(self.iv_count);
            term.randomise_values(ctx)?;
            for (param, &active) in self.global_active.iter().enumerate() {
                term.element_mut(param).active = active;
            }
            self.terms.push(term);
        }
        if self.depth != depth {
            log::debug!("Fraction depth changed from {} to {}", self.depth, depth);
        }
        self.depth = depth;
        Ok(())
    }

    fn evaluate_term(&self, index: usize, values: &[f64]) -> NumericResult {
        let term = &self.terms[index];
        let mut ret = 0.0;
        for (param, x) in values.iter().enumerate().take(self.iv_count) {
            let element = term.element(param);
            if self.global_active[param] && element.active {
                ret = safe_ops::add(ret, safe_ops::multiply(element.value, *x)?)?;
            }
        }
        let constant = term.element(self.iv_count);
        if self.global_active[self.iv_count] && constant.active {
            ret = safe_ops::add(ret, constant.value)?;
        }
        Ok(ret)
    }

    /// Term with local flags gated by the global mask
    fn effective_term(&self, index: usize) -> Regression {
        let mut term = self.terms[index].clone();
        for (param, &global) in self.global_active.iter().enumerate() {
            let element: &mut Element = term.element_mut(param);
            element.active &= global;
        }
        term
    }

    fn format_from(&self, index: usize, names: &[String]) -> String {
        let g = self.effective_term(index).to_named_string(names);
        if index + 1 >= self.terms.len() {
            return g;
        }
        let h = self.effective_term(index + 1).to_named_string(names);
        let rest = self.format_from(index + 2, names);
        if index + 2 == self.terms.len() - 1 {
            format!("{}+{}/{}", g, h, rest)
        } else {
            format!("{}+{}/({})", g, h, rest)
        }
    }
}

impl MemeticModel for ContinuedFraction {
    fn param_count(&self) -> usize {
        self.terms.len() * self.params_per_term()
    }

    fn get_value(&self, pos: usize) -> f64 {
        let (t, p) = self.locate(pos);
        if !self.global_active[p] {
            return 0.0;
        }
        self.terms[t].element(p).value
    }

    fn set_value(&mut self, pos: usize, value: f64) {
        let (t, p) = self.locate(pos);
        self.terms[t].element_mut(p).value = value;
    }

    fn get_active(&self, pos: usize) -> bool {
        let (t, p) = self.locate(pos);
        self.global_active[p] && self.terms[t].element(p).active
    }

    fn set_active(&mut self, pos: usize, active: bool) {
        let (t, p) = self.locate(pos);
        self.terms[t].element_mut(p).active = active;
    }

    fn depth(&self) -> usize {
        self.depth
    }

    fn evaluate(&self, values: &[f64]) -> NumericResult {
        let last = self.terms.len() - 1;
        let mut ret = self.evaluate_term(last, values)?;
        let mut index = last;
        while index >= 2 {
            let numerator = self.evaluate_term(index - 1, values)?;
            let whole = self.evaluate_term(index - 2, values)?;
            ret = safe_ops::add(whole, safe_ops::divide(numerator, ret)?)?;
            index -= 2;
        }
        Ok(ret)
    }

    fn as_fraction(&self) -> Option<&ContinuedFraction> {
        Some(self)
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

    fn mutate(&mut self, pocket_fitness: f64, ctx: &mut RunContext) -> Result<MutationOutcome> {
        let strategy = self.policy.strategy();
        strategy.mutate(self, pocket_fitness, ctx)
    }

    /// One method is chosen for the whole fraction and applied to the global
    /// mask and to every term the three fractions have in common. Terms past
    /// the common prefix keep their current content.
    fn recombine(
        &mut self,
        m1: &Self,
        m2: &Self,
        method: Option<RecombineMethod>,
        ctx: &mut RunContext,
    ) -> Result<()> {
        if m1.iv_count != self.iv_count || m2.iv_count != self.iv_count {
            return Err(MemeticoError::Validation(format!(
                "Cannot recombine fractions over {}, {} and {} variables",
                self.iv_count, m1.iv_count, m2.iv_count
            )));
        }
        let method = match method {
            Some(method) => method,
            None => RecombineMethod::from_index(ctx.random.int(0, 2)?),
        };

        for param in 0..self.global_active.len() {
            self.global_active[param] = method.combine(m1.global_active[param], m2.global_active[param]);
        }

        let common = self.terms.len().min(m1.terms.len()).min(m2.terms.len());
        for index in 0..common {
            self.terms[index].recombine(&m1.terms[index], &m2.terms[index], Some(method), ctx)?;
        }

        self.sanitise();
        self.reset_fitness();
        Ok(())
    }

    fn sanitise(&mut self) {
        let constant = self.iv_count;
        self.global_active[constant] = true;
        for term in self.terms.iter_mut() {
            term.element_mut(constant).active = true;
        }
    }

    fn to_named_string(&self, names: &[String]) -> String {
        self.format_from(0, names)
    }
}

impl fmt::Display for ContinuedFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_named_string(&default_names(self.iv_count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn term(values: [f64; 6], active: [bool; 6]) -> Regression {
        let params = values
            .iter()
            .zip(active.iter())
            .map(|(v, a)| Element::new(*v, *a))
            .collect();
        Regression::from_elements(params).unwrap()
    }

    fn t1() -> Regression {
        term(
            [1.0, 12.0, 2.0, -7.0, 3.0, -20.0],
            [true, false, true, false, true, true],
        )
    }

    fn t2() -> Regression {
        term(
            [0.0, -3.0, 0.0, 4.0, 3.0, -3.0],
            [false, true, false, true, true, true],
        )
    }

    const INT_POINT: [f64; 5] = [4.0, 20.0, -3.0, 15.0, -3.0];
    const REAL_POINT: [f64; 5] = [3.1, -43.2, -32.1, 34.2, -3.1];

    fn ctx() -> RunContext {
        RunContext::new(AppConfig::default()).unwrap()
    }

    #[test]
    fn test_single_term_evaluation() {
        let frac = ContinuedFraction::from_terms(vec![t1()], MutationPolicy::HardSoft).unwrap();
        assert_eq!(frac.depth(), 0);
        assert_eq!(frac.evaluate(&INT_POINT).unwrap(), -31.0);
        assert_eq!(frac.evaluate(&REAL_POINT).unwrap(), -90.4);
    }

    #[test]
    fn test_nested_evaluation() {
        let frac = ContinuedFraction::from_terms(vec![t1(), t2(), t1()], MutationPolicy::HardSoft).unwrap();
        assert_eq!(frac.depth(), 1);
        assert!((frac.evaluate(&INT_POINT).unwrap() - (-30.612903225806452)).abs() < 1e-9);

        let deep = ContinuedFraction::from_terms(
            vec![t1(), t2(), t1(), t1(), t1(), t1(), t2()],
            MutationPolicy::HardSoft,
        )
        .unwrap();
        assert_eq!(deep.depth(), 3);
        assert!((deep.evaluate(&REAL_POINT).unwrap() - (-93.24215725564237)).abs() < 1e-9);
    }

    #[test]
    fn test_zero_denominator_is_numeric_failure() {
        let zero = term([0.0; 6], [false, false, false, false, false, true]);
        let frac = ContinuedFraction::from_terms(vec![t1(), t1(), zero], MutationPolicy::HardSoft).unwrap();
        assert!(frac.evaluate(&INT_POINT).is_err());
    }

    #[test]
    fn test_flat_index_matches_term_access() {
        let mut ctx = ctx();
        for depth in 0..5 {
            let frac = ContinuedFraction::random_with_depth(5, depth, &mut ctx).unwrap();
            assert_eq!(frac.frac_terms(), 2 * depth + 1);
            assert_eq!(frac.param_count(), frac.frac_terms() * 6);
            for pos in 0..frac.param_count() {
                let (t, p) = (pos / 6, pos % 6);
                let element = frac.term(t).element(p);
                let expected_active = frac.global_active(p) && element.active;
                assert_eq!(frac.get_active(pos), expected_active);
                if frac.global_active(p) {
                    assert_eq!(frac.get_value(pos), element.value);
                } else {
                    assert_eq!(frac.get_value(pos), 0.0);
                }
            }
        }
    }

    #[test]
    fn test_global_gates_local() {
        let mut frac = ContinuedFraction::from_terms(vec![t1(), t2(), t1()], MutationPolicy::HardSoft).unwrap();
        frac.set_global_active(0, false);
        for t in 0..3 {
            assert!(!frac.get_active(t * 6));
            assert!(!frac.local_active(t * 6));
        }
        // local flag alone is not enough
        frac.set_active(0, true);
        assert!(frac.local_active(0));
        assert!(!frac.get_active(0));
        assert!(frac.active_positions().iter().all(|&p| frac.global_active(p % 6)));
    }

    #[test]
    fn test_random_construction_keeps_constant_active() {
        let mut ctx = ctx();
        for _ in 0..20 {
            let frac = ContinuedFraction::random_with_depth(3, 2, &mut ctx).unwrap();
            assert!(frac.global_active(3));
            for t in 0..frac.frac_terms() {
                assert!(frac.get_active(t * 4 + 3));
                for p in 0..4 {
                    let v = frac.term(t).element(p).value;
                    assert!((1.0..=30.0).contains(&v));
                }
            }
        }
    }

    #[test]
    fn test_set_depth_truncates_and_grows() {
        let mut ctx = ctx();
        let mut frac = ContinuedFraction::random_with_depth(2, 3, &mut ctx).unwrap();
        let head = frac.term(0).clone();
        frac.set_depth(1, &mut ctx).unwrap();
        assert_eq!(frac.frac_terms(), 3);
        assert_eq!(frac.term(0), &head);

        frac.set_global_active(0, false);
        frac.set_depth(4, &mut ctx).unwrap();
        assert_eq!(frac.depth(), 4);
        assert_eq!(frac.frac_terms(), 9);
        assert_eq!(frac.param_count(), 27);
        for t in 3..9 {
            assert!(!frac.term(t).element(0).active);
            assert_eq!(frac.term(t).element(2).active, frac.global_active(2));
        }
    }

    #[test]
    fn test_recombine_uses_common_prefix() {
        let mut ctx = ctx();
        let m1 = ContinuedFraction::from_terms(vec![t1(), t1(), t1()], MutationPolicy::HardSoft).unwrap();
        let m2 = ContinuedFraction::from_terms(vec![t2()], MutationPolicy::HardSoft).unwrap();
        let mut child = ContinuedFraction::from_terms(vec![t2(), t2(), t2()], MutationPolicy::HardSoft).unwrap();
        let tail = child.term(1).clone();

        child
            .recombine(&m1, &m2, Some(RecombineMethod::SymmetricDifference), &mut ctx)
            .unwrap();
        assert_eq!(child.frac_terms(), 3);
        assert_eq!(child.term(1), &tail);
        // x1,x3 only in m1; x2,x4 only in m2; x5 in both
        assert!(child.global_active(0));
        assert!(child.global_active(1));
        assert!(!child.global_active(4));
        // constant forced back on
        assert!(child.global_active(5));
        assert_eq!(child.fitness(), UNKNOWN_FITNESS);
    }

    #[test]
    fn test_display() {
        let single = ContinuedFraction::from_terms(vec![t1()], MutationPolicy::HardSoft).unwrap();
        assert_eq!(single.to_string(), "(x1+2*x3+3*x5-20)");

        let frac = ContinuedFraction::from_terms(vec![t1(), t2(), t1(), t2(), t1()], MutationPolicy::HardSoft)
            .unwrap();
        let g = "(x1+2*x3+3*x5-20)";
        let h = "(-3*x2+4*x4+3*x5-3)";
        assert_eq!(frac.to_string(), format!("{g}+{h}/({g}+{h}/{g})"));
    }
}
