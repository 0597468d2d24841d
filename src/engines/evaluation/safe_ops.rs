//! Checked floating point arithmetic.
//!
//! Each operation reports overflow, underflow, division by zero or a domain
//! error instead of silently producing an infinity or NaN.

use crate::error::NumericError;

pub type NumericResult = Result<f64, NumericError>;

fn check_inputs(values: &[f64]) -> Result<(), NumericError> {
    if values.iter().any(|v| v.is_nan()) {
        return Err(NumericError::Domain);
    }
    if values.iter().any(|v| v.is_infinite()) {
        return Err(NumericError::Overflow);
    }
    Ok(())
}

fn check_result(result: f64, nonzero_expected: bool) -> NumericResult {
    if result.is_nan() {
        return Err(NumericError::Domain);
    }
    if result.is_infinite() {
        return Err(NumericError::Overflow);
    }
    if nonzero_expected && result == 0.0 {
        return Err(NumericError::Underflow);
    }
    Ok(result)
}

pub fn add(a: f64, b: f64) -> NumericResult {
    check_inputs(&[a, b])?;
    check_result(a + b, false)
}

pub fn subtract(a: f64, b: f64) -> NumericResult {
    check_inputs(&[a, b])?;
    check_result(a - b, false)
}

pub fn multiply(a: f64, b: f64) -> NumericResult {
    check_inputs(&[a, b])?;
    check_result(a * b, a != 0.0 && b != 0.0)
}

/// `0 / 0` is defined as `0`; any other zero denominator is an error.
pub fn divide(a: f64, b: f64) -> NumericResult {
    check_inputs(&[a, b])?;
    if b == 0.0 {
        if a == 0.0 {
            return Ok(0.0);
        }
        return Err(NumericError::DivideByZero);
    }
    check_result(a / b, a != 0.0)
}

pub fn exp(x: f64) -> NumericResult {
    check_inputs(&[x])?;
    check_result(x.exp(), true)
}

pub fn pow(base: f64, exponent: f64) -> NumericResult {
    check_inputs(&[base, exponent])?;
    if base == 0.0 && exponent < 0.0 {
        return Err(NumericError::DivideByZero);
    }
    check_result(base.powf(exponent), base != 0.0)
}
