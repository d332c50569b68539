//! Data Sanitization
//!
//! Boundary checks that keep the tracing model numerically well defined.
//!
//! Functions:
//! - Probability field validation for BKT parameters
//! - `p_known` clamping
//! - Non-finite value detection and filtering

use thiserror::Error;

use crate::types::{BktParams, MAX_P_KNOWN, MIN_P_KNOWN};

/// A BKT parameter violates its allowed range
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("{field} is not a finite number")]
    NonFinite { field: &'static str },

    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Check whether a slice contains NaN or Inf
pub fn has_invalid_values(arr: &[f64]) -> bool {
    arr.iter().any(|&x| x.is_nan() || x.is_infinite())
}

/// Copy only the finite values of a slice, preserving order
pub fn finite_values(arr: &[f64]) -> Vec<f64> {
    arr.iter().copied().filter(|x| x.is_finite()).collect()
}

/// Clamp `p_known` into [0.01, 0.99]
pub fn clamp_p_known(p: f64) -> f64 {
    p.clamp(MIN_P_KNOWN, MAX_P_KNOWN)
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ParamError> {
    if !value.is_finite() {
        return Err(ParamError::NonFinite { field });
    }
    if value < min || value > max {
        return Err(ParamError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Validate a parameter set before it reaches the updater.
///
/// `p_learn`, `p_slip` and `p_guess` must lie in [0, 1]; `p_known` must lie in
/// [0.01, 0.99] so the posterior denominator stays strictly positive.
pub fn validate_params(params: &BktParams) -> Result<(), ParamError> {
    check_range("p_learn", params.p_learn, 0.0, 1.0)?;
    check_range("p_slip", params.p_slip, 0.0, 1.0)?;
    check_range("p_guess", params.p_guess, 0.0, 1.0)?;
    check_range("p_known", params.p_known, MIN_P_KNOWN, MAX_P_KNOWN)?;
    Ok(())
}
