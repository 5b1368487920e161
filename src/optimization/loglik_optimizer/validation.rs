//! Consistency checks shared by the optimizer.
//!
//! Each helper returns the first violation it finds as a specific
//! [`OptError`] variant so callers can report exactly which tolerance,
//! gradient entry or estimate was unusable.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{Grad, Theta},
};

/// Validate an optional gradient-norm tolerance (finite and `> 0` when set).
pub fn verify_tol_grad(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

/// Validate an optional cost-change tolerance (finite and `> 0` when set).
pub fn verify_tol_cost(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

/// Validate a gradient against the parameter dimension and finiteness.
///
/// # Errors
/// - [`OptError::GradientDimMismatch`] if `grad.len() != dim`.
/// - [`OptError::InvalidGradient`] for the first non-finite entry.
pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    for (index, &value) in grad.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidGradient {
                index,
                value,
                reason: "Gradient elements must be finite.",
            });
        }
    }
    Ok(())
}

/// Validate and unwrap the solver's best parameter vector.
///
/// # Errors
/// - [`OptError::MissingThetaHat`] if the solver produced none.
/// - [`OptError::InvalidThetaHat`] for the first non-finite entry.
pub fn validate_theta_hat(theta_hat: Option<Theta>) -> OptResult<Theta> {
    let theta = theta_hat.ok_or(OptError::MissingThetaHat)?;
    for (index, &value) in theta.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidThetaHat {
                index,
                value,
                reason: "Parameter estimates must be finite.",
            });
        }
    }
    Ok(theta)
}

/// Validate that a log-likelihood value is finite.
pub fn validate_value(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCost { value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn validate_grad_reports_dimension_mismatch() {
        let grad = array![1.0, 2.0];
        assert_eq!(
            validate_grad(&grad, 3),
            Err(OptError::GradientDimMismatch { expected: 3, found: 2 })
        );
    }

    #[test]
    fn validate_grad_reports_first_non_finite_entry() {
        let grad = array![1.0, f64::INFINITY, f64::NAN];
        assert!(matches!(
            validate_grad(&grad, 3),
            Err(OptError::InvalidGradient { index: 1, .. })
        ));
    }

    #[test]
    fn optional_tolerances_accept_none() {
        assert!(verify_tol_grad(None).is_ok());
        assert!(verify_tol_cost(None).is_ok());
        assert!(verify_tol_cost(Some(0.0)).is_err());
    }

    #[test]
    fn validate_value_rejects_infinite_log_likelihood() {
        assert!(validate_value(-12.5).is_ok());
        assert_eq!(
            validate_value(f64::NEG_INFINITY),
            Err(OptError::NonFiniteCost { value: f64::NEG_INFINITY })
        );
    }
}
