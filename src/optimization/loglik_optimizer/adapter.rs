//! Bridge from a [`LogLikelihood`] to argmin's minimization traits.
//!
//! argmin minimizes, so the problem exposes the cost `c(θ) = -ℓ(θ)` and the
//! negated analytic gradient. Non-finite costs and malformed gradients are
//! turned into [`OptError`]s before argmin sees them.
use crate::optimization::{
    errors::OptError,
    loglik_optimizer::{
        traits::LogLikelihood,
        types::{Cost, Grad, Theta},
        validation::validate_grad,
    },
};
use argmin::core::{CostFunction, Error, Gradient};

/// A log-likelihood and its data, viewed as an argmin cost/gradient problem.
#[derive(Debug, Clone)]
pub struct NegLogLikProblem<'a, F: LogLikelihood> {
    pub f: &'a F,
    pub data: &'a F::Data,
}

impl<'a, F: LogLikelihood> NegLogLikProblem<'a, F> {
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }
}

impl<'a, F: LogLikelihood> CostFunction for NegLogLikProblem<'a, F> {
    type Param = Theta;
    type Output = Cost;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let output = self.f.value(theta, self.data)?;
        if !output.is_finite() {
            return Err((OptError::NonFiniteCost { value: output }).into());
        }
        Ok(-output)
    }
}

impl<'a, F: LogLikelihood> Gradient for NegLogLikProblem<'a, F> {
    type Param = Theta;
    type Gradient = Grad;

    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        let g = self.f.grad(theta, self.data)?;
        validate_grad(&g, theta.len())?;
        Ok(-g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptResult;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Sign flip between log-likelihood and cost.
    // - Negation of analytic gradients.
    // - Rejection of gradients with the wrong length.
    // -------------------------------------------------------------------------

    /// ℓ(θ) = -Σ (θ_i - 1)², with analytic gradient.
    struct Bowl;

    impl LogLikelihood for Bowl {
        type Data = ();

        fn value(&self, theta: &Theta, _: &()) -> OptResult<Cost> {
            Ok(-theta.mapv(|t| (t - 1.0).powi(2)).sum())
        }

        fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
            Ok(())
        }

        fn grad(&self, theta: &Theta, _: &()) -> OptResult<Grad> {
            Ok(theta.mapv(|t| -2.0 * (t - 1.0)))
        }
    }

    /// Same objective whose gradient drops the last coordinate.
    struct TruncatedGrad;

    impl LogLikelihood for TruncatedGrad {
        type Data = ();

        fn value(&self, theta: &Theta, _: &()) -> OptResult<Cost> {
            Bowl.value(theta, &())
        }

        fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
            Ok(())
        }

        fn grad(&self, theta: &Theta, _: &()) -> OptResult<Grad> {
            let g = Bowl.grad(theta, &())?;
            Ok(g.slice(ndarray::s![..theta.len() - 1]).to_owned())
        }
    }

    #[test]
    // Purpose
    // -------
    // The cost is the negated log-likelihood and the analytic gradient is
    // negated with it.
    //
    // Given
    // -----
    // - `Bowl` at θ = [2, 0].
    //
    // Expect
    // ------
    // - cost = 2, gradient = [2, -2].
    fn cost_and_gradient_are_negated() {
        let problem = NegLogLikProblem::new(&Bowl, &());
        let theta = array![2.0, 0.0];

        assert_relative_eq!(problem.cost(&theta).unwrap(), 2.0);
        let g = problem.gradient(&theta).unwrap();
        assert_relative_eq!(g[0], 2.0);
        assert_relative_eq!(g[1], -2.0);
    }

    #[test]
    fn gradient_length_mismatch_is_rejected() {
        let problem = NegLogLikProblem::new(&TruncatedGrad, &());
        let err = problem.gradient(&array![2.0, 0.0]).expect_err("one entry short");
        assert_eq!(
            OptError::from(err),
            OptError::GradientDimMismatch { expected: 2, found: 1 }
        );
    }
}
