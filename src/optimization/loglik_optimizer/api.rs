//! High-level entry point: maximize a [`LogLikelihood`] with L-BFGS.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        OptimOutcome, Theta,
        adapter::NegLogLikProblem,
        builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::run_lbfgs,
        traits::{LineSearcher, LogLikelihood, MLEOptions},
    },
};

/// Maximize `ℓ(θ)` from `theta0` using L-BFGS with the configured line search.
///
/// # Behavior
/// - Validates the starting point with `f.check(&theta0, data)`.
/// - Wraps `(f, data)` in a [`NegLogLikProblem`] so argmin minimizes `-ℓ(θ)`.
/// - Builds the solver selected by `opts.line_searcher` and runs it.
///
/// # Errors
/// - Anything returned by `f.check`.
/// - Solver construction and runtime errors, as `OptError`.
///
/// # Returns
/// An [`OptimOutcome`]; `converged` is `false` when the iteration cap was hit
/// before a tolerance was met. That is not an error here, the caller decides.
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    let problem = NegLogLikProblem::new(f, data);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::{
        errors::OptError,
        loglik_optimizer::{Cost, Grad, Tolerances},
    };
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - `maximize` on a concave quadratic with both line searches.
    // - Propagation of `check` failures before any solver work.
    // -------------------------------------------------------------------------

    /// ℓ(θ) = -(θ₀ - 3)² - 2(θ₁ + 1)², maximum at (3, -1).
    struct Quadratic;

    impl LogLikelihood for Quadratic {
        type Data = ();

        fn value(&self, theta: &Theta, _: &()) -> OptResult<Cost> {
            Ok(-(theta[0] - 3.0).powi(2) - 2.0 * (theta[1] + 1.0).powi(2))
        }

        fn check(&self, theta: &Theta, _: &()) -> OptResult<()> {
            if theta.len() != 2 {
                return Err(OptError::ThetaLengthMismatch { expected: 2, actual: theta.len() });
            }
            Ok(())
        }

        fn grad(&self, theta: &Theta, _: &()) -> OptResult<Grad> {
            Ok(array![-2.0 * (theta[0] - 3.0), -4.0 * (theta[1] + 1.0)])
        }
    }

    #[test]
    // Purpose
    // -------
    // Both line searches reach the known maximizer and flag convergence.
    //
    // Given
    // -----
    // - `Quadratic`, θ₀ = [0, 0], tol_grad = 1e-8.
    //
    // Expect
    // ------
    // - θ̂ ≈ (3, -1), ℓ(θ̂) ≈ 0, `converged == true`.
    fn maximize_finds_quadratic_optimum_with_both_line_searches() {
        for ls in [LineSearcher::MoreThuente, LineSearcher::HagerZhang] {
            let tols = Tolerances::new(Some(1e-8), None, Some(200)).unwrap();
            let opts = MLEOptions::new(tols, ls, false, None).unwrap();

            let out = maximize(&Quadratic, array![0.0, 0.0], &(), &opts).unwrap();

            assert!(out.converged, "{ls:?} did not converge: {}", out.status);
            assert_relative_eq!(out.theta_hat[0], 3.0, epsilon = 1e-6);
            assert_relative_eq!(out.theta_hat[1], -1.0, epsilon = 1e-6);
            assert_relative_eq!(out.value, 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn maximize_propagates_check_failure() {
        let opts = MLEOptions::default();
        let err = maximize(&Quadratic, array![0.0], &(), &opts).unwrap_err();
        assert_eq!(err, OptError::ThetaLengthMismatch { expected: 2, actual: 1 });
    }
}
