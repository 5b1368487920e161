//! Public surface of the log-likelihood optimizer.
//!
//! - [`LogLikelihood`]: implemented by an estimator's objective.
//! - [`MLEOptions`] / [`Tolerances`]: validated solver configuration.
//! - [`LineSearcher`]: line search used inside L-BFGS.
//! - [`OptimOutcome`]: normalized result of [`maximize`](super::maximize).
//!
//! Convention: callers *maximize* `ℓ(θ)`; the adapter hands argmin the cost
//! `c(θ) = -ℓ(θ)`. Analytic gradients are gradients of `ℓ`, never of `c`.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        Cost, FnEvalMap, Grad, Theta,
        validation::{validate_theta_hat, validate_value, verify_tol_cost, verify_tol_grad},
    },
};
use argmin::core::{TerminationReason, TerminationStatus};
use argmin_math::ArgminL2Norm;
use std::str::FromStr;

/// Log-likelihood interface consumed by [`maximize`](super::maximize).
///
/// - `value(&Theta, &Data) -> OptResult<Cost>`: evaluate `ℓ(θ)`.
/// - `check(&Theta, &Data) -> OptResult<()>`: reject an unusable starting
///   point or data payload before the solver is built.
/// - `grad(&Theta, &Data) -> OptResult<Grad>`: analytic `∇ℓ(θ)`, checked for
///   length and finiteness by the adapter.
pub trait LogLikelihood {
    type Data: 'static;

    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost>;
    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()>;
    fn grad(&self, theta: &Theta, data: &Self::Data) -> OptResult<Grad>;
}

/// Line search used inside the L-BFGS solver.
///
/// Parses case-insensitively from `"MoreThuente"` / `"HagerZhang"`; any other
/// name is `OptError::InvalidLineSearch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSearcher {
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morethuente" => Ok(LineSearcher::MoreThuente),
            "hagerzhang" => Ok(LineSearcher::HagerZhang),
            _ => Err(OptError::InvalidLineSearch {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'MoreThuente' or 'HagerZhang'.",
            }),
        }
    }
}

/// Optimizer-level configuration.
///
/// Fields:
/// - `tols`: stopping rules, see [`Tolerances`].
/// - `line_searcher`: line search used by L-BFGS.
/// - `verbose`: attach the slog observer (only with the `obs_slog` feature).
/// - `lbfgs_mem`: L-BFGS history size; `None` uses
///   [`DEFAULT_LBFGS_MEM`](super::DEFAULT_LBFGS_MEM).
///
/// Default: `tol_grad = 1e-7`, no cost tolerance, `max_iter = 10_000`,
/// More–Thuente, quiet, default memory. The gradient tolerance is on the
/// per-transition (averaged) log-likelihood used by the reversible
/// estimator, so it does not scale with the amount of data.
#[derive(Debug, Clone, PartialEq)]
pub struct MLEOptions {
    pub tols: Tolerances,
    pub line_searcher: LineSearcher,
    pub verbose: bool,
    pub lbfgs_mem: Option<usize>,
}

impl MLEOptions {
    /// Bundle already-validated tolerances with solver choices.
    ///
    /// # Errors
    /// - `OptError::InvalidLBFGSMem` if `lbfgs_mem == Some(0)`.
    pub fn new(
        tols: Tolerances, line_searcher: LineSearcher, verbose: bool, lbfgs_mem: Option<usize>,
    ) -> OptResult<Self> {
        if let Some(m) = lbfgs_mem {
            if m == 0 {
                return Err(OptError::InvalidLBFGSMem {
                    mem: m,
                    reason: "L-BFGS memory must be greater than zero.",
                });
            }
        }
        Ok(Self { tols, line_searcher, verbose, lbfgs_mem })
    }
}

impl Default for MLEOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances { tol_grad: Some(1e-7), tol_cost: None, max_iter: Some(10_000) },
            line_searcher: LineSearcher::MoreThuente,
            verbose: false,
            lbfgs_mem: None,
        }
    }
}

/// Stopping rules for the optimizer.
///
/// - `tol_grad`: stop once `‖∇c(θ)‖` falls below this value.
/// - `tol_cost`: stop once the change in cost falls below this value.
/// - `max_iter`: hard iteration cap.
///
/// At least one of the three must be set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// Construct validated tolerances.
    ///
    /// # Errors
    /// - [`OptError::NoTolerancesProvided`] if all three are `None`.
    /// - [`OptError::InvalidTolGrad`] / [`OptError::InvalidTolCost`] for
    ///   non-finite or non-positive tolerances.
    /// - [`OptError::InvalidMaxIter`] if `max_iter == Some(0)`.
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol_cost(tol_cost)?;
        verify_tol_grad(tol_grad)?;
        if let Some(max_iter) = max_iter {
            if max_iter == 0 {
                return Err(OptError::InvalidMaxIter {
                    max_iter,
                    reason: "Maximum iterations must be greater than zero.",
                });
            }
        }
        Ok(Self { tol_grad, tol_cost, max_iter })
    }
}

/// Result of [`maximize`](super::maximize).
///
/// - `theta_hat`: best parameter vector found.
/// - `value`: best log-likelihood `ℓ(θ̂)` (not the cost).
/// - `converged`: `true` only when the solver met one of its tolerances;
///   hitting the iteration cap is reported as `false`.
/// - `status`: termination status as text.
/// - `iterations`, `fn_evals`: solver bookkeeping.
/// - `grad_norm`: norm of the last gradient, when available.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimOutcome {
    pub theta_hat: Theta,
    pub value: f64,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
}

impl OptimOutcome {
    /// Build a validated outcome from raw solver state.
    ///
    /// # Errors
    /// - `OptError::MissingThetaHat` / `OptError::InvalidThetaHat` for an
    ///   absent or non-finite `theta_hat`.
    /// - `OptError::NonFiniteCost` for a non-finite `value`.
    pub fn new(
        theta_hat_opt: Option<Theta>, value: f64, termination: TerminationStatus, iterations: u64,
        fn_evals: FnEvalMap, grad: Option<Grad>,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat_opt)?;
        validate_value(value)?;
        let (converged, status) = match termination {
            TerminationStatus::NotTerminated => (false, "Not terminated".to_string()),
            TerminationStatus::Terminated(reason) => {
                let converged = matches!(
                    reason,
                    TerminationReason::SolverConverged | TerminationReason::TargetCostReached
                );
                (converged, format!("{reason:?}"))
            }
        };
        let grad_norm = grad.map(|g| g.l2_norm());
        Ok(Self {
            theta_hat,
            value,
            converged,
            status,
            iterations: iterations as usize,
            fn_evals,
            grad_norm,
        })
    }
}
