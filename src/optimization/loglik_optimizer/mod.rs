//! loglik_optimizer — argmin-backed maximization of log-likelihoods.
//!
//! Purpose
//! -------
//! Give estimators a single way to maximize a log-likelihood `ℓ(θ)` over an
//! unconstrained parameter vector: implement [`LogLikelihood`], pick
//! [`MLEOptions`], call [`maximize`]. The reversible-count MLE-TNC estimator
//! in `msm::reversible::tnc` is the main consumer.
//!
//! Key behaviors
//! -------------
//! - [`adapter::NegLogLikProblem`] turns `ℓ(θ)` into the argmin cost
//!   `c(θ) = -ℓ(θ)`, negating analytic gradients and rejecting gradients
//!   whose length does not match `θ`.
//! - [`builders`] construct L-BFGS with Hager–Zhang or More–Thuente line
//!   search and apply tolerances.
//! - [`run::run_lbfgs`] executes the solver and converts the final state
//!   into an [`OptimOutcome`], separating genuine convergence from the
//!   iteration cap.
//!
//! Invariants & assumptions
//! ------------------------
//! - Parameters live in an unconstrained space; any constraint (positivity,
//!   symmetry) is encoded by the objective's parameterization.
//! - Objectives report invalid inputs as [`OptError`](crate::optimization::errors::OptError)
//!   values, never panics.
//!
//! Conventions
//! -----------
//! - `OptimOutcome::value` is always `ℓ(θ̂)`, never the cost.
//! - No logging here except the optional `obs_slog` observer.

pub mod adapter;
pub mod api;
pub mod builders;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Theta};

pub mod prelude {
    pub use super::api::maximize;
    pub use super::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}
