//! optimization — MLE layer and its error surface.
//!
//! Purpose
//! -------
//! Host the generic, argmin-backed log-likelihood optimizer
//! ([`loglik_optimizer`]) together with [`errors::OptError`]. Model code
//! implements `LogLikelihood`, chooses `MLEOptions`, and receives an
//! `OptimOutcome` without touching argmin types.
//!
//! Conventions
//! -----------
//! - Solvers maximize `ℓ(θ)` by minimizing `c(θ) = -ℓ(θ)`.
//! - Fallible entry points return `OptResult<T>`; higher layers convert
//!   into their own error types (`MSMError::Optimization`).

pub mod errors;
pub mod loglik_optimizer;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
}
