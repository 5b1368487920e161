//! loglik_optimizer::types — numeric aliases and pre-wired solver types.
//!
//! Every optimizer module speaks in terms of these aliases instead of raw
//! `ndarray` / argmin generics. Parameters and gradients are `Array1<f64>`
//! column vectors of the same length; the scalar objective handed to argmin
//! is always the cost `c(θ) = -ℓ(θ)`.
use argmin::solver::{
    linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
    quasinewton::LBFGS,
};
use ndarray::Array1;
use std::collections::HashMap;

/// Unconstrained parameter vector `θ`.
pub type Theta = Array1<f64>;

/// Gradient vector, same shape as [`Theta`].
pub type Grad = Array1<f64>;

/// Scalar objective value (`c(θ) = -ℓ(θ)` inside argmin).
pub type Cost = f64;

/// Function-evaluation counters reported by argmin (e.g. `"cost_count"`).
pub type FnEvalMap = HashMap<String, u64>;

/// Default L-BFGS history size.
pub const DEFAULT_LBFGS_MEM: usize = 7;

pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;

pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;

pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Theta, Grad, Cost>;

pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;
