//! reversible — estimators of detailed-balance count matrices.
//!
//! Three strategies turn observed counts into a symmetric count matrix `X`
//! whose row-normalization satisfies `π_i T_ij = π_j T_ji`:
//!
//! - [`transpose_symmetrize`]: `½ (C + Cᵀ)`, applied before trimming.
//! - [`iterative_detailed_balance`]: maximum likelihood by fixed-point
//!   iteration, with an explicit non-convergence report.
//! - [`tnc_reversible_counts`]: the same likelihood maximized by L-BFGS over
//!   log pair weights.
//!
//! The two likelihood estimators add the prior to every entry before
//! estimating and return matrices scaled to the observed total.
pub mod detailed_balance;
pub mod tnc;
pub mod transpose;

pub use self::{
    detailed_balance::{add_prior, iterative_detailed_balance, DetailedBalanceOutcome},
    tnc::{tnc_reversible_counts, ReversibleData, ReversibleLogLik, TncOutcome},
    transpose::transpose_symmetrize,
};
