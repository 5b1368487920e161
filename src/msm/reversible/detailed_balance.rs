//! Iterative maximum-likelihood reversible counts.
//!
//! Purpose
//! -------
//! Find the symmetric count matrix `X` whose row-normalization is the
//! maximum-likelihood reversible transition matrix for observed counts `C`.
//! With `S = C + Cᵀ` and `c_i = Σ_j C_ij`, the optimum satisfies the fixed
//! point
//!
//! ```text
//! x_i  = Σ_j S_ij / (c_i / x_i + c_j / x_j)
//! X_ij = S_ij / (c_i / x_i + c_j / x_j)
//! ```
//!
//! where `x_i = Σ_j X_ij` is the (unnormalized) stationary weight of state i.
//!
//! Key behaviors
//! -------------
//! - The optional prior is added to *every* entry of `C` before estimation,
//!   so a positive prior makes the estimate dense.
//! - Sweeps stop once the largest relative change of any `x_i` falls below
//!   `tol`, or after `max_iter` sweeps. A capped run still returns its last
//!   iterate with `converged == false` and the achieved tolerance, unless
//!   the caller set `require_convergence`.
//! - The result is rescaled to the total (prior-adjusted) count so that
//!   `Σ X = Σ C`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Input is square, non-negative and has no zero row after the prior is
//!   added; ergodic trimming guarantees this for any component with more
//!   than one state.
//! - Every iterate keeps `x_i > 0`, so the update never divides by zero.
use crate::msm::{
    core::{options::verify_prior, DetailedBalanceOptions, SparseMatrix},
    errors::{MSMError, MSMResult},
};
use ndarray::Array1;

/// Result of [`iterative_detailed_balance`].
///
/// - `counts`: symmetric reversible count matrix.
/// - `converged`: `true` iff `achieved_tol < target_tol` before the cap.
/// - `iterations`: sweeps performed.
/// - `achieved_tol`: largest relative weight change in the final sweep.
/// - `target_tol`: the requested tolerance.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailedBalanceOutcome {
    pub counts: SparseMatrix,
    pub converged: bool,
    pub iterations: usize,
    pub achieved_tol: f64,
    pub target_tol: f64,
}

/// Add `prior` to every entry of a square matrix.
///
/// A zero prior returns the input unchanged.
pub fn add_prior(counts: &SparseMatrix, prior: f64) -> MSMResult<SparseMatrix> {
    verify_prior(prior)?;
    if prior == 0.0 {
        return Ok(counts.clone());
    }
    let (n_rows, n_cols) = counts.shape();
    let grid = (0..n_rows).flat_map(|i| (0..n_cols).map(move |j| (i, j, prior)));
    SparseMatrix::from_triplets(n_rows, n_cols, counts.iter().chain(grid))
}

/// Check that `counts` is square, non-negative and has no zero row.
pub(crate) fn validate_counts(counts: &SparseMatrix) -> MSMResult<Array1<f64>> {
    if !counts.is_square() {
        return Err(MSMError::DimensionMismatch { expected: counts.n_rows(), found: counts.n_cols() });
    }
    if let Some((row, col, value)) = counts.first_negative() {
        return Err(MSMError::NegativeCount { row, col, value });
    }
    let row_sums = counts.row_sums();
    if let Some(row) = row_sums.iter().position(|&s| s <= 0.0) {
        return Err(MSMError::ZeroRowSum { row });
    }
    Ok(row_sums)
}

/// Estimate reversible counts by the detailed-balance fixed point.
///
/// # Errors
/// - [`MSMError::InvalidPrior`] for a negative or non-finite prior.
/// - [`MSMError::DimensionMismatch`], [`MSMError::NegativeCount`],
///   [`MSMError::ZeroRowSum`] for unusable counts.
/// - [`MSMError::DetailedBalanceNotConverged`] only when
///   `opts.require_convergence` is set and the sweep cap is reached.
pub fn iterative_detailed_balance(
    counts: &SparseMatrix, prior: f64, opts: &DetailedBalanceOptions,
) -> MSMResult<DetailedBalanceOutcome> {
    let c = add_prior(counts, prior)?;
    let row_counts = validate_counts(&c)?;
    let s = c.add(&c.transpose())?;
    let n = c.n_rows();

    let mut x = s.row_sums();
    let mut ratio = Array1::zeros(n);
    let mut iterations = 0;
    let mut achieved = f64::INFINITY;
    while iterations < opts.max_iter {
        for i in 0..n {
            ratio[i] = row_counts[i] / x[i];
        }
        let next = Array1::from_iter(
            (0..n).map(|i| s.row(i).map(|(j, v)| v / (ratio[i] + ratio[j])).sum::<f64>()),
        );
        achieved = x
            .iter()
            .zip(next.iter())
            .map(|(&old, &new)| ((new - old) / old).abs())
            .fold(0.0, f64::max);
        x = next;
        iterations += 1;
        if achieved < opts.tol {
            break;
        }
    }
    let converged = achieved < opts.tol;
    if !converged && opts.require_convergence {
        return Err(MSMError::DetailedBalanceNotConverged {
            iterations,
            achieved,
            target: opts.tol,
        });
    }

    for i in 0..n {
        ratio[i] = row_counts[i] / x[i];
    }
    let estimate = s.map_values(|i, j, v| v / (ratio[i] + ratio[j]));
    let total = estimate.sum();
    let reversible = if total > 0.0 { estimate.scale(c.sum() / total) } else { estimate };

    Ok(DetailedBalanceOutcome {
        counts: reversible,
        converged,
        iterations,
        achieved_tol: achieved,
        target_tol: opts.tol,
    })
}
