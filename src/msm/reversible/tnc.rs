//! Reversible counts by numerical maximum likelihood (the MLE-TNC strategy).
//!
//! Purpose
//! -------
//! Solve the same detailed-balance constrained likelihood as
//! [`iterative_detailed_balance`](super::detailed_balance::iterative_detailed_balance)
//! with a general-purpose optimizer. Slower, but it does not share the fixed
//! point's failure modes on badly conditioned inputs.
//!
//! Parameterization
//! ----------------
//! One parameter per unordered pair `k = {a, b}` (`a ≤ b`) in the pattern of
//! `S = C + Cᵀ`: `θ_k = log X_ab`. The symmetric matrix `X` is built from
//! `exp(θ)`, so symmetry and positivity hold by construction and the problem
//! is unconstrained. With `x_i = Σ_j X_ij`, `s_k = C_ab + C_ba` for `a ≠ b`,
//! `s_k = C_aa` on the diagonal and `N = Σ C`:
//!
//! ```text
//! ℓ(θ)     = (1/N) [ Σ_k s_k θ_k − Σ_i c_i log x_i ]
//! ∂ℓ/∂θ_k  = (1/N) [ s_k − X_k (c_a / x_a + c_b / x_b) ]    a ≠ b
//! ∂ℓ/∂θ_k  = (1/N) [ s_k − X_k  c_a / x_a ]                  a = b
//! ```
//!
//! `ℓ` is invariant under `θ → θ + const`; the result is rescaled to `Σ X = N`.
//!
//! Conventions
//! -----------
//! - The start point is the transpose-symmetrized estimate.
//! - The likelihood is averaged per transition so that the optimizer's
//!   gradient tolerance does not depend on the amount of data.
use crate::{
    msm::{
        core::SparseMatrix,
        errors::MSMResult,
        reversible::detailed_balance::{add_prior, validate_counts},
    },
    optimization::{
        errors::{OptError, OptResult},
        loglik_optimizer::{maximize, Cost, Grad, LogLikelihood, MLEOptions, Theta},
    },
};
use ndarray::Array1;

/// Result of [`tnc_reversible_counts`].
#[derive(Debug, Clone, PartialEq)]
pub struct TncOutcome {
    /// Symmetric reversible count matrix, scaled to the observed total.
    pub counts: SparseMatrix,
    /// `true` if the optimizer met a tolerance before its iteration cap.
    pub converged: bool,
    pub iterations: usize,
    /// Per-transition log-likelihood at the optimum.
    pub log_likelihood: f64,
    /// Optimizer termination status.
    pub status: String,
}

/// Sufficient statistics of the reversible likelihood.
#[derive(Debug, Clone, PartialEq)]
pub struct ReversibleData {
    n_states: usize,
    pairs: Vec<(usize, usize)>,
    pair_counts: Array1<f64>,
    row_counts: Array1<f64>,
    total: f64,
}

impl ReversibleData {
    /// Collect pair counts `s_k` and row counts `c_i` from a validated
    /// count matrix.
    pub fn from_counts(counts: &SparseMatrix) -> MSMResult<Self> {
        let row_counts = validate_counts(counts)?;
        let mut pairs = Vec::new();
        let mut pair_counts = Vec::new();
        let symmetric = counts.add(&counts.transpose())?;
        for (a, b, v) in symmetric.iter().filter(|&(a, b, _)| a <= b) {
            pairs.push((a, b));
            pair_counts.push(if a == b { 0.5 * v } else { v });
        }
        let total = row_counts.sum();
        Ok(Self {
            n_states: counts.n_rows(),
            pairs,
            pair_counts: Array1::from(pair_counts),
            row_counts,
            total,
        })
    }

    pub fn n_params(&self) -> usize {
        self.pairs.len()
    }

    /// Start point: log of the transpose-symmetrized counts.
    pub fn initial_theta(&self) -> Theta {
        self.pairs
            .iter()
            .zip(self.pair_counts.iter())
            .map(|(&(a, b), &s)| if a == b { s.ln() } else { (0.5 * s).ln() })
            .collect()
    }

    fn state_weights(&self, x: &Array1<f64>) -> Array1<f64> {
        let mut weights = Array1::zeros(self.n_states);
        for (&(a, b), &xk) in self.pairs.iter().zip(x.iter()) {
            weights[a] += xk;
            if a != b {
                weights[b] += xk;
            }
        }
        weights
    }

    /// Symmetric matrix with entries `exp(θ_k)`, scaled to the observed total.
    pub fn to_counts(&self, theta: &Theta) -> MSMResult<SparseMatrix> {
        let x = theta.mapv(f64::exp);
        let scale = self.total / self.state_weights(&x).sum();
        let mut triplets = Vec::with_capacity(2 * self.pairs.len());
        for (&(a, b), &xk) in self.pairs.iter().zip(x.iter()) {
            triplets.push((a, b, xk * scale));
            if a != b {
                triplets.push((b, a, xk * scale));
            }
        }
        SparseMatrix::from_triplets(self.n_states, self.n_states, triplets)
    }
}

/// Per-transition reversible log-likelihood in log-pair parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReversibleLogLik;

impl LogLikelihood for ReversibleLogLik {
    type Data = ReversibleData;

    fn value(&self, theta: &Theta, data: &ReversibleData) -> OptResult<Cost> {
        let x = theta.mapv(f64::exp);
        let weights = data.state_weights(&x);
        let fit: f64 = data.pair_counts.dot(theta);
        let norm: f64 = data
            .row_counts
            .iter()
            .zip(weights.iter())
            .filter(|&(&c, _)| c > 0.0)
            .map(|(&c, &w)| c * w.ln())
            .sum();
        let value = (fit - norm) / data.total;
        if !value.is_finite() {
            return Err(OptError::NonFiniteCost { value });
        }
        Ok(value)
    }

    fn check(&self, theta: &Theta, data: &ReversibleData) -> OptResult<()> {
        if theta.len() != data.n_params() {
            return Err(OptError::ThetaLengthMismatch {
                expected: data.n_params(),
                actual: theta.len(),
            });
        }
        if let Some((index, &value)) = theta.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(OptError::InvalidThetaInput { index, value });
        }
        if data.total <= 0.0 {
            return Err(OptError::InvalidObjectiveData {
                reason: "count matrix has no transitions".to_string(),
            });
        }
        Ok(())
    }

    fn grad(&self, theta: &Theta, data: &ReversibleData) -> OptResult<Grad> {
        let x = theta.mapv(f64::exp);
        let weights = data.state_weights(&x);
        let ratio: Array1<f64> = data
            .row_counts
            .iter()
            .zip(weights.iter())
            .map(|(&c, &w)| if c > 0.0 { c / w } else { 0.0 })
            .collect();
        let grad: Grad = data
            .pairs
            .iter()
            .zip(x.iter().zip(data.pair_counts.iter()))
            .map(|(&(a, b), (&xk, &s))| {
                let outflow = if a == b { ratio[a] } else { ratio[a] + ratio[b] };
                (s - xk * outflow) / data.total
            })
            .collect();
        Ok(grad)
    }
}

/// Estimate reversible counts by maximizing the reversible likelihood.
///
/// The prior is added to every entry first, exactly as for the iterative
/// estimator.
///
/// # Errors
/// - Count validation errors as in
///   [`iterative_detailed_balance`](super::detailed_balance::iterative_detailed_balance).
/// - [`MSMError::Optimization`](crate::msm::errors::MSMError::Optimization)
///   for optimizer failures.
pub fn tnc_reversible_counts(
    counts: &SparseMatrix, prior: f64, opts: &MLEOptions,
) -> MSMResult<TncOutcome> {
    let c = add_prior(counts, prior)?;
    let data = ReversibleData::from_counts(&c)?;
    let theta0 = data.initial_theta();
    let outcome = maximize(&ReversibleLogLik, theta0, &data, opts)?;
    Ok(TncOutcome {
        counts: data.to_counts(&outcome.theta_hat)?,
        converged: outcome.converged,
        iterations: outcome.iterations,
        log_likelihood: outcome.value,
        status: outcome.status,
    })
}
