//! Stationary distribution from the dominant left eigenvectors of `T`.
//!
//! Purpose
//! -------
//! Compute the population vector of a (possibly non-reversible) transition
//! matrix as its left eigenvector for eigenvalue 1, without a dense
//! decomposition of `T`.
//!
//! Key behaviors
//! -------------
//! - Orthogonal (subspace) iteration with `k = min(num_eigs, n)` vectors on
//!   the lazy operator `A = ½ (Tᵀ + I)`. `A` has the same eigenvectors as
//!   `Tᵀ` with eigenvalues `μ = (λ + 1) / 2`; it moves the periodic
//!   eigenvalue `λ = -1` to `0`, so the iteration converges for every
//!   ergodic chain.
//! - Every block step is followed by a Rayleigh–Ritz projection
//!   `H = Qᵀ A Q`. Its eigenvalues (real Schur form, complex pairs allowed)
//!   are the Ritz values, mapped back to `T` with `λ = 2μ - 1`.
//! - The Ritz pair whose value is closest to 1 is the stationary candidate:
//!   `y` spans the null space of `H - μ I` and the Ritz vector is `v = Q y`.
//!   Iteration stops when `‖A v - μ v‖₂` falls below `tol`. Because the
//!   whole block contributes, the stationary vector converges at the rate
//!   of the `(k + 1)`-th eigenvalue, so metastable chains with `λ₂ ≈ 1` do
//!   not stall the solver.
//! - The eigenvalue closest to 1 must lie within `eigenvalue_tol` of 1; a
//!   matrix that is not row-stochastic fails here.
//!
//! Conventions
//! -----------
//! - The eigenvector is sign-corrected to a positive sum, negligible negative
//!   entries from round-off are clamped to zero, and the result is
//!   normalized to sum 1.
//! - Dense work is limited to `n × k` blocks and the `k × k` projection, done
//!   in `nalgebra`. The sparse product stays on [`SparseMatrix`].
use crate::msm::{
    core::{EigenOptions, SparseMatrix},
    errors::{MSMError, MSMResult},
    transition::validate_populations,
};
use nalgebra::{Complex, DMatrix};
use ndarray::Array1;

/// Entries below `-NEGATIVE_TOL · max|π|` make the eigenvector invalid.
const NEGATIVE_TOL: f64 = 1e-8;

/// Iteration cap for the Schur and SVD decompositions of the `k × k`
/// projection.
const DECOMP_MAX_ITER: usize = 10_000;

/// Result of [`stationary_distribution`].
#[derive(Debug, Clone, PartialEq)]
pub struct StationaryOutcome {
    /// Non-negative stationary distribution, summing to 1.
    pub populations: Array1<f64>,
    /// Dominant eigenvalues of `T`, largest modulus first.
    pub eigenvalues: Vec<Complex<f64>>,
    pub iterations: usize,
    pub residual: f64,
}

/// Stationary distribution of a row-stochastic transition matrix.
///
/// # Errors
/// - [`MSMError::DimensionMismatch`] if `transition` is not square.
/// - [`MSMError::InvalidPopulations`] for an empty matrix or an eigenvector
///   with entries of both signs.
/// - [`MSMError::EigenNotConverged`] if the residual stays above `tol` for
///   `max_iter` iterations.
/// - [`MSMError::StationaryEigenvalueMismatch`] if no eigenvalue is within
///   `eigenvalue_tol` of 1.
pub fn stationary_distribution(
    transition: &SparseMatrix, opts: &EigenOptions,
) -> MSMResult<StationaryOutcome> {
    if !transition.is_square() {
        return Err(MSMError::DimensionMismatch {
            expected: transition.n_rows(),
            found: transition.n_cols(),
        });
    }
    let n = transition.n_rows();
    if n == 0 {
        return Err(MSMError::InvalidPopulations { reason: "transition matrix has no states".into() });
    }
    let k = opts.num_eigs.min(n);

    let mut q = initial_basis(n, k);
    let mut z = apply_lazy(transition, &q)?;
    let mut ritz = rayleigh_ritz(&q, &z)
        .ok_or(MSMError::EigenNotConverged { iterations: 0, residual: f64::INFINITY })?;
    let mut iterations = 0;
    while ritz.residual > opts.tol && iterations < opts.max_iter {
        q = z.qr().q();
        z = apply_lazy(transition, &q)?;
        ritz = rayleigh_ritz(&q, &z)
            .ok_or(MSMError::EigenNotConverged { iterations, residual: ritz.residual })?;
        iterations += 1;
    }
    if ritz.residual > opts.tol {
        return Err(MSMError::EigenNotConverged { iterations, residual: ritz.residual });
    }

    let one = Complex::new(1.0, 0.0);
    if !((ritz.stationary - one).norm() <= opts.eigenvalue_tol) {
        return Err(MSMError::StationaryEigenvalueMismatch {
            eigenvalue: ritz.stationary.re,
            tol: opts.eigenvalue_tol,
        });
    }

    let populations = normalize_eigenvector(ritz.vector)?;
    Ok(StationaryOutcome {
        populations,
        eigenvalues: ritz.eigenvalues,
        iterations,
        residual: ritz.residual,
    })
}

/// One Rayleigh–Ritz projection of the current block.
struct RitzStep {
    /// Ritz values mapped to eigenvalues of `T`, largest modulus first.
    eigenvalues: Vec<Complex<f64>>,
    /// Eigenvalue of `T` closest to 1.
    stationary: Complex<f64>,
    /// Unit Ritz vector `Q y` for `stationary`.
    vector: Array1<f64>,
    /// `‖A v - μ v‖₂` of that Ritz vector.
    residual: f64,
}

/// Project `A` onto `span(Q)` given `Z = A Q`, and extract the Ritz pair
/// closest to the stationary eigenvalue. `None` if a `k × k` decomposition
/// does not converge.
fn rayleigh_ritz(q: &DMatrix<f64>, z: &DMatrix<f64>) -> Option<RitzStep> {
    let h = q.transpose() * z;
    let k = h.nrows();
    let schur = h.clone().try_schur(f64::EPSILON, DECOMP_MAX_ITER)?;
    let ritz_values = schur.complex_eigenvalues();

    let mu = ritz_values
        .iter()
        .copied()
        .min_by(|a, b| (*a - 1.0).norm().total_cmp(&(*b - 1.0).norm()))?;
    let shifted = h - DMatrix::<f64>::identity(k, k) * mu.re;
    let svd = shifted.try_svd(false, true, f64::EPSILON, DECOMP_MAX_ITER)?;
    let v_t = svd.v_t?;
    let smallest = svd.singular_values.iamin();
    let y = v_t.row(smallest).transpose();

    let v = q * &y;
    let av = z * &y;
    let norm = v.norm();
    if !(norm > 0.0) {
        return None;
    }
    let residual = (&av - &v * mu.re).norm() / norm;

    let mut eigenvalues: Vec<Complex<f64>> =
        ritz_values.iter().map(|&m| m * 2.0 - Complex::new(1.0, 0.0)).collect();
    eigenvalues.sort_by(|a, b| b.norm().total_cmp(&a.norm()));
    Some(RitzStep {
        eigenvalues,
        stationary: mu * 2.0 - Complex::new(1.0, 0.0),
        vector: v.iter().map(|x| x / norm).collect(),
        residual,
    })
}

/// Orthonormal `n × k` start block: the uniform vector plus deterministic
/// oscillating columns.
fn initial_basis(n: usize, k: usize) -> DMatrix<f64> {
    let block = DMatrix::from_fn(n, k, |i, j| {
        if j == 0 {
            1.0
        } else {
            ((i + 1) as f64 * (j as f64 + 0.5)).cos()
        }
    });
    block.qr().q()
}

/// `Z = ½ (Tᵀ Q + Q)`, one sparse product per column.
fn apply_lazy(transition: &SparseMatrix, q: &DMatrix<f64>) -> MSMResult<DMatrix<f64>> {
    let mut z = DMatrix::<f64>::zeros(q.nrows(), q.ncols());
    for j in 0..q.ncols() {
        let column = column_to_array(q, j);
        let image = transition.transpose_mul_vec(&column)?;
        for i in 0..q.nrows() {
            z[(i, j)] = 0.5 * (image[i] + column[i]);
        }
    }
    Ok(z)
}

fn column_to_array(m: &DMatrix<f64>, j: usize) -> Array1<f64> {
    m.column(j).iter().copied().collect()
}

/// Sign-correct, clamp and normalize a stationary Ritz vector.
fn normalize_eigenvector(mut v: Array1<f64>) -> MSMResult<Array1<f64>> {
    if v.sum() < 0.0 {
        v.mapv_inplace(|x| -x);
    }
    let scale = v.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
    if let Some((i, &x)) = v.iter().enumerate().find(|(_, x)| **x < -NEGATIVE_TOL * scale) {
        return Err(MSMError::InvalidPopulations {
            reason: format!(
                "stationary eigenvector has mixed signs (entry {i} is {x}); \
                 the transition matrix is not ergodic"
            ),
        });
    }
    v.mapv_inplace(|x| x.max(0.0));
    let total = v.sum();
    if !(total > 0.0) {
        return Err(MSMError::InvalidPopulations {
            reason: "stationary eigenvector sums to zero".into(),
        });
    }
    v /= total;
    validate_populations(&v, 1e-9)?;
    Ok(v)
}
