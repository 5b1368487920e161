//! Row normalization and count-based populations.
//!
//! - [`estimate_transition_matrix`]: `T_ij = C_ij / Σ_k C_ik`. A zero row has
//!   no defined transition probabilities and is reported as
//!   [`MSMError::ZeroRowSum`] instead of producing NaN.
//! - [`populations_from_counts`]: normalized column sums of a reversible
//!   (symmetric) count matrix. For a symmetric matrix these equal the
//!   normalized row sums and are the stationary distribution of its
//!   row-normalization.
use crate::msm::{
    core::SparseMatrix,
    errors::{MSMError, MSMResult},
};
use ndarray::Array1;

/// Row-normalize a non-negative square count matrix.
///
/// # Errors
/// - [`MSMError::DimensionMismatch`] if `counts` is not square.
/// - [`MSMError::NegativeCount`] for a negative entry.
/// - [`MSMError::ZeroRowSum`] for the first row without counts.
pub fn estimate_transition_matrix(counts: &SparseMatrix) -> MSMResult<SparseMatrix> {
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
    Ok(counts.map_values(|i, _, v| v / row_sums[i]))
}

/// Populations as normalized column sums of a reversible count matrix.
///
/// # Errors
/// - [`MSMError::InvalidPopulations`] if the matrix has no counts.
pub fn populations_from_counts(counts: &SparseMatrix) -> MSMResult<Array1<f64>> {
    let sums = counts.col_sums();
    let total = sums.sum();
    if !(total > 0.0) || !total.is_finite() {
        return Err(MSMError::InvalidPopulations {
            reason: format!("column sums total {total}; expected a positive finite value"),
        });
    }
    let populations = sums / total;
    validate_populations(&populations, 1e-9)?;
    Ok(populations)
}

/// Check that `populations` is a probability vector to within `tol`.
///
/// # Errors
/// - [`MSMError::InvalidPopulations`] for an empty vector, a negative or
///   non-finite entry, or a total outside `1 ± tol`.
pub fn validate_populations(populations: &Array1<f64>, tol: f64) -> MSMResult<()> {
    if populations.is_empty() {
        return Err(MSMError::InvalidPopulations { reason: "empty vector".to_string() });
    }
    if let Some((i, &p)) = populations.iter().enumerate().find(|(_, p)| !p.is_finite() || **p < 0.0)
    {
        return Err(MSMError::InvalidPopulations {
            reason: format!("entry {i} is {p}; populations must be finite and non-negative"),
        });
    }
    let total = populations.sum();
    if (total - 1.0).abs() > tol {
        return Err(MSMError::InvalidPopulations {
            reason: format!("entries sum to {total}, not 1"),
        });
    }
    Ok(())
}
