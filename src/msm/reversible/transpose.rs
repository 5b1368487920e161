//! Transpose symmetrization: `C' = ½ (C + Cᵀ)`.
//!
//! Applied to the untrimmed counts, before ergodic trimming, so that the
//! principal submatrix taken by the trimmer is still exactly symmetric.
use crate::msm::{
    core::SparseMatrix,
    errors::{MSMError, MSMResult},
};
use std::collections::BTreeSet;

/// Symmetrize a square count matrix as `½ (C + Cᵀ)`.
///
/// Each unordered pair is evaluated once and written to both `(i, j)` and
/// `(j, i)`, so the result is exactly symmetric.
///
/// # Errors
/// - [`MSMError::DimensionMismatch`] if `counts` is not square.
pub fn transpose_symmetrize(counts: &SparseMatrix) -> MSMResult<SparseMatrix> {
    if !counts.is_square() {
        return Err(MSMError::DimensionMismatch { expected: counts.n_rows(), found: counts.n_cols() });
    }
    let pairs: BTreeSet<(usize, usize)> =
        counts.iter().map(|(i, j, _)| (i.min(j), i.max(j))).collect();

    let mut triplets = Vec::with_capacity(2 * pairs.len());
    for (i, j) in pairs {
        let value = 0.5 * (counts.get(i, j) + counts.get(j, i));
        triplets.push((i, j, value));
        if i != j {
            triplets.push((j, i, value));
        }
    }
    SparseMatrix::from_triplets(counts.n_rows(), counts.n_cols(), triplets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Symmetrized reference counts are exactly symmetric and keep the total.
    //
    // Given
    // -----
    // - Counts of [[0, 1, 2, 1, 0, 1, 2]] at lag 1.
    //
    // Expect
    // ------
    // - [[0, 1.5, 0], [1.5, 0, 1.5], [0, 1.5, 0]].
    fn symmetrizes_reference_counts() {
        let c = SparseMatrix::from_dense(&array![[0.0, 2.0, 0.0], [1.0, 0.0, 2.0], [0.0, 1.0, 0.0]])
            .expect("finite");
        let s = transpose_symmetrize(&c).expect("square");
        assert_eq!(s.to_dense(), array![[0.0, 1.5, 0.0], [1.5, 0.0, 1.5], [0.0, 1.5, 0.0]]);
        assert!(s.is_symmetric(0.0));
        assert_eq!(s.sum(), c.sum());
    }

    #[test]
    fn one_way_edges_become_two_way() {
        let c = SparseMatrix::from_triplets(3, 3, vec![(0, 2, 0.1), (2, 1, 0.7), (1, 2, 0.3)])
            .expect("valid");
        let s = transpose_symmetrize(&c).expect("square");
        assert_eq!(s.get(2, 0), 0.05);
        assert_eq!(s.get(0, 2), 0.05);
        assert_eq!(s.get(1, 2), s.get(2, 1));
        assert!(s.is_symmetric(0.0));
    }

    #[test]
    fn rejects_rectangular_input() {
        let c = SparseMatrix::zeros(2, 3);
        assert_eq!(
            transpose_symmetrize(&c),
            Err(MSMError::DimensionMismatch { expected: 2, found: 3 })
        );
    }
}
