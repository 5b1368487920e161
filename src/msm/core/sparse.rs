//! Compressed sparse row (CSR) matrix for transition counts.
//!
//! Purpose
//! -------
//! Hold the count, symmetrized-count, and transition matrices of the MSM
//! pipeline. These matrices are square, non-negative, and usually very
//! sparse (a state only transitions to a handful of neighbors), so the
//! pipeline never materializes an `N × N` dense array unless a caller asks
//! for one via [`SparseMatrix::to_dense`].
//!
//! Key behaviors
//! -------------
//! - Construction from `(row, col, value)` triplets sums duplicates and drops
//!   explicit zeros, so the stored pattern is exactly the set of non-zero
//!   entries.
//! - Row and column sums, transposition, addition, scaling, principal
//!   submatrix extraction, and matrix–vector products are provided for the
//!   estimators downstream.
//! - Column indices within a row are strictly increasing.
//!
//! Invariants & assumptions
//! ------------------------
//! - `indptr.len() == n_rows + 1`, `indptr[0] == 0`, and `indptr` is
//!   non-decreasing.
//! - `indices.len() == data.len() == indptr[n_rows]`.
//! - Every stored value is finite and non-zero.
//!
//! Conventions
//! -----------
//! - Indexing is 0-based.
//! - Values are `f64` even for raw counts; counts are exact integers in
//!   floating point.
//!
//! Testing notes
//! -------------
//! - Unit tests cover duplicate summation, zero dropping, transposition,
//!   submatrix extraction, products, and out-of-range triplets.
use crate::msm::errors::{MSMError, MSMResult};
use ndarray::{Array1, Array2};

/// Square or rectangular CSR matrix with `f64` values.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    n_rows: usize,
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
}

impl SparseMatrix {
    /// All-zero matrix of the given shape.
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self { n_rows, n_cols, indptr: vec![0; n_rows + 1], indices: Vec::new(), data: Vec::new() }
    }

    /// Build a matrix from `(row, col, value)` triplets.
    ///
    /// Duplicate coordinates are summed; entries that sum to exactly zero are
    /// not stored.
    ///
    /// # Errors
    /// - [`MSMError::DimensionMismatch`] if a row or column index is out of
    ///   range (`expected` is the bound, `found` the offending index).
    /// - [`MSMError::NonFiniteEntry`] if a value is NaN or infinite.
    pub fn from_triplets<I>(n_rows: usize, n_cols: usize, triplets: I) -> MSMResult<Self>
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let mut entries: Vec<(usize, usize, f64)> = Vec::new();
        for (row, col, value) in triplets {
            if row >= n_rows {
                return Err(MSMError::DimensionMismatch { expected: n_rows, found: row });
            }
            if col >= n_cols {
                return Err(MSMError::DimensionMismatch { expected: n_cols, found: col });
            }
            if !value.is_finite() {
                return Err(MSMError::NonFiniteEntry { row, col, value });
            }
            entries.push((row, col, value));
        }
        entries.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut indptr = vec![0usize; n_rows + 1];
        let mut indices = Vec::with_capacity(entries.len());
        let mut data = Vec::with_capacity(entries.len());
        let mut iter = entries.into_iter().peekable();
        while let Some((row, col, mut value)) = iter.next() {
            while let Some(&(r, c, v)) = iter.peek() {
                if r != row || c != col {
                    break;
                }
                value += v;
                iter.next();
            }
            if value != 0.0 {
                indices.push(col);
                data.push(value);
                indptr[row + 1] += 1;
            }
        }
        for i in 0..n_rows {
            indptr[i + 1] += indptr[i];
        }
        Ok(Self { n_rows, n_cols, indptr, indices, data })
    }

    /// Build a matrix from a dense array, keeping only non-zero entries.
    ///
    /// # Errors
    /// - [`MSMError::NonFiniteEntry`] if an entry is NaN or infinite.
    pub fn from_dense(dense: &Array2<f64>) -> MSMResult<Self> {
        let (n_rows, n_cols) = dense.dim();
        let triplets = dense
            .indexed_iter()
            .filter(|&(_, &v)| v != 0.0)
            .map(|((i, j), &v)| (i, j, v));
        Self::from_triplets(n_rows, n_cols, triplets)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    pub fn is_square(&self) -> bool {
        self.n_rows == self.n_cols
    }

    /// Number of stored (non-zero) entries.
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Entry at `(row, col)`; zero when not stored or out of range.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        if row >= self.n_rows {
            return 0.0;
        }
        let (start, end) = (self.indptr[row], self.indptr[row + 1]);
        match self.indices[start..end].binary_search(&col) {
            Ok(pos) => self.data[start + pos],
            Err(_) => 0.0,
        }
    }

    /// Stored `(col, value)` pairs of one row, in increasing column order.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let (start, end) = (self.indptr[row], self.indptr[row + 1]);
        self.indices[start..end].iter().copied().zip(self.data[start..end].iter().copied())
    }

    /// All stored `(row, col, value)` triplets in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.n_rows).flat_map(move |i| self.row(i).map(move |(j, v)| (i, j, v)))
    }

    pub fn row_sums(&self) -> Array1<f64> {
        Array1::from_iter((0..self.n_rows).map(|i| self.row(i).map(|(_, v)| v).sum::<f64>()))
    }

    pub fn col_sums(&self) -> Array1<f64> {
        let mut sums = Array1::zeros(self.n_cols);
        for (&j, &v) in self.indices.iter().zip(self.data.iter()) {
            sums[j] += v;
        }
        sums
    }

    /// Sum of all entries.
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn transpose(&self) -> Self {
        let mut counts = vec![0usize; self.n_cols + 1];
        for &j in &self.indices {
            counts[j + 1] += 1;
        }
        for j in 0..self.n_cols {
            counts[j + 1] += counts[j];
        }
        let indptr = counts.clone();
        let mut next = counts;
        let mut indices = vec![0usize; self.nnz()];
        let mut data = vec![0.0; self.nnz()];
        // Rows are visited in order, so each transposed row stays sorted.
        for (i, j, v) in self.iter() {
            let slot = next[j];
            indices[slot] = i;
            data[slot] = v;
            next[j] += 1;
        }
        Self { n_rows: self.n_cols, n_cols: self.n_rows, indptr, indices, data }
    }

    /// Element-wise sum `self + other`.
    ///
    /// # Errors
    /// - [`MSMError::DimensionMismatch`] if the shapes differ.
    pub fn add(&self, other: &SparseMatrix) -> MSMResult<Self> {
        if self.n_rows != other.n_rows {
            return Err(MSMError::DimensionMismatch { expected: self.n_rows, found: other.n_rows });
        }
        if self.n_cols != other.n_cols {
            return Err(MSMError::DimensionMismatch { expected: self.n_cols, found: other.n_cols });
        }
        Self::from_triplets(self.n_rows, self.n_cols, self.iter().chain(other.iter()))
    }

    /// Multiply every stored entry by `factor`.
    pub fn scale(&self, factor: f64) -> Self {
        self.map_values(|_, _, v| v * factor)
    }

    /// Replace each stored value by `f(row, col, value)`, keeping the pattern.
    pub fn map_values<F>(&self, mut f: F) -> Self
    where
        F: FnMut(usize, usize, f64) -> f64,
    {
        let mut out = self.clone();
        for i in 0..self.n_rows {
            for k in self.indptr[i]..self.indptr[i + 1] {
                out.data[k] = f(i, self.indices[k], self.data[k]);
            }
        }
        out
    }

    /// Principal submatrix on the given (sorted, distinct) indices.
    ///
    /// Row and column `keep[k]` of `self` become row and column `k` of the
    /// result, so relative order is preserved.
    pub fn submatrix(&self, keep: &[usize]) -> Self {
        let mut position = vec![None; self.n_cols];
        for (new, &old) in keep.iter().enumerate() {
            if old < self.n_cols {
                position[old] = Some(new);
            }
        }
        let n = keep.len();
        let mut indptr = Vec::with_capacity(n + 1);
        indptr.push(0);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        for &old_row in keep {
            if old_row < self.n_rows {
                for (j, v) in self.row(old_row) {
                    if let Some(new_col) = position[j] {
                        indices.push(new_col);
                        data.push(v);
                    }
                }
            }
            indptr.push(indices.len());
        }
        Self { n_rows: n, n_cols: n, indptr, indices, data }
    }

    /// Matrix–vector product `A x`.
    ///
    /// # Errors
    /// - [`MSMError::DimensionMismatch`] if `x.len() != n_cols`.
    pub fn mul_vec(&self, x: &Array1<f64>) -> MSMResult<Array1<f64>> {
        if x.len() != self.n_cols {
            return Err(MSMError::DimensionMismatch { expected: self.n_cols, found: x.len() });
        }
        Ok(Array1::from_iter((0..self.n_rows).map(|i| self.row(i).map(|(j, v)| v * x[j]).sum())))
    }

    /// Transposed product `Aᵀ x` without building `Aᵀ`.
    ///
    /// # Errors
    /// - [`MSMError::DimensionMismatch`] if `x.len() != n_rows`.
    pub fn transpose_mul_vec(&self, x: &Array1<f64>) -> MSMResult<Array1<f64>> {
        if x.len() != self.n_rows {
            return Err(MSMError::DimensionMismatch { expected: self.n_rows, found: x.len() });
        }
        let mut out = Array1::zeros(self.n_cols);
        for (i, j, v) in self.iter() {
            out[j] += v * x[i];
        }
        Ok(out)
    }

    /// `true` if `|a_ij - a_ji| <= tol * max(|a_ij|, |a_ji|, 1)` everywhere.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        if !self.is_square() {
            return false;
        }
        self.iter().all(|(i, j, v)| {
            let w = self.get(j, i);
            (v - w).abs() <= tol * v.abs().max(w.abs()).max(1.0)
        })
    }

    /// First negative entry, if any, as `(row, col, value)`.
    pub fn first_negative(&self) -> Option<(usize, usize, f64)> {
        self.iter().find(|&(_, _, v)| v < 0.0)
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let mut out = Array2::zeros((self.n_rows, self.n_cols));
        for (i, j, v) in self.iter() {
            out[[i, j]] = v;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Triplet construction (duplicates, zeros, bounds, non-finite values).
    // - Transposition and addition.
    // - Principal submatrix extraction and matrix-vector products.
    // -------------------------------------------------------------------------

    fn sample() -> SparseMatrix {
        // [[0, 2, 0],
        //  [1, 0, 2],
        //  [0, 1, 0]]
        SparseMatrix::from_triplets(
            3,
            3,
            vec![(0, 1, 1.0), (1, 0, 1.0), (1, 2, 2.0), (2, 1, 1.0), (0, 1, 1.0)],
        )
        .expect("valid triplets")
    }

    #[test]
    // Purpose
    // -------
    // Duplicate coordinates accumulate and zero totals are not stored.
    //
    // Given
    // -----
    // - Two triplets at (0, 1) summing to 2.
    // - A +1 / -1 pair at (2, 2).
    //
    // Expect
    // ------
    // - `get(0, 1) == 2`, `(2, 2)` absent from the pattern.
    fn from_triplets_sums_duplicates_and_drops_zeros() {
        let m = SparseMatrix::from_triplets(
            3,
            3,
            vec![(0, 1, 1.0), (0, 1, 1.0), (2, 2, 1.0), (2, 2, -1.0)],
        )
        .expect("valid triplets");

        assert_eq!(m.get(0, 1), 2.0);
        assert_eq!(m.nnz(), 1);
        assert_eq!(m.get(2, 2), 0.0);
    }

    #[test]
    fn from_triplets_rejects_out_of_range_and_non_finite() {
        let err = SparseMatrix::from_triplets(2, 2, vec![(2, 0, 1.0)]);
        assert_eq!(err, Err(MSMError::DimensionMismatch { expected: 2, found: 2 }));

        let err = SparseMatrix::from_triplets(2, 2, vec![(0, 1, f64::NAN)]);
        assert!(matches!(err, Err(MSMError::NonFiniteEntry { row: 0, col: 1, .. })));
    }

    #[test]
    fn sums_and_dense_view_match_entries() {
        let m = sample();
        assert_eq!(m.row_sums(), array![2.0, 3.0, 1.0]);
        assert_eq!(m.col_sums(), array![1.0, 3.0, 2.0]);
        assert_eq!(m.sum(), 6.0);
        assert_eq!(m.to_dense(), array![[0.0, 2.0, 0.0], [1.0, 0.0, 2.0], [0.0, 1.0, 0.0]]);
    }

    #[test]
    // Purpose
    // -------
    // Transposition swaps coordinates and keeps each row sorted.
    //
    // Given
    // -----
    // - The 3-state sample matrix.
    //
    // Expect
    // ------
    // - Dense transpose matches `to_dense().t()`.
    // - `A + Aᵀ` is symmetric.
    fn transpose_and_add_produce_symmetric_sum() {
        let m = sample();
        let t = m.transpose();
        assert_eq!(t.to_dense(), m.to_dense().t().to_owned());
        for i in 0..3 {
            let cols: Vec<usize> = t.row(i).map(|(j, _)| j).collect();
            let mut sorted = cols.clone();
            sorted.sort_unstable();
            assert_eq!(cols, sorted);
        }

        let s = m.add(&t).expect("same shape");
        assert!(s.is_symmetric(0.0));
        assert!(!m.is_symmetric(1e-12));
    }

    #[test]
    fn add_rejects_shape_mismatch() {
        let a = SparseMatrix::zeros(2, 2);
        let b = SparseMatrix::zeros(3, 3);
        assert_eq!(a.add(&b), Err(MSMError::DimensionMismatch { expected: 2, found: 3 }));
    }

    #[test]
    // Purpose
    // -------
    // A principal submatrix keeps only the selected states, in order.
    //
    // Given
    // -----
    // - The sample matrix restricted to states [1, 2].
    //
    // Expect
    // ------
    // - [[0, 2], [1, 0]].
    fn submatrix_selects_principal_block() {
        let sub = sample().submatrix(&[1, 2]);
        assert_eq!(sub.shape(), (2, 2));
        assert_eq!(sub.to_dense(), array![[0.0, 2.0], [1.0, 0.0]]);
    }

    #[test]
    fn products_match_dense_algebra() {
        let m = sample();
        let x = array![1.0, 2.0, 3.0];
        let dense = m.to_dense();

        let ax = m.mul_vec(&x).expect("matching length");
        let atx = m.transpose_mul_vec(&x).expect("matching length");
        for i in 0..3 {
            assert_relative_eq!(ax[i], dense.row(i).dot(&x));
            assert_relative_eq!(atx[i], dense.column(i).dot(&x));
        }
        assert!(m.mul_vec(&array![1.0]).is_err());
    }

    #[test]
    fn map_values_keeps_pattern() {
        let m = sample().map_values(|i, _, v| v / (i as f64 + 1.0));
        assert_eq!(m.nnz(), 4);
        assert_relative_eq!(m.get(1, 2), 1.0);
        assert!(m.first_negative().is_none());
        assert_eq!(m.scale(-1.0).first_negative(), Some((0, 1, -2.0)));
    }
}
