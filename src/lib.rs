//! rust_msm — Markov State Model estimation with optional Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that
//! exposes MSM construction to Python via the `_rust_msm` extension module
//! when the `python-bindings` feature is enabled.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules: [`msm`] (counting, trimming, reversible
//!   estimation, populations, pipeline and persistence) and [`optimization`]
//!   (the argmin-backed likelihood maximizer used by the MLE-TNC strategy).
//! - Define the `build_msm` Python function and the `MSMResult` class that
//!   carries its outputs back to Python.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work happens in the inner modules; this file only converts
//!   arguments, releases the GIL around estimation, and maps errors.
//! - Errors cross the FFI boundary as `ValueError` with the Rust message.
//!
//! Downstream usage
//! ----------------
//! - Rust code should call [`msm::estimate_msm`] or [`msm::build_msm`]
//!   directly and ignore the PyO3 items.
//! - Python code imports `_rust_msm` and calls
//!   `build_msm(assignments, lag_time, symmetrize="MLE", ...)`.

pub mod msm;
pub mod optimization;
pub mod utils;

#[cfg(feature = "python-bindings")]
use numpy::{IntoPyArray, PyArray1, PyArray2};

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    msm::{
        core::Assignments,
        output::{DirectorySink, MemorySink},
        pipeline::{self, EstimatorReport, MSMEstimate},
    },
    utils::{build_msm_options, extract_assignments, sparse_triplets},
};

/// Sparse matrix as `(n_states, rows, cols, values)`.
#[cfg(feature = "python-bindings")]
type PyTriplets = (usize, Vec<usize>, Vec<usize>, Vec<f64>);

/// MSMResult — outputs of one `build_msm` call.
///
/// Holds the estimate together with the fixed assignments. Matrices are
/// returned as COO triplets so Python callers can build a
/// `scipy.sparse.coo_matrix` without another dependency here.
#[cfg(feature = "python-bindings")]
#[pyclass(name = "MSMResult", module = "rust_msm")]
pub struct MSMResultPy {
    inner: MSMEstimate,
    assignments: Assignments,
}

#[cfg(feature = "python-bindings")]
fn triplets(m: &crate::msm::core::SparseMatrix) -> PyTriplets {
    let (rows, cols, vals) = sparse_triplets(m);
    (m.n_rows(), rows, cols, vals)
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl MSMResultPy {
    #[getter]
    pub fn populations<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.inner.populations.clone().into_pyarray(py)
    }

    /// Original state → new state, `-1` for removed states.
    #[getter]
    pub fn mapping(&self) -> Vec<i32> {
        self.inner.mapping.to_labels()
    }

    /// Fixed assignments, one row per trajectory, padded with `-1`.
    #[getter]
    pub fn assignments<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<i32>> {
        self.assignments.to_padded_array().into_pyarray(py)
    }

    #[getter]
    pub fn transition_matrix(&self) -> PyTriplets {
        triplets(&self.inner.transition)
    }

    #[getter]
    pub fn reversible_counts(&self) -> PyTriplets {
        triplets(&self.inner.reversible_counts)
    }

    #[getter]
    pub fn unsymmetrized_counts(&self) -> PyTriplets {
        triplets(&self.inner.trimmed_counts)
    }

    #[getter]
    pub fn symmetrization(&self) -> &'static str {
        self.inner.symmetrization.name()
    }

    #[getter]
    pub fn discarded_percent(&self) -> f64 {
        self.inner.discard.percent()
    }

    #[getter]
    pub fn converged(&self) -> bool {
        self.inner.report.converged()
    }

    /// Solver iterations of the estimation stage; `None` for Transpose.
    #[getter]
    pub fn iterations(&self) -> Option<usize> {
        match &self.inner.report {
            EstimatorReport::Stationary { iterations, .. }
            | EstimatorReport::DetailedBalance { iterations, .. }
            | EstimatorReport::Tnc { iterations, .. } => Some(*iterations),
            EstimatorReport::Symmetrized => None,
        }
    }

    /// Leading eigenvalues as `(re, im)`; only filled by the `None` strategy.
    #[getter]
    pub fn eigenvalues(&self) -> Vec<(f64, f64)> {
        match &self.inner.report {
            EstimatorReport::Stationary { eigenvalues, .. } => {
                eigenvalues.iter().map(|l| (l.re, l.im)).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Estimate an MSM and optionally write its artifacts to `output_dir`.
///
/// Output files are checked before any computation and written only when the
/// whole estimation succeeded.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(
    name = "build_msm",
    signature = (
        assignments,
        lag_time = 1,
        symmetrize = "MLE",
        min_counts = 0,
        prior = 0.0,
        sliding = true,
        output_dir = None,
        tol_grad = None,
        max_iter = None,
        line_searcher = None,
    ),
    text_signature = "(assignments, /, lag_time=1, symmetrize='MLE', min_counts=0, prior=0.0, \
                      sliding=True, output_dir=None, tol_grad=None, max_iter=None, \
                      line_searcher=None)"
)]
#[allow(clippy::too_many_arguments)]
pub fn py_build_msm<'py>(
    py: Python<'py>, assignments: &Bound<'py, PyAny>, lag_time: usize, symmetrize: &str,
    min_counts: usize, prior: f64, sliding: bool, output_dir: Option<String>,
    tol_grad: Option<f64>, max_iter: Option<usize>, line_searcher: Option<&str>,
) -> PyResult<MSMResultPy> {
    let opts = build_msm_options(
        lag_time,
        symmetrize,
        min_counts,
        prior,
        sliding,
        tol_grad,
        max_iter,
        line_searcher,
    )?;
    let mut fixed = extract_assignments(assignments)?;

    let estimate = py.allow_threads(|| match output_dir {
        Some(dir) => pipeline::build_msm(&mut fixed, &opts, &mut DirectorySink::new(dir)),
        None => pipeline::build_msm(&mut fixed, &opts, &mut MemorySink::new()),
    })?;
    Ok(MSMResultPy { inner: estimate, assignments: fixed })
}

/// `_rust_msm` — PyO3 module initializer.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _rust_msm<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_build_msm, m)?)?;
    m.add_class::<MSMResultPy>()?;
    Ok(())
}
