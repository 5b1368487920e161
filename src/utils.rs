//! Conversion helpers shared by the Python bindings and name-driven callers.
//!
//! Everything here is boundary glue: turning loosely typed arguments
//! (strategy and line-searcher names, optional solver settings) into
//! validated [`MSMOptions`], Python objects into
//! [`Assignments`](crate::msm::core::Assignments), and sparse
//! matrices into triplet lists.
use std::str::FromStr;

#[cfg(feature = "python-bindings")]
use numpy::{PyReadonlyArray2, PyUntypedArrayMethods};

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::msm::core::Assignments;

use crate::{
    msm::{
        core::{LagTime, MSMOptions, SparseMatrix, Symmetrization},
        errors::MSMResult,
    },
    optimization::loglik_optimizer::traits::{LineSearcher, MLEOptions, Tolerances},
};

/// Row indices, column indices and values of the stored entries of `m`.
pub fn sparse_triplets(m: &SparseMatrix) -> (Vec<usize>, Vec<usize>, Vec<f64>) {
    let nnz = m.nnz();
    let mut rows = Vec::with_capacity(nnz);
    let mut cols = Vec::with_capacity(nnz);
    let mut vals = Vec::with_capacity(nnz);
    for (i, j, v) in m.iter() {
        rows.push(i);
        cols.push(j);
        vals.push(v);
    }
    (rows, cols, vals)
}

/// Accept a 2-D integer numpy array (one trajectory per row, `-1` padded) or
/// a sequence of integer sequences.
#[cfg(feature = "python-bindings")]
pub fn extract_assignments<'py>(raw: &Bound<'py, PyAny>) -> PyResult<Assignments> {
    if let Ok(arr) = raw.extract::<PyReadonlyArray2<i32>>() {
        return Ok(Assignments::from_array(&arr.as_array().to_owned())?);
    }
    if let Ok(arr) = raw.extract::<PyReadonlyArray2<i64>>() {
        let (n, m) = (arr.shape()[0], arr.shape()[1]);
        let view = arr.as_array();
        let mut trajectories = Vec::with_capacity(n);
        for i in 0..n {
            let mut traj = Vec::with_capacity(m);
            for j in 0..m {
                let label = i32::try_from(view[[i, j]]).map_err(|_| {
                    PyValueError::new_err(format!(
                        "label {} at trajectory {i}, frame {j} does not fit in int32",
                        view[[i, j]]
                    ))
                })?;
                traj.push(label);
            }
            trajectories.push(traj);
        }
        return Ok(Assignments::new(trajectories)?);
    }
    let nested: Vec<Vec<i32>> = raw.extract().map_err(|_| {
        PyValueError::new_err(
            "assignments must be a 2-D integer numpy.ndarray or a sequence of integer sequences",
        )
    })?;
    Ok(Assignments::new(nested)?)
}

/// Build run options from keyword-style arguments.
///
/// `symmetrize` and `line_searcher` are parsed by name. MLE-TNC settings are
/// only overridden when at least one of them is given.
///
/// # Errors
/// - [`MSMError::UnknownSymmetrization`](crate::msm::errors::MSMError::UnknownSymmetrization) for an unrecognized strategy name.
/// - Any validation error of [`LagTime`], [`MSMOptions`] or the optimizer
///   settings.
#[allow(clippy::too_many_arguments)]
pub fn build_msm_options(
    lag_time: usize, symmetrize: &str, min_counts: usize, prior: f64, sliding: bool,
    tol_grad: Option<f64>, max_iter: Option<usize>, line_searcher: Option<&str>,
) -> MSMResult<MSMOptions> {
    let lag = LagTime::new(lag_time)?;
    let sym = Symmetrization::from_str(symmetrize)?;
    let mut opts = MSMOptions::new(lag, sym, min_counts, prior, sliding)?;
    if tol_grad.is_some() || max_iter.is_some() || line_searcher.is_some() {
        opts = opts.with_mle_opts(mle_opts(tol_grad, max_iter, line_searcher)?);
    }
    Ok(opts)
}

fn mle_opts(
    tol_grad: Option<f64>, max_iter: Option<usize>, line_searcher: Option<&str>,
) -> MSMResult<MLEOptions> {
    let defaults = MLEOptions::default();
    let tols = Tolerances::new(
        tol_grad.or(defaults.tols.tol_grad),
        None,
        max_iter.or(defaults.tols.max_iter),
    )?;
    let ls = match line_searcher {
        Some(name) => LineSearcher::from_str(name)?,
        None => defaults.line_searcher,
    };
    Ok(MLEOptions::new(tols, ls, false, None)?)
}
