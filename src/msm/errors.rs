//! Errors for Markov State Model estimation.
//!
//! [`MSMError`] covers the whole estimation pipeline and is grouped the way
//! callers need to branch on it:
//!
//! - **Configuration** problems are detected before any numerical work
//!   (unknown symmetrization name, invalid lag time / prior / tolerances,
//!   unusable output destination).
//! - **Data** problems are detected while counting or normalizing
//!   (out-of-range labels, empty input, all-zero rows, invalid populations).
//! - **Numerical** problems come from the iterative solvers. Non-convergence
//!   of the detailed-balance iteration is *not* an error by default; it is
//!   reported in the outcome and only raised as
//!   [`MSMError::DetailedBalanceNotConverged`] when the caller requires it.
//! - **Persistence** failures while writing artifacts.
//!
//! Conventions
//! -----------
//! - State indices are 0-based; `-1` is the unassigned / removed sentinel.
//! - Optimizer errors are wrapped unchanged in [`MSMError::Optimization`].
#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*};

use crate::optimization::errors::OptError;

/// Result alias for MSM operations.
pub type MSMResult<T> = Result<T, MSMError>;

#[derive(Debug, Clone, PartialEq)]
pub enum MSMError {
    // ---- Configuration ----
    /// Symmetrization name is not one of None / Transpose / MLE / MLE-TNC.
    UnknownSymmetrization { name: String },

    /// Lag time must be a positive number of steps.
    InvalidLagTime { lag: usize },

    /// Prior must be finite and non-negative.
    InvalidPrior { value: f64 },

    /// Numerical tolerance must be finite and > 0.
    InvalidTolerance { name: &'static str, value: f64 },

    /// Iteration cap must be > 0.
    InvalidMaxIter { name: &'static str, value: usize },

    /// Number of requested eigenpairs must be > 0.
    InvalidNumEigs { value: usize },

    /// An output artifact already exists and would be overwritten.
    OutputExists { path: String },

    /// Output directory does not exist or is not a directory.
    OutputDirMissing { path: String },

    /// Output directory cannot be written to.
    OutputNotWritable { path: String, reason: String },

    // ---- Data ----
    /// No trajectories were supplied.
    EmptyAssignments,

    /// Every label is unassigned; there is nothing to count.
    NoValidObservations,

    /// A label is below the sentinel or not smaller than the state count.
    StateOutOfRange { traj: usize, frame: usize, label: i32, num_states: usize },

    /// Two objects that must share a dimension do not.
    DimensionMismatch { expected: usize, found: usize },

    /// A row of a count matrix sums to zero and cannot be normalized.
    ZeroRowSum { row: usize },

    /// Counts must be non-negative.
    NegativeCount { row: usize, col: usize, value: f64 },

    /// Matrix entry is NaN or infinite.
    NonFiniteEntry { row: usize, col: usize, value: f64 },

    /// Population vector is not a probability distribution.
    InvalidPopulations { reason: String },

    // ---- Numerical ----
    /// Iterative detailed balance stopped at its iteration cap.
    DetailedBalanceNotConverged { iterations: usize, achieved: f64, target: f64 },

    /// Stationary eigenvector iteration stopped at its iteration cap.
    EigenNotConverged { iterations: usize, residual: f64 },

    /// No computed eigenvalue is within tolerance of 1.
    StationaryEigenvalueMismatch { eigenvalue: f64, tol: f64 },

    /// Constrained-optimization MLE failed in the optimizer layer.
    Optimization(OptError),

    // ---- Persistence ----
    /// Writing or publishing an artifact failed.
    Io { path: String, reason: String },
}

impl MSMError {
    /// `true` for problems detected before numerical work starts.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            MSMError::UnknownSymmetrization { .. }
                | MSMError::InvalidLagTime { .. }
                | MSMError::InvalidPrior { .. }
                | MSMError::InvalidTolerance { .. }
                | MSMError::InvalidMaxIter { .. }
                | MSMError::InvalidNumEigs { .. }
                | MSMError::OutputExists { .. }
                | MSMError::OutputDirMissing { .. }
                | MSMError::OutputNotWritable { .. }
        )
    }
}

impl std::error::Error for MSMError {}

impl std::fmt::Display for MSMError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Configuration ----
            MSMError::UnknownSymmetrization { name } => {
                write!(
                    f,
                    "Could not understand symmetrization method '{name}'; expected one of \
                     'None', 'Transpose', 'MLE', 'MLE-TNC'."
                )
            }
            MSMError::InvalidLagTime { lag } => {
                write!(f, "Lag time must be a positive number of steps; got: {lag}")
            }
            MSMError::InvalidPrior { value } => {
                write!(f, "Prior must be finite and non-negative; got: {value}")
            }
            MSMError::InvalidTolerance { name, value } => {
                write!(f, "Tolerance '{name}' must be finite and > 0; got: {value}")
            }
            MSMError::InvalidMaxIter { name, value } => {
                write!(f, "Iteration cap '{name}' must be > 0; got: {value}")
            }
            MSMError::InvalidNumEigs { value } => {
                write!(f, "Number of eigenpairs must be > 0; got: {value}")
            }
            MSMError::OutputExists { path } => {
                write!(f, "Output file {path} already exists; refusing to overwrite.")
            }
            MSMError::OutputDirMissing { path } => {
                write!(f, "Output directory {path} does not exist.")
            }
            MSMError::OutputNotWritable { path, reason } => {
                write!(f, "Output directory {path} is not writable: {reason}")
            }
            // ---- Data ----
            MSMError::EmptyAssignments => write!(f, "Assignments contain no trajectories."),
            MSMError::NoValidObservations => {
                write!(f, "Assignments contain no assigned frames.")
            }
            MSMError::StateOutOfRange { traj, frame, label, num_states } => {
                write!(
                    f,
                    "Label {label} at trajectory {traj}, frame {frame} is outside \
                     [-1, {num_states})."
                )
            }
            MSMError::DimensionMismatch { expected, found } => {
                write!(f, "Dimension mismatch: expected {expected}, found {found}")
            }
            MSMError::ZeroRowSum { row } => {
                write!(f, "Row {row} of the count matrix sums to zero; cannot normalize.")
            }
            MSMError::NegativeCount { row, col, value } => {
                write!(f, "Count at ({row}, {col}) is negative: {value}")
            }
            MSMError::NonFiniteEntry { row, col, value } => {
                write!(f, "Matrix entry at ({row}, {col}) is non-finite: {value}")
            }
            MSMError::InvalidPopulations { reason } => {
                write!(f, "Invalid population vector: {reason}")
            }
            // ---- Numerical ----
            MSMError::DetailedBalanceNotConverged { iterations, achieved, target } => {
                write!(
                    f,
                    "Iterative detailed balance did not converge after {iterations} iterations: \
                     achieved {achieved:e}, target {target:e}"
                )
            }
            MSMError::EigenNotConverged { iterations, residual } => {
                write!(
                    f,
                    "Stationary eigenvector did not converge after {iterations} iterations; \
                     residual {residual:e}"
                )
            }
            MSMError::StationaryEigenvalueMismatch { eigenvalue, tol } => {
                write!(
                    f,
                    "Closest eigenvalue to 1 is {eigenvalue}, outside tolerance {tol:e}; \
                     the transition matrix is not stochastic."
                )
            }
            MSMError::Optimization(err) => write!(f, "MLE-TNC optimization failed: {err}"),
            // ---- Persistence ----
            MSMError::Io { path, reason } => write!(f, "I/O error on {path}: {reason}"),
        }
    }
}

impl From<OptError> for MSMError {
    fn from(err: OptError) -> Self {
        MSMError::Optimization(err)
    }
}

/// Convert an [`MSMError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl std::convert::From<MSMError> for PyErr {
    fn from(err: MSMError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Grouping of configuration errors versus data / numerical errors.
    // - Display text for the strategy-name rejection.
    // - Wrapping of optimizer errors.
    // -------------------------------------------------------------------------

    #[test]
    fn configuration_errors_are_classified() {
        assert!(MSMError::UnknownSymmetrization { name: "Bogus".into() }.is_configuration());
        assert!(MSMError::OutputExists { path: "tProb.mtx".into() }.is_configuration());
        assert!(!MSMError::ZeroRowSum { row: 2 }.is_configuration());
        assert!(!MSMError::Optimization(OptError::MissingThetaHat).is_configuration());
    }

    #[test]
    fn display_names_the_rejected_strategy() {
        let msg = MSMError::UnknownSymmetrization { name: "Bogus".into() }.to_string();
        assert!(msg.contains("'Bogus'"));
        assert!(msg.contains("MLE-TNC"));
    }

    #[test]
    fn opt_errors_convert_into_optimization_variant() {
        let err: MSMError = OptError::NoTolerancesProvided.into();
        assert_eq!(err, MSMError::Optimization(OptError::NoTolerancesProvided));
    }
}
