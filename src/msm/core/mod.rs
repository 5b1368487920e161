//! core — data containers and configuration shared by the MSM stages.
//!
//! Purpose
//! -------
//! Hold the value types passed between pipeline stages: the assignment
//! sequence, the CSR count / transition matrix, the trimming map, and the
//! validated run options. Numerical stages live one level up in
//! [`crate::msm`] and depend on these types only.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every matrix downstream of trimming is indexed by the trimmed state
//!   space; [`StateMapping`] is the only bridge back to original indices.
//! - Stages never mutate a matrix they receive; they build new ones.
//!
//! Conventions
//! -----------
//! - `-1` ([`UNASSIGNED`] / [`REMOVED`]) marks frames and states outside the
//!   model.
//! - No I/O and no logging happen here.
pub mod assignments;
pub mod mapping;
pub mod options;
pub mod sparse;

pub use self::{
    assignments::{Assignments, UNASSIGNED},
    mapping::{StateMapping, REMOVED},
    options::{DetailedBalanceOptions, EigenOptions, LagTime, MSMOptions, Symmetrization},
    sparse::SparseMatrix,
};
