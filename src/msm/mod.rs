//! msm — Markov State Model estimation from state-assignment trajectories.
//!
//! Purpose
//! -------
//! Turn discrete state labels sampled along molecular-dynamics trajectories
//! into an ergodic transition matrix, its stationary populations, and the
//! bookkeeping needed to map results back to the original state space.
//!
//! Key behaviors
//! -------------
//! - [`counts`]: lagged transition counts (sliding or strided windows),
//!   accumulated per trajectory in parallel.
//! - [`trim`]: Tarjan strongly connected components and restriction to the
//!   largest one.
//! - [`reversible`]: transpose symmetrization plus two maximum-likelihood
//!   estimators of detailed-balance counts.
//! - [`transition`] and [`eigen`]: row normalization and the two ways of
//!   obtaining populations.
//! - [`pipeline`]: strategy dispatch over the stages above, and
//!   all-or-nothing publication through an [`output::ArtifactSink`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Count matrices hold exact integers until a reversible estimator runs.
//! - Every matrix after trimming is square over the retained states and
//!   strongly connected.
//! - Returned populations are non-negative and sum to 1.
//!
//! Conventions
//! -----------
//! - States are 0-based; `-1` marks unassigned frames and removed states.
//! - Only [`pipeline`] logs (via `tracing`); numerical modules report through
//!   return values.
//!
//! Testing notes
//! -------------
//! - Each submodule carries unit tests for its own contract; end-to-end
//!   scenarios live in `tests/integration_msm_pipeline.rs`.
pub mod core;
pub mod counts;
pub mod eigen;
pub mod errors;
pub mod output;
pub mod pipeline;
pub mod reversible;
pub mod transition;
pub mod trim;

pub use self::core::{
    Assignments, DetailedBalanceOptions, EigenOptions, LagTime, MSMOptions, SparseMatrix,
    StateMapping, Symmetrization,
};
pub use self::errors::{MSMError, MSMResult};
pub use self::output::{ArtifactKind, ArtifactSink, Artifacts, DirectorySink, MemorySink};
pub use self::pipeline::{
    build_msm, estimate_msm, DiscardReport, EstimatorReport, MSMEstimate, PipelineStage,
};

pub mod prelude {
    pub use super::core::{
        Assignments, DetailedBalanceOptions, EigenOptions, LagTime, MSMOptions, SparseMatrix,
        StateMapping, Symmetrization, UNASSIGNED,
    };
    pub use super::errors::{MSMError, MSMResult};
    pub use super::output::{ArtifactSink, DirectorySink, MemorySink};
    pub use super::pipeline::{build_msm, estimate_msm, MSMEstimate};
}
