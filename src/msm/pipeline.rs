//! pipeline — end-to-end MSM estimation and persistence.
//!
//! Purpose
//! -------
//! Drive assignments through the estimation stages
//! `RawCounts → Trimmed → Estimated → Normalized → Reported` for one of the
//! four [`Symmetrization`] strategies, and hand the results to an
//! [`ArtifactSink`] as a single unit.
//!
//! Key behaviors
//! -------------
//! - Options are validated and the sink is prepared before any numerical
//!   work, so configuration problems never leave partial output.
//! - Stages run strictly in order; [`MSMEstimate::stage`] records the last
//!   completed one.
//! - Strategy dispatch:
//!   - `None`: trim, row-normalize, populations from the stationary
//!     eigenvector. A warning is logged because the model need not satisfy
//!     detailed balance.
//!   - `Transpose`: symmetrize the *untrimmed* counts, then trim, so the
//!     trimmed matrix stays symmetric.
//!   - `MLE` / `MLE-TNC`: trim, then estimate reversible counts with the
//!     prior added to every entry.
//!   Reversible strategies take populations from column sums of the
//!   reversible counts.
//! - The input assignments are replaced by their trimmed relabeling only
//!   when the whole estimation succeeds.
//!
//! Invariants & assumptions
//! ------------------------
//! - `MSMEstimate::transition` is row-stochastic over the retained states.
//! - `MSMEstimate::populations` is non-negative and sums to 1.
//! - `mapping.len()` equals the state count of the enforced assignments and
//!   `mapping.n_retained()` equals the size of every returned matrix.
//!
//! Downstream usage
//! ----------------
//! - Call [`estimate_msm`] for in-memory results, or [`build_msm`] to also
//!   publish them through a [`DirectorySink`](crate::msm::output::DirectorySink)
//!   or [`MemorySink`](crate::msm::output::MemorySink).
use crate::msm::{
    core::{Assignments, MSMOptions, SparseMatrix, StateMapping, Symmetrization},
    counts::count_transitions,
    eigen::stationary_distribution,
    errors::MSMResult,
    output::{ArtifactSink, Artifacts},
    reversible::{iterative_detailed_balance, tnc_reversible_counts, transpose_symmetrize},
    transition::{estimate_transition_matrix, populations_from_counts},
    trim::{ergodic_trim, TrimResult},
};
use nalgebra::Complex;
use ndarray::Array1;
use std::fmt;
use tracing::{info, info_span, instrument, warn};

/// Stages of one estimation run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineStage {
    RawCounts,
    Trimmed,
    Estimated,
    Normalized,
    Reported,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::RawCounts => "raw-counts",
            PipelineStage::Trimmed => "trimmed",
            PipelineStage::Estimated => "estimated",
            PipelineStage::Normalized => "normalized",
            PipelineStage::Reported => "reported",
        };
        f.write_str(name)
    }
}

/// Valid observations before and after trimming.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscardReport {
    /// Assigned frames in the input, before minimum-count enforcement.
    pub valid_before: usize,
    /// Assigned frames left after relabeling with the trim mapping.
    pub valid_after: usize,
}

impl DiscardReport {
    /// Percentage of originally valid frames that were discarded.
    pub fn percent(&self) -> f64 {
        if self.valid_before == 0 {
            return 0.0;
        }
        let lost = self.valid_before.saturating_sub(self.valid_after);
        100.0 * lost as f64 / self.valid_before as f64
    }
}

/// Strategy-specific diagnostics of the estimation stage.
#[derive(Debug, Clone, PartialEq)]
pub enum EstimatorReport {
    /// Non-reversible model; populations from the stationary eigenvector.
    Stationary { eigenvalues: Vec<Complex<f64>>, iterations: usize, residual: f64 },
    /// Transpose symmetrization; nothing iterative to report.
    Symmetrized,
    /// Iterative detailed balance.
    DetailedBalance { converged: bool, iterations: usize, achieved_tol: f64, target_tol: f64 },
    /// Optimizer-based reversible MLE.
    Tnc { converged: bool, iterations: usize, log_likelihood: f64, status: String },
}

impl EstimatorReport {
    pub fn converged(&self) -> bool {
        match self {
            EstimatorReport::Stationary { .. } | EstimatorReport::Symmetrized => true,
            EstimatorReport::DetailedBalance { converged, .. }
            | EstimatorReport::Tnc { converged, .. } => *converged,
        }
    }
}

/// Everything produced by one estimation run.
#[derive(Debug, Clone, PartialEq)]
pub struct MSMEstimate {
    pub symmetrization: Symmetrization,
    /// Row-stochastic transition matrix over retained states.
    pub transition: SparseMatrix,
    /// Count matrix the transition matrix was normalized from.
    pub reversible_counts: SparseMatrix,
    /// Trimmed counts before any reversible estimation.
    pub trimmed_counts: SparseMatrix,
    pub populations: Array1<f64>,
    pub mapping: StateMapping,
    /// States blanked by minimum-count enforcement, in original labels.
    pub low_count_states: Vec<usize>,
    pub discard: DiscardReport,
    pub report: EstimatorReport,
    pub stage: PipelineStage,
}

impl MSMEstimate {
    pub fn n_states(&self) -> usize {
        self.mapping.n_retained()
    }

    /// Borrowed artifact view together with the fixed assignments.
    pub fn artifacts<'a>(&'a self, assignments: &'a Assignments) -> Artifacts<'a> {
        Artifacts {
            transition: &self.transition,
            reversible_counts: &self.reversible_counts,
            trimmed_counts: &self.trimmed_counts,
            mapping: &self.mapping,
            populations: &self.populations,
            assignments,
        }
    }
}

struct Estimated {
    trimmed_counts: SparseMatrix,
    reversible_counts: SparseMatrix,
    mapping: StateMapping,
    populations: Option<Array1<f64>>,
    report: EstimatorReport,
}

/// Estimate an MSM from `assignments`.
///
/// On success `assignments` holds the fixed labels: low-count and trimmed
/// states are `-1` and retained states use their new indices. On error it is
/// left untouched.
///
/// # Errors
/// - Configuration errors from [`MSMOptions::validate`].
/// - [`MSMError::NoValidObservations`](crate::msm::errors::MSMError::NoValidObservations)
///   if nothing is assigned after enforcement.
/// - Any data or numerical error of the selected strategy.
#[instrument(name = "estimate_msm", skip_all, fields(strategy = %opts.symmetrization))]
pub fn estimate_msm(assignments: &mut Assignments, opts: &MSMOptions) -> MSMResult<MSMEstimate> {
    opts.validate()?;
    let mut working = assignments.clone();
    let valid_before = working.count_valid();

    let low_count_states = working.enforce_min_counts(opts.lag_time, opts.min_counts)?;
    if !low_count_states.is_empty() {
        info!(
            n_states = low_count_states.len(),
            min_counts = opts.min_counts,
            "blanked states below the minimum count"
        );
    }

    let num_states = working.num_states()?;
    let raw = {
        let _span = info_span!("count").entered();
        count_transitions(&working, num_states, opts.lag_time, opts.sliding)?
    };
    info!(stage = %PipelineStage::RawCounts, num_states, nnz = raw.nnz(), total = raw.sum());

    let estimated = match opts.symmetrization {
        Symmetrization::None => estimate_non_reversible(&raw, opts)?,
        Symmetrization::Transpose => estimate_transpose(&raw)?,
        Symmetrization::Mle => estimate_detailed_balance(&raw, opts)?,
        Symmetrization::MleTnc => estimate_tnc(&raw, opts)?,
    };
    info!(stage = %PipelineStage::Estimated, converged = estimated.report.converged());

    let transition = estimate_transition_matrix(&estimated.reversible_counts)?;
    let populations = match estimated.populations {
        Some(p) => p,
        None => populations_from_counts(&estimated.reversible_counts)?,
    };
    info!(stage = %PipelineStage::Normalized, n_states = transition.n_rows());

    working.apply_mapping(&estimated.mapping);
    let discard = DiscardReport { valid_before, valid_after: working.count_valid() };
    warn!("{:.3}% of data was discarded by trimming", discard.percent());

    *assignments = working;
    Ok(MSMEstimate {
        symmetrization: opts.symmetrization,
        transition,
        reversible_counts: estimated.reversible_counts,
        trimmed_counts: estimated.trimmed_counts,
        populations,
        mapping: estimated.mapping,
        low_count_states,
        discard,
        report: estimated.report,
        stage: PipelineStage::Normalized,
    })
}

/// Estimate an MSM and publish its artifacts through `sink`.
///
/// The sink is prepared before any computation; artifacts are persisted
/// only after the whole estimation succeeded.
///
/// # Errors
/// - Sink preparation errors (existing outputs, missing or read-only
///   directory) before any work is done.
/// - Any error of [`estimate_msm`].
/// - Persistence errors from the sink; nothing is published in that case.
pub fn build_msm<S: ArtifactSink>(
    assignments: &mut Assignments, opts: &MSMOptions, sink: &mut S,
) -> MSMResult<MSMEstimate> {
    opts.validate()?;
    sink.prepare()?;

    let mut staged = assignments.clone();
    let mut estimate = estimate_msm(&mut staged, opts)?;
    let written = sink.persist(&estimate.artifacts(&staged))?;
    for path in &written {
        info!(path = %path, "wrote artifact");
    }

    *assignments = staged;
    estimate.stage = PipelineStage::Reported;
    info!(stage = %PipelineStage::Reported, n_artifacts = written.len());
    Ok(estimate)
}

fn trim_stage(counts: &SparseMatrix) -> TrimResult {
    let _span = info_span!("trim").entered();
    let trimmed = ergodic_trim(counts);
    info!(
        stage = %PipelineStage::Trimmed,
        retained = trimmed.mapping.n_retained(),
        of = trimmed.mapping.len()
    );
    trimmed
}

fn estimate_non_reversible(raw: &SparseMatrix, opts: &MSMOptions) -> MSMResult<Estimated> {
    warn!(
        "Doing no symmetrization. The resulting model may not satisfy detailed balance \
         and could have complex eigenvalues."
    );
    let trimmed = trim_stage(raw);
    let transition = estimate_transition_matrix(&trimmed.counts)?;
    let stationary = {
        let _span = info_span!("stationary_distribution").entered();
        stationary_distribution(&transition, &opts.eigen)?
    };
    Ok(Estimated {
        reversible_counts: trimmed.counts.clone(),
        trimmed_counts: trimmed.counts,
        mapping: trimmed.mapping,
        populations: Some(stationary.populations),
        report: EstimatorReport::Stationary {
            eigenvalues: stationary.eigenvalues,
            iterations: stationary.iterations,
            residual: stationary.residual,
        },
    })
}

fn estimate_transpose(raw: &SparseMatrix) -> MSMResult<Estimated> {
    let symmetric = transpose_symmetrize(raw)?;
    let trimmed = trim_stage(&symmetric);
    let unsym = raw.submatrix(&trimmed.mapping.retained_states());
    Ok(Estimated {
        trimmed_counts: unsym,
        reversible_counts: trimmed.counts,
        mapping: trimmed.mapping,
        populations: None,
        report: EstimatorReport::Symmetrized,
    })
}

fn estimate_detailed_balance(raw: &SparseMatrix, opts: &MSMOptions) -> MSMResult<Estimated> {
    let trimmed = trim_stage(raw);
    let outcome = {
        let _span = info_span!("detailed_balance").entered();
        iterative_detailed_balance(&trimmed.counts, opts.prior, &opts.detailed_balance)?
    };
    if !outcome.converged {
        warn!(
            iterations = outcome.iterations,
            achieved = outcome.achieved_tol,
            target = outcome.target_tol,
            "iterative detailed balance stopped at its iteration cap"
        );
    }
    Ok(Estimated {
        reversible_counts: outcome.counts,
        trimmed_counts: trimmed.counts,
        mapping: trimmed.mapping,
        populations: None,
        report: EstimatorReport::DetailedBalance {
            converged: outcome.converged,
            iterations: outcome.iterations,
            achieved_tol: outcome.achieved_tol,
            target_tol: outcome.target_tol,
        },
    })
}

fn estimate_tnc(raw: &SparseMatrix, opts: &MSMOptions) -> MSMResult<Estimated> {
    let trimmed = trim_stage(raw);
    let outcome = {
        let _span = info_span!("mle_tnc").entered();
        tnc_reversible_counts(&trimmed.counts, opts.prior, &opts.mle_opts)?
    };
    if !outcome.converged {
        warn!(
            iterations = outcome.iterations,
            status = %outcome.status,
            "reversible MLE optimizer did not report convergence"
        );
    }
    Ok(Estimated {
        reversible_counts: outcome.counts,
        trimmed_counts: trimmed.counts,
        mapping: trimmed.mapping,
        populations: None,
        report: EstimatorReport::Tnc {
            converged: outcome.converged,
            iterations: outcome.iterations,
            log_likelihood: outcome.log_likelihood,
            status: outcome.status,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msm::{
        core::{DetailedBalanceOptions, LagTime},
        errors::MSMError,
        output::{ArtifactKind, MemorySink},
    };
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Strategy dispatch and the populations each strategy produces.
    // - Discard reporting and in-place relabeling of the assignments.
    // - Stage bookkeeping and failure atomicity with an in-memory sink.
    //
    // Directory persistence is covered in `output` and the integration tests.
    // -------------------------------------------------------------------------

    fn reference_assignments() -> Assignments {
        Assignments::new(vec![vec![0, 1, 2, 1, 0, 1, 2]]).expect("valid labels")
    }

    fn opts(sym: Symmetrization) -> MSMOptions {
        MSMOptions::new(LagTime::default(), sym, 0, 0.0, true).expect("valid options")
    }

    #[test]
    // Purpose
    // -------
    // Every strategy recovers the stationary distribution of the reference
    // chain 0-1-2, whose populations are (1/4, 1/2, 1/4).
    //
    // Given
    // -----
    // - The single trajectory [0, 1, 2, 1, 0, 1, 2] at lag 1.
    //
    // Expect
    // ------
    // - Row-stochastic transition matrix and populations close to the
    //   reference for each strategy.
    fn all_strategies_agree_on_reference_chain() {
        let expected = [0.25, 0.5, 0.25];
        for sym in [
            Symmetrization::Transpose,
            Symmetrization::Mle,
            Symmetrization::MleTnc,
        ] {
            let mut a = reference_assignments();
            let est = estimate_msm(&mut a, &opts(sym)).expect("estimation succeeds");
            assert_eq!(est.n_states(), 3);
            for s in est.transition.row_sums().iter() {
                assert_relative_eq!(*s, 1.0, epsilon = 1e-12);
            }
            for (p, e) in est.populations.iter().zip(expected) {
                assert_relative_eq!(*p, e, epsilon = 1e-4);
            }
            assert_eq!(est.stage, PipelineStage::Normalized);
        }
    }

    #[test]
    fn non_reversible_uses_eigenvector_and_reports_eigenvalues() {
        let mut a = reference_assignments();
        let est = estimate_msm(&mut a, &opts(Symmetrization::None)).expect("estimation succeeds");
        match &est.report {
            EstimatorReport::Stationary { eigenvalues, .. } => {
                assert!(eigenvalues.iter().any(|l| (l - Complex::new(1.0, 0.0)).norm() < 1e-6));
            }
            other => panic!("unexpected report: {other:?}"),
        }
        assert_relative_eq!(est.populations.sum(), 1.0, epsilon = 1e-9);
        assert_eq!(est.reversible_counts, est.trimmed_counts);
    }

    #[test]
    // Purpose
    // -------
    // The non-reversible estimate converges on a metastable two-well
    // trajectory whose second eigenvalue is within 2e-4 of 1.
    //
    // Given
    // -----
    // - One trajectory: 10000 frames in 0, 10000 in 1, 10000 in 0.
    // - Counts C00 = 19998, C01 = 1, C10 = 1, C11 = 9999.
    //
    // Expect
    // ------
    // - π0 = T10 / (T01 + T10) with T01 = 1/19999 and T10 = 1/10000.
    // - Agreement with the MLE populations to 1e-4.
    fn non_reversible_converges_on_metastable_trajectory() {
        let traj: Vec<i32> =
            [0, 1, 0].iter().flat_map(|&s| std::iter::repeat(s).take(10_000)).collect();
        let mut a = Assignments::new(vec![traj.clone()]).expect("valid labels");
        let est = estimate_msm(&mut a, &opts(Symmetrization::None)).expect("estimation succeeds");

        let (t01, t10) = (1.0 / 19_999.0, 1.0 / 10_000.0);
        assert_relative_eq!(est.populations[0], t10 / (t01 + t10), epsilon = 1e-9);
        assert_relative_eq!(est.populations[1], t01 / (t01 + t10), epsilon = 1e-9);
        assert!(est.report.converged());

        let mut b = Assignments::new(vec![traj]).expect("valid labels");
        let mle = estimate_msm(&mut b, &opts(Symmetrization::Mle)).expect("estimation succeeds");
        for (p, q) in est.populations.iter().zip(mle.populations.iter()) {
            assert_relative_eq!(*p, *q, epsilon = 1e-4);
        }
    }

    #[test]
    // Purpose
    // -------
    // A state that is only ever left is trimmed; its frames become -1 and
    // count towards the discarded percentage.
    //
    // Given
    // -----
    // - [3, 0, 1, 2, 1, 0, 1, 2]: state 3 appears once, at the start.
    //
    // Expect
    // ------
    // - Three retained states, mapping [0, 1, 2, -1], 12.5% discarded.
    fn transient_state_is_trimmed_and_reported() {
        let mut a = Assignments::new(vec![vec![3, 0, 1, 2, 1, 0, 1, 2]]).expect("valid labels");
        let est = estimate_msm(&mut a, &opts(Symmetrization::Mle)).expect("estimation succeeds");
        assert_eq!(est.mapping.to_labels(), vec![0, 1, 2, -1]);
        assert_relative_eq!(est.discard.percent(), 12.5, epsilon = 1e-12);
        assert_eq!(a.trajectories()[0], vec![-1, 0, 1, 2, 1, 0, 1, 2]);
    }

    #[test]
    fn transpose_keeps_raw_trimmed_counts_as_unsymmetrized() {
        let mut a = reference_assignments();
        let est = estimate_msm(&mut a, &opts(Symmetrization::Transpose)).expect("succeeds");
        assert_relative_eq!(est.trimmed_counts.get(0, 1), 2.0);
        assert_relative_eq!(est.trimmed_counts.get(1, 0), 1.0);
        assert!(est.reversible_counts.is_symmetric(1e-12));
        assert_relative_eq!(est.reversible_counts.get(0, 1), 1.5);
    }

    #[test]
    fn failed_estimation_leaves_assignments_and_sink_untouched() {
        let strict = DetailedBalanceOptions::new(1e-12, 1, true).expect("valid options");
        let o = opts(Symmetrization::Mle).with_detailed_balance(strict);
        let mut a = Assignments::new(vec![vec![0, 1, 2, 0, 1, 2, 1]]).expect("valid");
        let before = a.clone();
        let mut sink = MemorySink::new();

        let err = build_msm(&mut a, &o, &mut sink).expect_err("cap of one sweep");
        assert!(matches!(err, MSMError::DetailedBalanceNotConverged { .. }));
        assert_eq!(a, before);
        assert!(sink.is_empty());
    }

    #[test]
    fn build_msm_reports_and_persists() {
        let mut a = reference_assignments();
        let mut sink = MemorySink::new();
        let est = build_msm(&mut a, &opts(Symmetrization::Mle), &mut sink).expect("succeeds");
        assert_eq!(est.stage, PipelineStage::Reported);
        assert_eq!(sink.get(ArtifactKind::Mapping), Some("0\n1\n2\n"));
        assert_eq!(sink.get(ArtifactKind::Assignments), Some("0 1 2 1 0 1 2\n"));
    }

    #[test]
    fn discard_report_handles_empty_input() {
        let r = DiscardReport { valid_before: 0, valid_after: 0 };
        assert_eq!(r.percent(), 0.0);
        let r = DiscardReport { valid_before: 8, valid_after: 6 };
        assert_relative_eq!(r.percent(), 25.0);
    }
}
