//! Count matrix builder.
//!
//! Scans every trajectory for transitions `s(t) = i → s(t + lag) = j` and
//! accumulates them into a sparse `num_states × num_states` count matrix.
//!
//! - With `sliding = true` every start offset `t` contributes; otherwise only
//!   `t = 0, lag, 2·lag, …`.
//! - A pair is skipped when either end is [`UNASSIGNED`](super::core::UNASSIGNED).
//! - Trajectories with at most `lag` frames contribute nothing.
//!
//! Trajectories are counted in parallel with rayon. Partial counts are
//! integers merged by addition, so the result does not depend on scheduling;
//! conversion to `f64` happens once at the end and is exact.
use crate::msm::{
    core::{Assignments, LagTime, SparseMatrix},
    errors::MSMResult,
};
use rayon::prelude::*;
use std::collections::HashMap;

type PairCounts = HashMap<(usize, usize), u64>;

/// Build the transition count matrix of `assignments` at `lag`.
///
/// # Errors
/// - [`MSMError::StateOutOfRange`](crate::msm::errors::MSMError::StateOutOfRange)
///   if a label is outside `[-1, num_states)`.
pub fn count_transitions(
    assignments: &Assignments, num_states: usize, lag: LagTime, sliding: bool,
) -> MSMResult<SparseMatrix> {
    assignments.validate_states(num_states)?;
    let lag = lag.get();
    let step = if sliding { 1 } else { lag };

    let merged = assignments
        .trajectories()
        .par_iter()
        .map(|traj| count_trajectory(traj, lag, step))
        .reduce(PairCounts::new, merge_counts);

    SparseMatrix::from_triplets(
        num_states,
        num_states,
        merged.into_iter().map(|((i, j), n)| (i, j, n as f64)),
    )
}

fn count_trajectory(traj: &[i32], lag: usize, step: usize) -> PairCounts {
    let mut counts = PairCounts::new();
    if traj.len() <= lag {
        return counts;
    }
    for t in (0..traj.len() - lag).step_by(step) {
        let (from, to) = (traj[t], traj[t + lag]);
        if from < 0 || to < 0 {
            continue;
        }
        *counts.entry((from as usize, to as usize)).or_insert(0) += 1;
    }
    counts
}

fn merge_counts(mut left: PairCounts, right: PairCounts) -> PairCounts {
    if left.len() < right.len() {
        return merge_counts(right, left);
    }
    for (pair, n) in right {
        *left.entry(pair).or_insert(0) += n;
    }
    left
}
