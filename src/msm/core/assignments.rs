//! Assignments — discrete state labels per trajectory and frame.
//!
//! Purpose
//! -------
//! Carry the assignment sequence that feeds the MSM pipeline: one sequence of
//! integer state labels per trajectory, with [`UNASSIGNED`] marking frames
//! that belong to no state. Trajectories may have different lengths.
//!
//! Key behaviors
//! -------------
//! - [`Assignments::new`] rejects an empty collection and labels below the
//!   sentinel. Upper bounds depend on the state count and are checked later by
//!   [`Assignments::validate_states`].
//! - The container is mutated in place twice during a run: by
//!   [`Assignments::enforce_min_counts`] before counting and by
//!   [`Assignments::apply_mapping`] after trimming.
//! - [`Assignments::count_valid`] is the denominator of the discard report.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every stored label is `>= UNASSIGNED`.
//! - Relabeling never changes trajectory lengths.
//!
//! Conventions
//! -----------
//! - Frame and trajectory indices are 0-based.
//! - Rectangular inputs padded with `UNASSIGNED` (as produced by most
//!   clustering tools) are accepted as-is; padding simply counts as
//!   unassigned frames.
use crate::msm::{
    core::{mapping::StateMapping, options::LagTime},
    counts::count_transitions,
    errors::{MSMError, MSMResult},
};
use ndarray::Array2;

/// Label of a frame that belongs to no state.
pub const UNASSIGNED: i32 = -1;

/// Ragged collection of state-label trajectories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignments {
    trajectories: Vec<Vec<i32>>,
}

impl Assignments {
    /// Wrap raw trajectories.
    ///
    /// # Errors
    /// - [`MSMError::EmptyAssignments`] if `trajectories` is empty.
    /// - [`MSMError::StateOutOfRange`] if any label is below [`UNASSIGNED`].
    pub fn new(trajectories: Vec<Vec<i32>>) -> MSMResult<Self> {
        if trajectories.is_empty() {
            return Err(MSMError::EmptyAssignments);
        }
        for (traj, frames) in trajectories.iter().enumerate() {
            if let Some(frame) = frames.iter().position(|&s| s < UNASSIGNED) {
                return Err(MSMError::StateOutOfRange {
                    traj,
                    frame,
                    label: frames[frame],
                    num_states: 0,
                });
            }
        }
        Ok(Self { trajectories })
    }

    /// Build from a rectangular `(n_traj, n_frames)` array.
    ///
    /// # Errors
    /// Same as [`Assignments::new`].
    pub fn from_array(array: &Array2<i32>) -> MSMResult<Self> {
        Self::new(array.outer_iter().map(|row| row.to_vec()).collect())
    }

    pub fn trajectories(&self) -> &[Vec<i32>] {
        &self.trajectories
    }

    pub fn n_trajectories(&self) -> usize {
        self.trajectories.len()
    }

    /// Total number of frames, assigned or not.
    pub fn n_frames(&self) -> usize {
        self.trajectories.iter().map(Vec::len).sum()
    }

    /// Number of frames carrying a state label.
    pub fn count_valid(&self) -> usize {
        self.trajectories.iter().flatten().filter(|&&s| s != UNASSIGNED).count()
    }

    /// Largest assigned label, if any frame is assigned.
    pub fn max_state(&self) -> Option<usize> {
        self.trajectories.iter().flatten().filter(|&&s| s >= 0).max().map(|&s| s as usize)
    }

    /// State count implied by the labels: `max(label) + 1`.
    ///
    /// # Errors
    /// - [`MSMError::NoValidObservations`] if every frame is unassigned.
    pub fn num_states(&self) -> MSMResult<usize> {
        self.max_state().map(|m| m + 1).ok_or(MSMError::NoValidObservations)
    }

    /// Check every label against `num_states`.
    ///
    /// # Errors
    /// - [`MSMError::StateOutOfRange`] for the first label outside
    ///   `[UNASSIGNED, num_states)`.
    pub fn validate_states(&self, num_states: usize) -> MSMResult<()> {
        for (traj, frames) in self.trajectories.iter().enumerate() {
            for (frame, &label) in frames.iter().enumerate() {
                if label < UNASSIGNED || (label >= 0 && label as usize >= num_states) {
                    return Err(MSMError::StateOutOfRange { traj, frame, label, num_states });
                }
            }
        }
        Ok(())
    }

    /// Relabel every frame through `mapping`; removed states become
    /// [`UNASSIGNED`].
    pub fn apply_mapping(&mut self, mapping: &StateMapping) {
        for label in self.trajectories.iter_mut().flatten() {
            *label = mapping.relabel(*label);
        }
    }

    /// Unassign every state with fewer than `min_counts` observed outgoing
    /// transitions at `lag` (sliding windows).
    ///
    /// Returns the original indices of the states that were dropped; labels
    /// that never occur are not reported. A threshold of zero is a no-op.
    ///
    /// # Errors
    /// - [`MSMError::StateOutOfRange`] if labels are invalid.
    pub fn enforce_min_counts(&mut self, lag: LagTime, min_counts: usize) -> MSMResult<Vec<usize>> {
        if min_counts == 0 {
            return Ok(Vec::new());
        }
        let num_states = match self.max_state() {
            Some(m) => m + 1,
            None => return Ok(Vec::new()),
        };
        let counts = count_transitions(self, num_states, lag, true)?;
        let row_sums = counts.row_sums();
        let mut seen = vec![false; num_states];
        for &label in self.trajectories.iter().flatten() {
            if label >= 0 {
                seen[label as usize] = true;
            }
        }
        let dropped: Vec<usize> =
            (0..num_states).filter(|&i| seen[i] && row_sums[i] < min_counts as f64).collect();
        if dropped.is_empty() {
            return Ok(dropped);
        }
        let mut drop = vec![false; num_states];
        for &s in &dropped {
            drop[s] = true;
        }
        for label in self.trajectories.iter_mut().flatten() {
            if *label >= 0 && drop[*label as usize] {
                *label = UNASSIGNED;
            }
        }
        Ok(dropped)
    }

    /// Rectangular view padded with [`UNASSIGNED`] to the longest trajectory.
    pub fn to_padded_array(&self) -> Array2<i32> {
        let width = self.trajectories.iter().map(Vec::len).max().unwrap_or(0);
        let mut out = Array2::from_elem((self.trajectories.len(), width), UNASSIGNED);
        for (i, frames) in self.trajectories.iter().enumerate() {
            for (j, &s) in frames.iter().enumerate() {
                out[[i, j]] = s;
            }
        }
        out
    }

    pub fn into_inner(self) -> Vec<Vec<i32>> {
        self.trajectories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Construction and label validation.
    // - Valid-frame counting and the implied state count.
    // - In-place relabeling and minimum-count enforcement.
    // -------------------------------------------------------------------------

    fn lag1() -> LagTime {
        LagTime::new(1).expect("positive lag")
    }

    #[test]
    fn new_rejects_empty_and_below_sentinel() {
        assert_eq!(Assignments::new(vec![]), Err(MSMError::EmptyAssignments));
        assert!(matches!(
            Assignments::new(vec![vec![0, 1], vec![2, -3]]),
            Err(MSMError::StateOutOfRange { traj: 1, frame: 1, label: -3, .. })
        ));
    }

    #[test]
    fn counts_and_state_bounds() {
        let a = Assignments::new(vec![vec![0, 1, -1, 2], vec![-1, -1]]).expect("valid");
        assert_eq!(a.n_trajectories(), 2);
        assert_eq!(a.n_frames(), 6);
        assert_eq!(a.count_valid(), 3);
        assert_eq!(a.num_states(), Ok(3));
        assert!(a.validate_states(3).is_ok());
        assert!(matches!(
            a.validate_states(2),
            Err(MSMError::StateOutOfRange { traj: 0, frame: 3, label: 2, num_states: 2 })
        ));

        let none = Assignments::new(vec![vec![-1, -1]]).expect("valid");
        assert_eq!(none.num_states(), Err(MSMError::NoValidObservations));
    }

    #[test]
    fn padded_array_round_trips_rectangular_input() {
        let arr = array![[0, 1, 2], [2, -1, -1]];
        let a = Assignments::from_array(&arr).expect("valid");
        assert_eq!(a.to_padded_array(), arr);

        let ragged = Assignments::new(vec![vec![0], vec![1, 1]]).expect("valid");
        assert_eq!(ragged.to_padded_array(), array![[0, -1], [1, 1]]);
    }

    #[test]
    // Purpose
    // -------
    // Relabeling rewrites retained states and unassigns removed ones.
    //
    // Given
    // -----
    // - Labels over 4 states; mapping keeps {1, 3}.
    //
    // Expect
    // ------
    // - 1 -> 0, 3 -> 1, 0 and 2 -> UNASSIGNED, existing UNASSIGNED untouched.
    fn apply_mapping_relabels_in_place() {
        let mut a = Assignments::new(vec![vec![0, 1, 2, 3, -1]]).expect("valid");
        let mapping = StateMapping::from_retained(4, &[1, 3]).expect("in range");
        a.apply_mapping(&mapping);
        assert_eq!(a.trajectories(), &[vec![-1, 0, -1, 1, -1]]);
    }

    #[test]
    // Purpose
    // -------
    // States with too few outgoing transitions are unassigned before counting.
    //
    // Given
    // -----
    // - [[0, 1, 0, 1, 0, 2]] at lag 1: row sums are 0 -> 3, 1 -> 2, 2 -> 0.
    // - Threshold 2.
    //
    // Expect
    // ------
    // - Only state 2 is dropped and its frame becomes UNASSIGNED.
    fn enforce_min_counts_unassigns_sparse_states() {
        let mut a = Assignments::new(vec![vec![0, 1, 0, 1, 0, 2]]).expect("valid");
        let dropped = a.enforce_min_counts(lag1(), 2).expect("valid labels");
        assert_eq!(dropped, vec![2]);
        assert_eq!(a.trajectories(), &[vec![0, 1, 0, 1, 0, -1]]);

        let before = a.clone();
        assert_eq!(a.enforce_min_counts(lag1(), 0), Ok(vec![]));
        assert_eq!(a, before);
    }

    #[test]
    // Purpose
    // -------
    // Gaps in the label numbering are not reported as dropped states.
    //
    // Given
    // -----
    // - [[1, 0, 1, 1, 3, 3, 1]] at lag 1: label 2 never occurs; row sums are
    //   0 -> 1, 1 -> 3, 3 -> 2.
    // - Threshold 2.
    //
    // Expect
    // ------
    // - Only state 0 is dropped; the gap at 2 is not listed.
    fn enforce_min_counts_skips_labels_that_never_occur() {
        let mut a = Assignments::new(vec![vec![1, 0, 1, 1, 3, 3, 1]]).expect("valid");
        let dropped = a.enforce_min_counts(lag1(), 2).expect("valid labels");
        assert_eq!(dropped, vec![0]);
        assert_eq!(a.trajectories(), &[vec![1, -1, 1, 1, 3, 3, 1]]);
    }
}
