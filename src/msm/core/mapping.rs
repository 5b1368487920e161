//! State mapping produced by ergodic trimming.
//!
//! A [`StateMapping`] sends every original state index either to its index in
//! the trimmed state space or to "removed". Retained states keep their
//! relative order, so the image is always the contiguous range
//! `[0, n_retained)`.
use crate::msm::errors::{MSMError, MSMResult};

/// Label used for removed states when the mapping is exported.
pub const REMOVED: i32 = -1;

/// Old → new state index map with a removed sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMapping {
    map: Vec<Option<usize>>,
    n_retained: usize,
}

impl StateMapping {
    /// Mapping that keeps all `n_states` states in place.
    pub fn identity(n_states: usize) -> Self {
        Self { map: (0..n_states).map(Some).collect(), n_retained: n_states }
    }

    /// Mapping that keeps exactly the states in `retained`.
    ///
    /// `retained` may be given in any order; new indices follow increasing
    /// original index.
    ///
    /// # Errors
    /// - [`MSMError::DimensionMismatch`] if a retained index is `>= n_states`.
    pub fn from_retained(n_states: usize, retained: &[usize]) -> MSMResult<Self> {
        let mut keep = vec![false; n_states];
        for &s in retained {
            if s >= n_states {
                return Err(MSMError::DimensionMismatch { expected: n_states, found: s });
            }
            keep[s] = true;
        }
        Ok(Self::from_mask(&keep))
    }

    /// Mapping that keeps state `i` exactly when `keep[i]` is set.
    pub fn from_mask(keep: &[bool]) -> Self {
        let mut next = 0;
        let map = keep
            .iter()
            .map(|&k| {
                if k {
                    next += 1;
                    Some(next - 1)
                } else {
                    None
                }
            })
            .collect();
        Self { map, n_retained: next }
    }

    /// Number of original states (the size of the domain).
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of states in the trimmed space.
    pub fn n_retained(&self) -> usize {
        self.n_retained
    }

    /// New index of `old`, or `None` if removed or outside the domain.
    pub fn get(&self, old: usize) -> Option<usize> {
        self.map.get(old).copied().flatten()
    }

    /// Original indices of retained states, in new-index order.
    pub fn retained_states(&self) -> Vec<usize> {
        self.map.iter().enumerate().filter_map(|(old, new)| new.map(|_| old)).collect()
    }

    pub fn is_identity(&self) -> bool {
        self.map.iter().enumerate().all(|(old, new)| *new == Some(old))
    }

    /// Apply `self` first, then `then`.
    ///
    /// # Errors
    /// - [`MSMError::DimensionMismatch`] if `then` is not defined on the
    ///   image of `self`.
    pub fn compose(&self, then: &StateMapping) -> MSMResult<Self> {
        if then.len() != self.n_retained {
            return Err(MSMError::DimensionMismatch { expected: self.n_retained, found: then.len() });
        }
        let map: Vec<Option<usize>> =
            self.map.iter().map(|new| new.and_then(|mid| then.get(mid))).collect();
        Ok(Self { map, n_retained: then.n_retained })
    }

    /// Relabel a single assignment; negative or removed labels become `REMOVED`.
    pub fn relabel(&self, label: i32) -> i32 {
        if label < 0 {
            return REMOVED;
        }
        match self.get(label as usize) {
            Some(new) => new as i32,
            None => REMOVED,
        }
    }

    /// Signed export: new index per original state, [`REMOVED`] if dropped.
    pub fn to_labels(&self) -> Vec<i32> {
        self.map.iter().map(|new| new.map_or(REMOVED, |n| n as i32)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_retained_reindexes_in_original_order() {
        let m = StateMapping::from_retained(5, &[4, 1, 2]).expect("in range");
        assert_eq!(m.to_labels(), vec![-1, 0, 1, -1, 2]);
        assert_eq!(m.n_retained(), 3);
        assert_eq!(m.retained_states(), vec![1, 2, 4]);
        assert_eq!(m.relabel(4), 2);
        assert_eq!(m.relabel(3), REMOVED);
        assert_eq!(m.relabel(-1), REMOVED);
        assert_eq!(m.relabel(9), REMOVED);
    }

    #[test]
    fn from_mask_matches_from_retained() {
        let m = StateMapping::from_mask(&[false, true, true, false, true]);
        assert_eq!(m, StateMapping::from_retained(5, &[1, 2, 4]).expect("in range"));
        assert_eq!(StateMapping::from_mask(&[]).n_retained(), 0);
    }

    #[test]
    fn from_retained_rejects_out_of_range() {
        assert_eq!(
            StateMapping::from_retained(2, &[2]),
            Err(MSMError::DimensionMismatch { expected: 2, found: 2 })
        );
    }

    #[test]
    // Purpose
    // -------
    // Composition chains two trims into one old -> new map.
    //
    // Given
    // -----
    // - First map keeps {0, 2, 3} of 4 states.
    // - Second map keeps {1, 2} of the 3 survivors.
    //
    // Expect
    // ------
    // - Original states 2 and 3 survive as 0 and 1; 0 and 1 are removed.
    fn compose_chains_mappings() {
        let first = StateMapping::from_retained(4, &[0, 2, 3]).expect("in range");
        let second = StateMapping::from_retained(3, &[1, 2]).expect("in range");
        let both = first.compose(&second).expect("compatible");
        assert_eq!(both.to_labels(), vec![-1, -1, 0, 1]);

        assert!(StateMapping::identity(3).is_identity());
        assert_eq!(first.compose(&StateMapping::identity(3)).expect("compatible"), first);
        assert!(first.compose(&StateMapping::identity(4)).is_err());
    }
}
