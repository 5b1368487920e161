//! Ergodic trimming.
//!
//! Purpose
//! -------
//! Restrict a count matrix to its largest strongly connected set of states,
//! so that every retained state can reach every other. Estimating a
//! transition matrix on anything larger yields transient or absorbing states
//! and an ill-defined stationary distribution.
//!
//! Key behaviors
//! -------------
//! - [`strongly_connected_components`] runs Tarjan's algorithm on the graph
//!   with an edge `i → j` iff `C[i, j] > 0`. The traversal keeps its own
//!   stack, so deep graphs do not overflow the call stack.
//! - [`ergodic_trim`] keeps the component with the most states. Ties go to
//!   the component whose smallest state index is lowest.
//! - The trimmed matrix is the principal submatrix on the kept states, in
//!   original index order, together with the old → new [`StateMapping`].
//!
//! Edge cases
//! ----------
//! - A graph with no edges still has singleton components; the trim keeps
//!   state 0.
//! - A matrix with zero states produces an empty result.
use crate::msm::core::{SparseMatrix, StateMapping};

/// Trimmed counts and the map from original to trimmed states.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimResult {
    pub counts: SparseMatrix,
    pub mapping: StateMapping,
}

/// Strongly connected components of the positive-entry graph of `counts`.
///
/// Each component is sorted ascending; components come out in the order
/// Tarjan's algorithm completes them (reverse topological order).
pub fn strongly_connected_components(counts: &SparseMatrix) -> Vec<Vec<usize>> {
    let n = counts.n_rows().min(counts.n_cols());
    let adjacency: Vec<Vec<usize>> = (0..n)
        .map(|i| counts.row(i).filter(|&(j, v)| v > 0.0 && j < n).map(|(j, _)| j).collect())
        .collect();

    let mut index = vec![usize::MAX; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut components: Vec<Vec<usize>> = Vec::new();
    let mut next_index = 0usize;

    // Call frames: (node, position of the next neighbor to visit).
    let mut frames: Vec<(usize, usize)> = Vec::new();

    for root in 0..n {
        if index[root] != usize::MAX {
            continue;
        }
        frames.push((root, 0));
        index[root] = next_index;
        lowlink[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;

        while let Some(frame) = frames.last_mut() {
            let v = frame.0;
            if let Some(&w) = adjacency[v].get(frame.1) {
                frame.1 += 1;
                if index[w] == usize::MAX {
                    index[w] = next_index;
                    lowlink[w] = next_index;
                    next_index += 1;
                    stack.push(w);
                    on_stack[w] = true;
                    frames.push((w, 0));
                } else if on_stack[w] {
                    lowlink[v] = lowlink[v].min(index[w]);
                }
                continue;
            }

            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[v]);
            }
            if lowlink[v] == index[v] {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                component.sort_unstable();
                components.push(component);
            }
        }
    }
    components
}

/// Restrict `counts` to its largest strongly connected component.
pub fn ergodic_trim(counts: &SparseMatrix) -> TrimResult {
    let n = counts.n_rows();
    let components = strongly_connected_components(counts);
    let kept = components
        .into_iter()
        .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| b[0].cmp(&a[0])))
        .unwrap_or_default();

    let keep: Vec<bool> = (0..n).map(|i| kept.binary_search(&i).is_ok()).collect();
    let mapping = StateMapping::from_mask(&keep);
    TrimResult { counts: counts.submatrix(&kept), mapping }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Tarjan components on small directed graphs.
    // - Largest-component selection with lowest-index tie-break.
    // - Identity on ergodic input and idempotence.
    // - Degenerate graphs without edges.
    // -------------------------------------------------------------------------

    fn matrix(dense: ndarray::Array2<f64>) -> SparseMatrix {
        SparseMatrix::from_dense(&dense).expect("finite entries")
    }

    #[test]
    // Purpose
    // -------
    // Components of a graph with a 3-cycle, a sink and a source.
    //
    // Given
    // -----
    // - 0 -> 1 -> 2 -> 0, 2 -> 3, 4 -> 0.
    //
    // Expect
    // ------
    // - Components {0, 1, 2}, {3}, {4}.
    fn tarjan_finds_cycle_sink_and_source() {
        let c = matrix(array![
            [0.0, 1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0, 0.0],
        ]);
        let mut comps = strongly_connected_components(&c);
        comps.sort();
        assert_eq!(comps, vec![vec![0, 1, 2], vec![3], vec![4]]);

        let trimmed = ergodic_trim(&c);
        assert_eq!(trimmed.mapping.to_labels(), vec![0, 1, 2, -1, -1]);
        assert_eq!(
            trimmed.counts.to_dense(),
            array![[0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]]
        );
    }

    #[test]
    fn ergodic_input_is_left_unchanged() {
        let c = matrix(array![[1.0, 2.0, 0.0], [1.0, 0.0, 2.0], [0.0, 1.0, 3.0]]);
        let trimmed = ergodic_trim(&c);
        assert!(trimmed.mapping.is_identity());
        assert_eq!(trimmed.counts, c);
    }

    #[test]
    // Purpose
    // -------
    // Equal-size components resolve to the one containing the lowest index.
    //
    // Given
    // -----
    // - Two 2-cycles {1, 3} and {0, 2}, no edges between them.
    //
    // Expect
    // ------
    // - {0, 2} is kept.
    fn ties_go_to_lowest_index() {
        let c = matrix(array![
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
        ]);
        let trimmed = ergodic_trim(&c);
        assert_eq!(trimmed.mapping.to_labels(), vec![0, -1, 1, -1]);
    }

    #[test]
    fn trimming_is_idempotent() {
        let c = matrix(array![
            [0.0, 3.0, 0.0, 1.0],
            [2.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 0.0],
        ]);
        let first = ergodic_trim(&c);
        let second = ergodic_trim(&first.counts);
        assert_eq!(second.counts, first.counts);
        assert!(second.mapping.is_identity());
        let composed = first.mapping.compose(&second.mapping).expect("compatible");
        assert_eq!(composed, first.mapping);
    }

    #[test]
    fn graph_without_edges_keeps_a_singleton() {
        let trimmed = ergodic_trim(&SparseMatrix::zeros(3, 3));
        assert_eq!(trimmed.mapping.to_labels(), vec![0, -1, -1]);
        assert_eq!(trimmed.counts.shape(), (1, 1));

        let empty = ergodic_trim(&SparseMatrix::zeros(0, 0));
        assert_eq!(empty.counts.shape(), (0, 0));
        assert!(empty.mapping.is_empty());
    }

    #[test]
    // Purpose
    // -------
    // The trim mapping is always defined on every original state and its
    // image matches the trimmed matrix, including degenerate inputs.
    //
    // Given
    // -----
    // - An empty matrix, an edgeless one, a source/sink graph and an ergodic
    //   cycle.
    //
    // Expect
    // ------
    // - `mapping.len()` equals the input size.
    // - `mapping.n_retained()` equals the trimmed size and the retained
    //   states are the kept component.
    fn mapping_covers_every_original_state() {
        let cases = [
            SparseMatrix::zeros(0, 0),
            SparseMatrix::zeros(4, 4),
            matrix(array![[0.0, 1.0, 0.0], [0.0, 1.0, 1.0], [0.0, 1.0, 0.0]]),
            matrix(array![[0.0, 1.0], [1.0, 0.0]]),
        ];
        let expected_kept: [Vec<usize>; 4] = [vec![], vec![0], vec![1, 2], vec![0, 1]];
        for (c, kept) in cases.iter().zip(expected_kept) {
            let trimmed = ergodic_trim(c);
            assert_eq!(trimmed.mapping.len(), c.n_rows());
            assert_eq!(trimmed.mapping.n_retained(), trimmed.counts.n_rows());
            assert_eq!(trimmed.mapping.retained_states(), kept);
        }
    }

    #[test]
    fn long_chain_does_not_recurse() {
        let n = 50_000;
        let triplets = (0..n).map(|i| (i, (i + 1) % n, 1.0));
        let c = SparseMatrix::from_triplets(n, n, triplets).expect("valid triplets");
        let comps = strongly_connected_components(&c);
        assert_eq!(comps.len(), 1);
        assert_eq!(comps[0].len(), n);
    }
}
