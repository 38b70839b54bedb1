//! Nested label-graph prior (C4).
//!
//! State is a vector of label graphs `L^(0), ..., L^(D-1)`: `L^(0)` is the
//! flat label graph over the level-0 blocks, and `L^(l+1)` is `L^(l)`'s own
//! label graph under the level-`l+1` partition of level-`l` blocks. Reuses
//! [`crate::prior::label_graph::recompute_from_graph`] at each level,
//! treating the previous level's label graph as "the graph" for the next.

use crate::graph::Multigraph;
use crate::moves::{LabelDelta, LabelMove};
use crate::numeric::log_multiset_coefficient;
use crate::prior::label_graph::{recompute_from_graph, LabelGraph};
use crate::prior::nested_block::NestedBlockPrior;
use crate::prior::{process_once, PriorId, PriorNode, VisitGuard};
use crate::rng::Rng;

#[derive(Debug, Clone)]
pub struct NestedLabelGraphPrior {
    id: PriorId,
    levels: Vec<LabelGraph>,
}

impl NestedLabelGraphPrior {
    #[must_use]
    pub fn new(levels: Vec<LabelGraph>) -> Self {
        Self { id: PriorId::next(), levels }
    }

    #[must_use]
    pub fn id(&self) -> PriorId {
        self.id
    }

    #[must_use]
    pub fn levels(&self) -> &[LabelGraph] {
        &self.levels
    }

    #[must_use]
    pub fn level(&self, l: usize) -> &LabelGraph {
        &self.levels[l]
    }

    /// Rebuilds every level from the underlying graph and the nested
    /// partition's level stack: `L^(0)` aggregates `graph` by
    /// `nested.labels_at(0, n)`; `L^(l+1)` aggregates `L^(l)` by
    /// `nested.levels()[l+1]`.
    pub fn recompute_from_graph(&mut self, graph: &Multigraph, nested: &NestedBlockPrior, n_vertices: usize) {
        let depth = nested.depth();
        let mut levels = Vec::with_capacity(depth);
        let l0 = recompute_from_graph(graph, &nested.labels_at(0, n_vertices), nested.block_count_at(0));
        levels.push(l0);
        for l in 1..depth {
            let prev = levels[l - 1].clone();
            let block_labels = &nested.levels()[l];
            let next = recompute_from_graph(&prev, block_labels, nested.block_count_at(l));
            levels.push(next);
        }
        self.levels = levels;
    }

    #[must_use]
    pub fn log_prior(&self) -> f64 {
        0.0
    }

    /// Erdős–Rényi-style likelihood at every level (the nested SBM family's
    /// only currently specified label-graph kind); `block_counts[l]` is the
    /// level-`l` block count and `edge_counts[l]` its total edge count
    /// (`edge_counts[0]` is the model's edge count; deeper levels carry the
    /// aggregated total, which is invariant across levels).
    #[must_use]
    pub fn log_likelihood(&self, block_counts: &[u64], edge_count: u64) -> f64 {
        self.levels
            .iter()
            .zip(block_counts)
            .map(|(_, &b)| -log_multiset_coefficient(b * (b + 1) / 2, edge_count))
            .sum()
    }

    /// Checks that each level aggregates its child exactly: every block
    /// pair's multiplicity at level `l+1` equals the sum, over child block
    /// pairs mapping onto it, of the level-`l` multiplicities.
    #[must_use]
    pub fn check_aggregation(&self, nested: &NestedBlockPrior) -> bool {
        for l in 1..self.levels.len() {
            let expected = recompute_from_graph(&self.levels[l - 1], &nested.levels()[l], nested.block_count_at(l));
            if expected != self.levels[l] {
                return false;
            }
        }
        true
    }

    /// Applies a label move at `mv.level` to the corresponding label-graph
    /// level — the real graph for `level == 0`, the level-below label graph
    /// otherwise, matching
    /// [`crate::prior::label_graph::apply_label_move_to_state`]'s flat-case
    /// contract — then rebuilds every level above it by aggregation. A move
    /// that reassigns a block to a different level-`level+1` parent changes
    /// those parents' own label graph, so levels above the touched one
    /// cannot be patched incrementally; `nested` must already reflect
    /// `mv.level + 1`'s partition for the move (the caller extends it for a
    /// `Created` delta before calling this).
    pub fn apply_label_move(&mut self, graph: &Multigraph, mv: &LabelMove, nested: &NestedBlockPrior) {
        if let LabelDelta::Created = mv.added_labels {
            let needed = mv.next_label + 1;
            if self.levels[mv.level].size() < needed {
                self.levels[mv.level].resize(needed);
            }
        }
        let labels_before = nested.levels()[mv.level].clone();
        if mv.level == 0 {
            crate::prior::label_graph::apply_label_move_to_state(&mut self.levels[0], graph, &labels_before, mv);
        } else {
            let below = self.levels[mv.level - 1].clone();
            crate::prior::label_graph::apply_label_move_to_state(&mut self.levels[mv.level], &below, &labels_before, mv);
        }
        for l in (mv.level + 1)..self.levels.len() {
            let prev = self.levels[l - 1].clone();
            self.levels[l] = recompute_from_graph(&prev, &nested.levels()[l], nested.block_count_at(l));
        }
    }
}

impl PriorNode for NestedLabelGraphPrior {
    fn id(&self) -> PriorId {
        self.id
    }

    fn sample_priors(&mut self, _rng: &mut dyn Rng, visited: &mut VisitGuard) {
        process_once(visited, self.id, (), |_| {});
    }
}
