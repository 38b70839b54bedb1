//! Nested stochastic block model family (C7): a level stack of partitions
//! and label graphs over a single graph, per the nested-aggregation
//! invariant in [`crate::prior::nested_label_graph`].
//!
//! Nested label-move validity (spec §4.8 rules 1-5): a move at any level is
//! accepted, including one that creates or destroys a block, as long as it
//! does not leave the level above inconsistent. Destroying the last child
//! of a level-`level+1` parent would orphan that parent and is rejected
//! ([`InvalidMoveError::OrphansParentLabel`]); creating a block appends it
//! to its mover's existing level-`level+1` parent, which never changes that
//! parent level's own block count.

use tracing::instrument;

use crate::error::{ConsistencyError, InvalidMoveError};
use crate::graph::Multigraph;
use crate::likelihood::{GraphLikelihood, GraphType, LikelihoodContext};
use crate::moves::{LabelDelta, LabelMove};
use crate::prior::edge_count::EdgeCountPrior;
use crate::prior::label_graph::{LabelGraph, LabelGraphErdosRenyiPrior, LabelGraphPrior};
use crate::prior::nested_block::NestedBlockPrior;
use crate::prior::nested_label_graph::NestedLabelGraphPrior;
use crate::prior::{PriorNode, VisitGuard};
use crate::rng::Rng;

#[derive(Debug, Clone)]
pub struct NestedStochasticBlockModelFamily {
    n: usize,
    graph_type: GraphType,
    self_loops: bool,
    parallel_edges: bool,
    block_counts: Vec<u64>,
    block_prior: NestedBlockPrior,
    edge_count_prior: EdgeCountPrior,
    label_graph_prior: NestedLabelGraphPrior,
    graph: Multigraph,
}

impl NestedStochasticBlockModelFamily {
    /// `block_counts` is the explicit, strictly-decreasing-to-1 sequence
    /// `B_0 > B_1 > ... > B_{D-1} = 1` a [`crate::prior::block_count::NestedBlockCountPrior`]
    /// would also carry; held here as plain data since the family never
    /// resamples it.
    #[must_use]
    pub fn new(
        n: usize,
        graph_type: GraphType,
        self_loops: bool,
        parallel_edges: bool,
        block_counts: Vec<u64>,
        block_prior: NestedBlockPrior,
        edge_count_prior: EdgeCountPrior,
    ) -> Self {
        Self {
            n,
            graph_type,
            self_loops,
            parallel_edges,
            block_counts,
            block_prior,
            edge_count_prior,
            label_graph_prior: NestedLabelGraphPrior::new(Vec::new()),
            graph: Multigraph::new(n),
        }
    }

    #[must_use]
    pub fn graph(&self) -> &Multigraph {
        &self.graph
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.block_prior.depth()
    }

    #[must_use]
    pub fn nested_label(&self, vertex: usize, level: usize) -> usize {
        self.block_prior.label_at(vertex, level)
    }

    /// The `(partition, label_graph)` pair at `level`, used by consistency
    /// checks and nested proposers.
    #[must_use]
    pub fn nested_state(&self, level: usize) -> (&[usize], &LabelGraph) {
        (&self.block_prior.levels()[level], self.label_graph_prior.level(level))
    }

    #[instrument(skip(self, rng), fields(n = self.n))]
    pub fn sample(&mut self, rng: &mut dyn Rng) {
        let mut visited = VisitGuard::new();
        let counts_usize: Vec<usize> = self.block_counts.iter().map(|&b| b as usize).collect();
        self.block_prior.sample_priors(rng, &mut visited);
        self.block_prior.sample_state(rng, self.n, &counts_usize);
        self.edge_count_prior.sample(rng, &mut visited);
        let e = self.edge_count_prior.state();

        let b0 = self.block_prior.block_count_at(0);
        let mut level0_prior = LabelGraphPrior::ErdosRenyi(LabelGraphErdosRenyiPrior::new(LabelGraph::new(b0)));
        level0_prior.sample_priors(rng, &mut visited);
        level0_prior.sample_state(rng, b0, e);
        let level0_counts: std::collections::HashMap<(usize, usize), u64> =
            level0_prior.state().edges().map(|(r, s, m)| ((r, s), m)).collect();
        let labels0 = self.block_prior.labels_at(0, self.n);
        self.graph = crate::generators::sample_sbm(rng, &labels0, &level0_counts, self.self_loops, self.parallel_edges);

        self.label_graph_prior.recompute_from_graph(&self.graph, &self.block_prior, self.n);
    }

    /// Resamples every level's partition, keeping the graph fixed, then
    /// rebuilds the label-graph stack by aggregation from the (unchanged)
    /// finest-level label graph.
    pub fn sample_only_labels(&mut self, rng: &mut dyn Rng) {
        let mut visited = VisitGuard::new();
        let counts_usize: Vec<usize> = self.block_counts.iter().map(|&b| b as usize).collect();
        self.block_prior.sample_priors(rng, &mut visited);
        self.block_prior.sample_state(rng, self.n, &counts_usize);
        self.label_graph_prior.recompute_from_graph(&self.graph, &self.block_prior, self.n);
    }

    /// Compacts every level's partition to first-occurrence order, dropping
    /// empty labels; idempotent. Rebuilds the label-graph stack afterwards
    /// since block indices may have shifted.
    pub fn reduce_labels(&mut self) {
        let reduced: Vec<Vec<usize>> =
            self.block_prior.levels().iter().map(|level| crate::prior::block::reduce_partition(level)).collect();
        self.block_prior.set_levels(reduced);
        self.label_graph_prior.recompute_from_graph(&self.graph, &self.block_prior, self.n);
    }

    fn block_counts_now(&self) -> Vec<u64> {
        (0..self.depth()).map(|l| self.block_prior.block_count_at(l) as u64).collect()
    }

    #[must_use]
    pub fn log_likelihood(&self) -> f64 {
        match self.graph_type {
            GraphType::StubLabeled => {
                let degrees: Vec<u64> = (0..self.n).map(|v| self.graph.degree(v)).collect();
                let ctx =
                    LikelihoodContext { graph: &self.graph, degrees: Some(&degrees), label_graph: None, vertex_counts: None };
                GraphLikelihood::StochasticBlockModel {
                    graph_type: GraphType::StubLabeled,
                    self_loops: self.self_loops,
                    parallel_edges: self.parallel_edges,
                }
                .log_likelihood(&ctx)
            }
            GraphType::UniformMultigraph => {
                let labels0 = self.block_prior.labels_at(0, self.n);
                let vertex_counts = crate::prior::block::vertex_counts(&labels0);
                let ctx = LikelihoodContext {
                    graph: &self.graph,
                    degrees: None,
                    label_graph: Some(self.label_graph_prior.level(0)),
                    vertex_counts: Some(&vertex_counts),
                };
                GraphLikelihood::StochasticBlockModel {
                    graph_type: GraphType::UniformMultigraph,
                    self_loops: self.self_loops,
                    parallel_edges: self.parallel_edges,
                }
                .log_likelihood(&ctx)
            }
        }
    }

    #[must_use]
    pub fn log_prior(&self) -> f64 {
        self.block_prior.log_likelihood()
            + self.edge_count_prior.log_joint()
            + self.label_graph_prior.log_likelihood(&self.block_counts_now(), self.edge_count_prior.state())
    }

    #[must_use]
    pub fn log_joint(&self) -> f64 {
        self.log_likelihood() + self.log_prior()
    }

    pub fn apply_label_move(&mut self, mv: &LabelMove) -> Result<(), InvalidMoveError> {
        let depth = self.depth();
        if mv.level >= depth {
            return Err(InvalidMoveError::UnsupportedLevel { level: mv.level, depth });
        }
        let has_parent_level = mv.level + 1 < depth;
        if has_parent_level {
            match mv.added_labels {
                LabelDelta::Destroyed => {
                    let parent_level = &self.block_prior.levels()[mv.level + 1];
                    let parent = parent_level[mv.prev_label];
                    let siblings = parent_level.iter().filter(|&&p| p == parent).count();
                    if siblings <= 1 {
                        return Err(InvalidMoveError::OrphansParentLabel { label: mv.prev_label, level: mv.level });
                    }
                }
                LabelDelta::Created => {
                    let mut levels = self.block_prior.levels().to_vec();
                    if mv.next_label >= levels[mv.level + 1].len() {
                        let parent = levels[mv.level + 1][mv.prev_label];
                        levels[mv.level + 1].push(parent);
                        self.block_prior.set_levels(levels);
                    }
                }
                LabelDelta::Unchanged => {}
            }
        }
        self.label_graph_prior.apply_label_move(&self.graph, mv, &self.block_prior);
        self.block_prior.apply_label_move(mv)?;
        Ok(())
    }

    /// Ratio by clone-and-recompute: the nested label graph's aggregation
    /// touches every level above `mv.level`, cheaper to re-derive than to
    /// track incrementally for a rarely-hot path.
    #[must_use]
    pub fn log_joint_ratio_from_label_move(&self, mv: &LabelMove) -> f64 {
        let mut next = self.clone();
        if next.apply_label_move(mv).is_err() {
            return f64::NEG_INFINITY;
        }
        next.log_joint() - self.log_joint()
    }

    pub fn check_consistency(&self) -> Result<(), ConsistencyError> {
        let labels0 = self.block_prior.labels_at(0, self.n);
        let b0 = self.block_prior.block_count_at(0);
        let recomputed = crate::prior::label_graph::recompute_from_graph(&self.graph, &labels0, b0);
        for (r, s, m) in self.label_graph_prior.level(0).edges() {
            let actual = recomputed.edge_multiplicity(r, s);
            if actual != m {
                return Err(ConsistencyError::LabelGraphMismatch { r, s, recorded: m, recomputed: actual });
            }
        }
        if !self.label_graph_prior.check_aggregation(&self.block_prior) {
            return Err(ConsistencyError::NestedAggregationMismatch { level: 1, child: 0, parent: 0 });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prior::edge_count::EdgeCountDeltaPrior;
    use crate::prior::nested_block::NestedBlockVariant;
    use crate::rng::StdRngSource;

    fn fresh_family(n: usize) -> NestedStochasticBlockModelFamily {
        NestedStochasticBlockModelFamily::new(
            n,
            GraphType::StubLabeled,
            false,
            true,
            vec![4, 2, 1],
            NestedBlockPrior::new(NestedBlockVariant::Uniform, Vec::new()),
            EdgeCountPrior::Delta(EdgeCountDeltaPrior::new(6)),
        )
    }

    #[test]
    fn sample_produces_a_consistent_nested_state() {
        let mut rng = StdRngSource::seeded(41);
        let mut model = fresh_family(8);
        model.sample(&mut rng);
        assert_eq!(model.depth(), 3);
        model.check_consistency().expect("sampled state is consistent");
    }

    #[test]
    fn unchanged_move_at_top_level_round_trips() {
        let mut rng = StdRngSource::seeded(42);
        let mut model = fresh_family(8);
        model.sample(&mut rng);
        let top = model.depth() - 1;
        let b = model.block_prior.block_count_at(top);
        if b < 2 {
            return;
        }
        let prev = model.block_prior.levels()[top][0];
        let next = (prev + 1) % b;
        let mv = LabelMove::new(0, prev, next, LabelDelta::Unchanged, top);
        let ratio = model.log_joint_ratio_from_label_move(&mv);
        model.apply_label_move(&mv).expect("valid move");
        let inv = mv.invert();
        let inv_ratio = model.log_joint_ratio_from_label_move(&inv);
        assert!((ratio + inv_ratio).abs() < 1e-6);
    }

    #[test]
    fn creating_a_block_below_the_top_level_is_accepted_and_stays_consistent() {
        let mut model = NestedStochasticBlockModelFamily::new(
            4,
            GraphType::StubLabeled,
            false,
            true,
            vec![3, 2, 1],
            NestedBlockPrior::new(NestedBlockVariant::Uniform, vec![vec![0, 0, 1, 1], vec![0, 1]]),
            EdgeCountPrior::Delta(EdgeCountDeltaPrior::new(0)),
        );
        model.label_graph_prior = NestedLabelGraphPrior::new(vec![LabelGraph::new(2), LabelGraph::new(2)]);
        let mv = LabelMove::new(0, 0, 2, LabelDelta::Created, 0);
        model.apply_label_move(&mv).expect("a mid-level create consistent with its parent is valid");
        assert_eq!(model.block_prior.block_count_at(0), 3);
        assert_eq!(model.block_prior.levels()[1].len(), 3);
    }

    #[test]
    fn destroying_the_sole_child_of_a_parent_block_is_rejected() {
        let mut model = NestedStochasticBlockModelFamily::new(
            4,
            GraphType::StubLabeled,
            false,
            true,
            vec![3, 2, 1],
            NestedBlockPrior::new(NestedBlockVariant::Uniform, vec![vec![0, 0, 1, 2], vec![0, 0, 1]]),
            EdgeCountPrior::Delta(EdgeCountDeltaPrior::new(0)),
        );
        let mv = LabelMove::new(3, 2, 0, LabelDelta::Destroyed, 0);
        assert!(model.apply_label_move(&mv).is_err());
    }
}
