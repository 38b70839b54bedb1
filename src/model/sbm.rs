//! Stochastic block model random-graph models (C7): a fixed-labels variant
//! and the full hierarchical family (block count -> partition -> edge count
//! -> label graph -> likelihood).

use std::collections::HashMap;

use tracing::instrument;

use crate::error::{ConsistencyError, InvalidMoveError};
use crate::graph::Multigraph;
use crate::likelihood::{GraphLikelihood, GraphType, LikelihoodContext};
use crate::moves::{GraphMove, LabelMove};
use crate::prior::block::BlockPrior;
use crate::prior::block_count::BlockCountPrior;
use crate::prior::edge_count::EdgeCountPrior;
use crate::prior::label_graph::{LabelGraph, LabelGraphPrior};
use crate::prior::{PriorNode, VisitGuard};
use crate::rng::Rng;

fn label_graph_to_counts(lg: &LabelGraph) -> HashMap<(usize, usize), u64> {
    lg.edges().map(|(r, s, m)| ((r, s), m)).collect()
}

/// SBM with a partition held fixed externally (e.g. by the caller seeding
/// ground-truth labels); only the label graph and edge count vary.
#[derive(Debug, Clone)]
pub struct StochasticBlockModel {
    n: usize,
    labels: Vec<usize>,
    graph_type: GraphType,
    self_loops: bool,
    parallel_edges: bool,
    edge_count_prior: EdgeCountPrior,
    label_graph_prior: LabelGraphPrior,
    graph: Multigraph,
}

impl StochasticBlockModel {
    #[must_use]
    pub fn new(
        n: usize,
        labels: Vec<usize>,
        graph_type: GraphType,
        self_loops: bool,
        parallel_edges: bool,
        edge_count_prior: EdgeCountPrior,
        label_graph_prior: LabelGraphPrior,
    ) -> Self {
        Self {
            n,
            labels,
            graph_type,
            self_loops,
            parallel_edges,
            edge_count_prior,
            label_graph_prior,
            graph: Multigraph::new(n),
        }
    }

    #[must_use]
    pub fn graph(&self) -> &Multigraph {
        &self.graph
    }

    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    fn block_count(&self) -> u64 {
        crate::prior::block::max_block_count(&self.labels) as u64
    }

    #[instrument(skip(self, rng), fields(n = self.n))]
    pub fn sample(&mut self, rng: &mut dyn Rng) {
        let mut visited = VisitGuard::new();
        self.edge_count_prior.sample(rng, &mut visited);
        let e = self.edge_count_prior.state();
        self.label_graph_prior.sample_priors(rng, &mut visited);
        self.label_graph_prior.sample_state(rng, self.block_count() as usize, e);
        let counts = label_graph_to_counts(self.label_graph_prior.state());
        self.graph = crate::generators::sample_sbm(rng, &self.labels, &counts, self.self_loops, self.parallel_edges);
    }

    fn vertex_counts(&self) -> Vec<u64> {
        crate::prior::block::vertex_counts(&self.labels)
    }

    fn likelihood(&self) -> GraphLikelihood {
        GraphLikelihood::StochasticBlockModel {
            graph_type: self.graph_type,
            self_loops: self.self_loops,
            parallel_edges: self.parallel_edges,
        }
    }

    #[must_use]
    pub fn log_likelihood(&self) -> f64 {
        match self.graph_type {
            GraphType::StubLabeled => {
                let degrees: Vec<u64> = (0..self.n).map(|v| self.graph.degree(v)).collect();
                let ctx = LikelihoodContext {
                    graph: &self.graph,
                    degrees: Some(&degrees),
                    label_graph: None,
                    vertex_counts: None,
                };
                self.likelihood().log_likelihood(&ctx)
            }
            GraphType::UniformMultigraph => {
                let vertex_counts = self.vertex_counts();
                let ctx = LikelihoodContext {
                    graph: &self.graph,
                    degrees: None,
                    label_graph: Some(self.label_graph_prior.state()),
                    vertex_counts: Some(&vertex_counts),
                };
                self.likelihood().log_likelihood(&ctx)
            }
        }
    }

    #[must_use]
    pub fn log_prior(&self) -> f64 {
        self.edge_count_prior.log_joint() + self.label_graph_prior.log_likelihood(self.block_count(), self.edge_count_prior.state())
    }

    #[must_use]
    pub fn log_joint(&self) -> f64 {
        self.log_likelihood() + self.log_prior()
    }

    pub fn apply_graph_move(&mut self, mv: &GraphMove) -> Result<(), InvalidMoveError> {
        for &(u, v) in &mv.removed_edges {
            if self.graph.edge_multiplicity(u, v) == 0 {
                return Err(InvalidMoveError::NonexistentEdgeRemoval { u, v, requested: 1, available: 0 });
            }
        }
        self.edge_count_prior.apply_graph_move(mv)?;
        self.label_graph_prior.apply_graph_move(&self.labels, mv)?;
        for &(u, v) in &mv.removed_edges {
            self.graph.remove_multiedge(u, v, 1);
        }
        for &(u, v) in &mv.added_edges {
            self.graph.add_multiedge(u, v, 1);
        }
        Ok(())
    }

    #[must_use]
    pub fn log_joint_ratio_from_graph_move(&self, mv: &GraphMove) -> f64 {
        let next_edge_count = match self.edge_count_prior.state_after_graph_move(mv) {
            Ok(e) => e,
            Err(_) => return f64::NEG_INFINITY,
        };
        let prior_ratio = self.edge_count_prior.log_joint_ratio_from_graph_move(mv)
            + self.label_graph_prior.log_likelihood_ratio_from_graph_move(
                &self.labels,
                mv,
                self.block_count(),
                self.edge_count_prior.state(),
                next_edge_count,
            );

        let mut next_graph = self.graph.clone();
        for &(u, v) in &mv.removed_edges {
            if next_graph.edge_multiplicity(u, v) == 0 {
                return f64::NEG_INFINITY;
            }
            next_graph.remove_multiedge(u, v, 1);
        }
        for &(u, v) in &mv.added_edges {
            next_graph.add_multiedge(u, v, 1);
        }
        let likelihood_ratio = match self.graph_type {
            GraphType::StubLabeled => {
                let before_degrees: Vec<u64> = (0..self.n).map(|v| self.graph.degree(v)).collect();
                let after_degrees: Vec<u64> = (0..self.n).map(|v| next_graph.degree(v)).collect();
                let before = LikelihoodContext {
                    graph: &self.graph,
                    degrees: Some(&before_degrees),
                    label_graph: None,
                    vertex_counts: None,
                };
                let after = LikelihoodContext {
                    graph: &next_graph,
                    degrees: Some(&after_degrees),
                    label_graph: None,
                    vertex_counts: None,
                };
                self.likelihood().log_likelihood_ratio(&before, &after)
            }
            GraphType::UniformMultigraph => {
                let mut next_label_graph = self.label_graph_prior.state().clone();
                crate::prior::label_graph::apply_graph_move_to_state(&mut next_label_graph, &self.labels, mv);
                let vertex_counts = self.vertex_counts();
                let before = LikelihoodContext {
                    graph: &self.graph,
                    degrees: None,
                    label_graph: Some(self.label_graph_prior.state()),
                    vertex_counts: Some(&vertex_counts),
                };
                let after = LikelihoodContext {
                    graph: &next_graph,
                    degrees: None,
                    label_graph: Some(&next_label_graph),
                    vertex_counts: Some(&vertex_counts),
                };
                self.likelihood().log_likelihood_ratio(&before, &after)
            }
        };
        likelihood_ratio + prior_ratio
    }

    #[must_use]
    pub fn is_compatible(&self, g: &Multigraph) -> bool {
        g.size() == self.n
    }

    pub fn check_consistency(&self) -> Result<(), ConsistencyError> {
        let recomputed = crate::prior::label_graph::recompute_from_graph(&self.graph, &self.labels, self.block_count() as usize);
        for (r, s, m) in self.label_graph_prior.state().edges() {
            let actual = recomputed.edge_multiplicity(r, s);
            if actual != m {
                return Err(ConsistencyError::LabelGraphMismatch { r, s, recorded: m, recomputed: actual });
            }
        }
        Ok(())
    }
}

/// Full hierarchical SBM: `B ~ block_count_prior`, `b ~ block_prior`,
/// `E ~ edge_count_prior`, `L ~ label_graph_prior`, conditioned via the
/// chain in that order.
#[derive(Debug, Clone)]
pub struct StochasticBlockModelFamily {
    n: usize,
    graph_type: GraphType,
    self_loops: bool,
    parallel_edges: bool,
    block_count_prior: BlockCountPrior,
    block_prior: BlockPrior,
    edge_count_prior: EdgeCountPrior,
    label_graph_prior: LabelGraphPrior,
    graph: Multigraph,
}

impl StochasticBlockModelFamily {
    #[must_use]
    pub fn new(
        n: usize,
        graph_type: GraphType,
        self_loops: bool,
        parallel_edges: bool,
        block_count_prior: BlockCountPrior,
        block_prior: BlockPrior,
        edge_count_prior: EdgeCountPrior,
        label_graph_prior: LabelGraphPrior,
    ) -> Self {
        Self {
            n,
            graph_type,
            self_loops,
            parallel_edges,
            block_count_prior,
            block_prior,
            edge_count_prior,
            label_graph_prior,
            graph: Multigraph::new(n),
        }
    }

    #[must_use]
    pub fn graph(&self) -> &Multigraph {
        &self.graph
    }

    #[must_use]
    pub fn labels(&self) -> &[usize] {
        self.block_prior.labels()
    }

    #[instrument(skip(self, rng), fields(n = self.n))]
    pub fn sample(&mut self, rng: &mut dyn Rng) {
        let mut visited = VisitGuard::new();
        self.block_count_prior.sample_priors(rng, &mut visited);
        self.block_count_prior.sample_state(rng);
        let b = self.block_count_prior.state();
        self.block_prior.sample_priors(rng, &mut visited);
        self.block_prior.sample_state(rng, self.n, b);
        self.edge_count_prior.sample_priors(rng, &mut visited);
        self.edge_count_prior.sample_state(rng);
        let e = self.edge_count_prior.state();
        self.label_graph_prior.sample_priors(rng, &mut visited);
        self.label_graph_prior.sample_state(rng, b as usize, e);
        let counts = label_graph_to_counts(self.label_graph_prior.state());
        self.graph =
            crate::generators::sample_sbm(rng, self.block_prior.labels(), &counts, self.self_loops, self.parallel_edges);
    }

    /// Borrows the flat view as a [`StochasticBlockModel`] built from the
    /// current sample, for reuse of its ratio/likelihood machinery by value.
    #[must_use]
    pub fn as_fixed_labels(&self) -> StochasticBlockModel {
        StochasticBlockModel {
            n: self.n,
            labels: self.block_prior.labels().to_vec(),
            graph_type: self.graph_type,
            self_loops: self.self_loops,
            parallel_edges: self.parallel_edges,
            edge_count_prior: self.edge_count_prior.clone(),
            label_graph_prior: self.label_graph_prior.clone(),
            graph: self.graph.clone(),
        }
    }

    #[must_use]
    pub fn log_likelihood(&self) -> f64 {
        self.as_fixed_labels().log_likelihood()
    }

    #[must_use]
    pub fn log_prior(&self) -> f64 {
        self.block_count_prior.log_likelihood()
            + self.block_prior.log_likelihood(self.block_count_prior.state())
            + self.as_fixed_labels().log_prior()
    }

    #[must_use]
    pub fn log_joint(&self) -> f64 {
        self.log_likelihood() + self.log_prior()
    }

    pub fn apply_label_move(&mut self, mv: &LabelMove) -> Result<(), InvalidMoveError> {
        let labels_before = self.block_prior.labels().to_vec();
        self.label_graph_prior.apply_label_move(&self.graph, &labels_before, mv);
        self.block_prior.apply_label_move(mv)?;
        if matches!(mv.added_labels, crate::moves::LabelDelta::Created) {
            self.block_count_prior.set_state(self.block_count_prior.state() + 1);
        } else if matches!(mv.added_labels, crate::moves::LabelDelta::Destroyed) {
            self.block_count_prior.set_state(self.block_count_prior.state() - 1);
        }
        Ok(())
    }

    #[must_use]
    pub fn log_joint_ratio_from_label_move(&self, mv: &LabelMove) -> f64 {
        let block_count = self.block_count_prior.state();
        let next_block_count = (block_count as i64 + mv.added_labels.as_i64()) as u64;
        let block_count_ratio =
            self.block_count_prior.log_likelihood_from_state(next_block_count) - self.block_count_prior.log_likelihood();
        let block_ratio = self.block_prior.log_likelihood_ratio_from_label_move(mv, block_count);

        let labels_before = self.block_prior.labels().to_vec();
        let label_graph_ratio = self.label_graph_prior.log_likelihood_ratio_from_label_move(
            &self.graph,
            &labels_before,
            mv,
            block_count,
            next_block_count,
            self.edge_count_prior.state(),
        );

        let mut next_labels = labels_before.clone();
        next_labels[mv.vertex] = mv.next_label;
        let mut next_label_graph = self.label_graph_prior.state().clone();
        crate::prior::label_graph::apply_label_move_to_state(&mut next_label_graph, &self.graph, &labels_before, mv);
        let likelihood_ratio = match self.graph_type {
            GraphType::StubLabeled => 0.0,
            GraphType::UniformMultigraph => {
                let vertex_counts = crate::prior::block::vertex_counts(&labels_before);
                let next_vertex_counts = crate::prior::block::vertex_counts(&next_labels);
                let before = LikelihoodContext {
                    graph: &self.graph,
                    degrees: None,
                    label_graph: Some(self.label_graph_prior.state()),
                    vertex_counts: Some(&vertex_counts),
                };
                let after = LikelihoodContext {
                    graph: &self.graph,
                    degrees: None,
                    label_graph: Some(&next_label_graph),
                    vertex_counts: Some(&next_vertex_counts),
                };
                let likelihood = GraphLikelihood::StochasticBlockModel {
                    graph_type: self.graph_type,
                    self_loops: self.self_loops,
                    parallel_edges: self.parallel_edges,
                };
                likelihood.log_likelihood_ratio(&before, &after)
            }
        };
        likelihood_ratio + block_count_ratio + block_ratio + label_graph_ratio
    }

    pub fn check_consistency(&self) -> Result<(), ConsistencyError> {
        let reported = self.block_count_prior.state() as usize;
        let effective = crate::prior::block::effective_block_count(self.block_prior.labels());
        if effective > reported {
            return Err(ConsistencyError::BlockCountMismatch { effective, reported });
        }
        self.as_fixed_labels().check_consistency()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prior::block::BlockUniformPrior;
    use crate::prior::block_count::BlockCountDeltaPrior;
    use crate::prior::edge_count::EdgeCountDeltaPrior;
    use crate::prior::label_graph::{LabelGraphErdosRenyiPrior, LabelGraphPrior};
    use crate::rng::StdRngSource;

    fn fresh_family(n: usize, b: u64, e: u64) -> StochasticBlockModelFamily {
        StochasticBlockModelFamily::new(
            n,
            GraphType::StubLabeled,
            false,
            true,
            BlockCountPrior::Delta(BlockCountDeltaPrior::new(b)),
            BlockPrior::Uniform(BlockUniformPrior::new(vec![0; n])),
            EdgeCountPrior::Delta(EdgeCountDeltaPrior::new(e)),
            LabelGraphPrior::ErdosRenyi(LabelGraphErdosRenyiPrior::new(LabelGraph::new(b as usize))),
        )
    }

    #[test]
    fn sample_realises_exact_edge_count_and_is_consistent() {
        let mut rng = StdRngSource::seeded(11);
        let mut model = fresh_family(6, 2, 5);
        model.sample(&mut rng);
        assert_eq!(model.graph().total_edge_number(), 5);
        model.check_consistency().expect("sampled state is consistent");
    }

    #[test]
    fn label_move_round_trips_with_inverse() {
        let mut rng = StdRngSource::seeded(12);
        let mut model = fresh_family(5, 2, 4);
        model.sample(&mut rng);
        let v = 0;
        let prev = model.block_prior.labels()[v];
        let next = 1 - prev;
        let mv = LabelMove::new(v, prev, next, crate::moves::LabelDelta::Unchanged, 0);
        let ratio = model.log_joint_ratio_from_label_move(&mv);
        model.apply_label_move(&mv).expect("valid move");
        let inv = mv.invert();
        let inv_ratio = model.log_joint_ratio_from_label_move(&inv);
        assert!((ratio + inv_ratio).abs() < 1e-9);
    }
}
