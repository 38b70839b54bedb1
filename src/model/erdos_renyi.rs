//! Erdős–Rényi random-graph model (C7).

use tracing::instrument;

use crate::error::{ConsistencyError, InvalidMoveError};
use crate::graph::Multigraph;
use crate::likelihood::{GraphLikelihood, LikelihoodContext};
use crate::moves::GraphMove;
use crate::prior::edge_count::EdgeCountPrior;
use crate::prior::VisitGuard;
use crate::rng::Rng;

/// Owns an edge-count prior and the graph it generates; likelihood is
/// Erdős–Rényi (§4.6); the natural proposer is the single-edge uniform
/// proposer (C9).
#[derive(Debug, Clone)]
pub struct ErdosRenyiModel {
    n: usize,
    self_loops: bool,
    parallel_edges: bool,
    edge_count_prior: EdgeCountPrior,
    graph: Multigraph,
}

impl ErdosRenyiModel {
    #[must_use]
    pub fn new(n: usize, self_loops: bool, parallel_edges: bool, edge_count_prior: EdgeCountPrior) -> Self {
        Self {
            n,
            self_loops,
            parallel_edges,
            edge_count_prior,
            graph: Multigraph::new(n),
        }
    }

    #[must_use]
    pub fn graph(&self) -> &Multigraph {
        &self.graph
    }

    #[instrument(skip(self, rng), fields(n = self.n))]
    pub fn sample(&mut self, rng: &mut dyn Rng) {
        let mut visited = VisitGuard::new();
        self.edge_count_prior.sample(rng, &mut visited);
        let e = self.edge_count_prior.state();
        self.graph = crate::generators::sample_erdos_renyi(rng, self.n, e, self.self_loops, self.parallel_edges);
    }

    fn context(&self) -> LikelihoodContext<'_> {
        LikelihoodContext { graph: &self.graph, degrees: None, label_graph: None, vertex_counts: None }
    }

    #[must_use]
    pub fn likelihood(&self) -> GraphLikelihood {
        GraphLikelihood::ErdosRenyi { self_loops: self.self_loops, parallel_edges: self.parallel_edges }
    }

    #[must_use]
    pub fn log_likelihood(&self) -> f64 {
        self.likelihood().log_likelihood(&self.context())
    }

    #[must_use]
    pub fn log_prior(&self) -> f64 {
        self.edge_count_prior.log_joint()
    }

    #[must_use]
    pub fn log_joint(&self) -> f64 {
        self.log_likelihood() + self.log_prior()
    }

    pub fn apply_graph_move(&mut self, mv: &GraphMove) -> Result<(), InvalidMoveError> {
        for &(u, v) in &mv.removed_edges {
            let available = self.graph.edge_multiplicity(u, v);
            if available == 0 {
                return Err(InvalidMoveError::NonexistentEdgeRemoval { u, v, requested: 1, available });
            }
        }
        self.edge_count_prior.apply_graph_move(mv)?;
        for &(u, v) in &mv.removed_edges {
            self.graph.remove_multiedge(u, v, 1);
        }
        for &(u, v) in &mv.added_edges {
            self.graph.add_multiedge(u, v, 1);
        }
        Ok(())
    }

    #[must_use]
    pub fn log_likelihood_ratio_from_graph_move(&self, mv: &GraphMove) -> f64 {
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
        let before = self.context();
        let after = LikelihoodContext { graph: &next_graph, degrees: None, label_graph: None, vertex_counts: None };
        self.likelihood().log_likelihood_ratio(&before, &after)
    }

    #[must_use]
    pub fn log_prior_ratio_from_graph_move(&self, mv: &GraphMove) -> f64 {
        self.edge_count_prior.log_joint_ratio_from_graph_move(mv)
    }

    #[must_use]
    pub fn log_joint_ratio_from_graph_move(&self, mv: &GraphMove) -> f64 {
        self.log_likelihood_ratio_from_graph_move(mv) + self.log_prior_ratio_from_graph_move(mv)
    }

    /// A candidate graph is compatible iff its size matches and (when
    /// self-loops/parallel edges are disallowed) it respects those
    /// constraints — the strengthened check named in the design notes'
    /// open question on `isCompatible`.
    #[must_use]
    pub fn is_compatible(&self, g: &Multigraph) -> bool {
        if g.size() != self.n {
            return false;
        }
        if !self.self_loops && (0..g.size()).any(|v| g.edge_multiplicity(v, v) > 0) {
            return false;
        }
        if !self.parallel_edges && g.edges().any(|(_, _, m)| m > 1) {
            return false;
        }
        true
    }

    pub fn check_consistency(&self) -> Result<(), ConsistencyError> {
        if self.graph.total_edge_number() != self.edge_count_prior.state() {
            return Err(ConsistencyError::DegreeSumMismatch {
                expected: self.edge_count_prior.state(),
                actual: self.graph.total_edge_number(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prior::edge_count::{EdgeCountDeltaPrior, EdgeCountPrior};
    use crate::rng::StdRngSource;

    #[test]
    fn sample_produces_exact_edge_count() {
        let mut rng = StdRngSource::seeded(1);
        let mut model = ErdosRenyiModel::new(5, false, false, EdgeCountPrior::Delta(EdgeCountDeltaPrior::new(4)));
        model.sample(&mut rng);
        assert_eq!(model.graph().total_edge_number(), 4);
        model.check_consistency().expect("sampled state is consistent");
    }

    #[test]
    fn apply_graph_move_round_trips_with_inverse() {
        let mut rng = StdRngSource::seeded(2);
        let mut model = ErdosRenyiModel::new(4, false, true, EdgeCountPrior::Delta(EdgeCountDeltaPrior::new(2)));
        model.sample(&mut rng);
        let mv = GraphMove::new(vec![], vec![(0, 1)]);
        let ratio = model.log_joint_ratio_from_graph_move(&mv);
        model.apply_graph_move(&mv).expect("valid move");
        let inv = mv.invert();
        let inv_ratio = model.log_joint_ratio_from_graph_move(&inv);
        assert!((ratio + inv_ratio).abs() < 1e-9);
    }

    #[test]
    fn is_compatible_rejects_self_loops_when_disallowed() {
        let model = ErdosRenyiModel::new(3, false, false, EdgeCountPrior::Delta(EdgeCountDeltaPrior::new(0)));
        let mut g = Multigraph::new(3);
        g.add_multiedge(0, 0, 1);
        assert!(!model.is_compatible(&g));
    }
}
