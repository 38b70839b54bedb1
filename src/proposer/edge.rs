//! Edge-move proposers (C9): single-edge uniform, hinge-flip
//! (uniform/degree-weighted), and double-edge-swap.
//!
//! Each proposer returns both the [`GraphMove`] and the log Hastings
//! correction `log q(reverse) - log q(forward)` for that specific draw, to
//! be added to the model's `log_joint_ratio_from_graph_move` before the
//! Metropolis accept/reject test. None of these proposers maintain an
//! incremental sampling index; each scan is `O(E)` or `O(V)`, adequate at
//! the sizes this crate targets.

use crate::graph::{canonical_edge, Multigraph};
use crate::likelihood::erdos_renyi::eligible_pair_count;
use crate::moves::GraphMove;
use crate::rng::Rng;

fn all_eligible_pairs(n: usize, self_loops: bool) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for u in 0..n {
        let start = if self_loops { u } else { u + 1 };
        for v in start..n {
            pairs.push((u, v));
        }
    }
    pairs
}

/// Picks an existing edge endpoint pair with probability proportional to
/// its multiplicity; panics if the graph has no edges.
fn pick_existing_edge(rng: &mut dyn Rng, graph: &Multigraph) -> (usize, usize) {
    let edges: Vec<(usize, usize, u64)> = graph.edges().filter(|&(_, _, m)| m > 0).collect();
    let weights: Vec<f64> = edges.iter().map(|&(_, _, m)| m as f64).collect();
    let idx = rng.discrete(&weights);
    (edges[idx].0, edges[idx].1)
}

/// Adds or removes a single edge unit, each with probability 1/2.
#[derive(Debug, Clone, Copy)]
pub struct SingleEdgeUniformProposer {
    pub n: usize,
    pub self_loops: bool,
}

impl SingleEdgeUniformProposer {
    #[must_use]
    pub fn propose(&self, rng: &mut dyn Rng, graph: &Multigraph) -> GraphMove {
        let propose_addition = graph.is_empty() || rng.bernoulli(0.5);
        if propose_addition {
            let pairs = all_eligible_pairs(self.n, self.self_loops);
            let (u, v) = pairs[rng.uniform_usize(0, pairs.len())];
            GraphMove::new(vec![], vec![(u, v)])
        } else {
            let (u, v) = pick_existing_edge(rng, graph);
            GraphMove::new(vec![(u, v)], vec![])
        }
    }

    /// `log q(reverse) - log q(forward)` for `mv`, drawn against `graph` (the
    /// state *before* `mv` is applied).
    #[must_use]
    pub fn log_proposal_ratio(&self, graph: &Multigraph, mv: &GraphMove) -> f64 {
        let eligible = eligible_pair_count(self.n as u64, self.self_loops) as f64;
        let e = graph.total_edge_number() as f64;
        match (mv.added_edges.len(), mv.removed_edges.len()) {
            // forward: 1/2 * 1/eligible (pick the pair to add); reverse:
            // 1/2 * 1/(e + 1) (pick that unit, among e + 1, to remove back).
            (1, 0) => eligible.ln() - (e + 1.0).ln(),
            // forward: 1/2 * 1/e (pick that unit, among e, to remove);
            // reverse: 1/2 * 1/eligible (pick the same pair to add back).
            (0, 1) => e.ln() - eligible.ln(),
            _ => 0.0,
        }
    }
}

/// Detaches one endpoint of a random existing edge and reattaches it to a
/// freshly drawn vertex, preserving total edge count.
#[derive(Debug, Clone, Copy)]
pub struct HingeFlipUniformProposer {
    pub n: usize,
}

impl HingeFlipUniformProposer {
    #[must_use]
    pub fn propose(&self, rng: &mut dyn Rng, graph: &Multigraph) -> GraphMove {
        let (u, v) = pick_existing_edge(rng, graph);
        let hinge = if rng.bernoulli(0.5) { u } else { v };
        let other = if hinge == u { v } else { u };
        let w = rng.uniform_usize(0, self.n);
        GraphMove::new(vec![(u, v)], vec![canonical_edge(other, w)])
    }

    /// Edge selection is weighted by multiplicity and the new endpoint is
    /// drawn uniformly in both directions, so those factors cancel; what
    /// survives is the change in multiplicity at the touched pair and a
    /// factor of 2 each time the flipped pair is, or becomes, a self-loop
    /// (a self-loop has only one hinge to detach, not two).
    #[must_use]
    pub fn log_proposal_ratio(&self, graph: &Multigraph, mv: &GraphMove) -> f64 {
        let (Some(&removed), Some(&added)) = (mv.removed_edges.first(), mv.added_edges.first()) else {
            return 0.0;
        };
        let mut next = graph.clone();
        next.remove_multiedge(removed.0, removed.1, 1);
        next.add_multiedge(added.0, added.1, 1);

        let mult_before_removed = graph.edge_multiplicity(removed.0, removed.1) as f64;
        let mult_after_added = next.edge_multiplicity(added.0, added.1) as f64;

        let log2 = std::f64::consts::LN_2;
        let removed_is_loop = removed.0 == removed.1;
        let added_is_loop = added.0 == added.1;
        let hinge_term = if added_is_loop { 0.0 } else { -log2 } - if removed_is_loop { 0.0 } else { -log2 };

        mult_after_added.ln() - mult_before_removed.ln() + hinge_term
    }
}

/// As [`HingeFlipUniformProposer`], but the new endpoint is drawn with
/// probability proportional to its current degree.
#[derive(Debug, Clone)]
pub struct HingeFlipDegreeProposer {
    pub n: usize,
}

impl HingeFlipDegreeProposer {
    #[must_use]
    pub fn propose(&self, rng: &mut dyn Rng, graph: &Multigraph) -> GraphMove {
        let (u, v) = pick_existing_edge(rng, graph);
        let hinge = if rng.bernoulli(0.5) { u } else { v };
        let other = if hinge == u { v } else { u };
        let weights: Vec<f64> = (0..self.n).map(|x| graph.degree(x) as f64 + 1e-9).collect();
        let w = rng.discrete(&weights);
        GraphMove::new(vec![(u, v)], vec![canonical_edge(other, w)])
    }

    /// Forward draws `w` proportional to `deg(w)` in `graph`; the reverse
    /// move draws `hinge` back proportional to its degree in the post-move
    /// graph, one unit higher at `w` and one lower at the detached vertex.
    #[must_use]
    pub fn log_proposal_ratio(&self, graph: &Multigraph, mv: &GraphMove) -> f64 {
        let Some(&(removed_u, removed_v)) = mv.removed_edges.first() else { return 0.0 };
        let Some(&(kept, attached)) = mv.added_edges.first() else { return 0.0 };
        let detached = if kept == removed_u { removed_v } else { removed_u };
        let deg_attached_before = graph.degree(attached) as f64 + 1e-9;
        let deg_detached_after = (graph.degree(detached) as i64 - 1).max(0) as f64 + 1e-9;
        deg_detached_after.ln() - deg_attached_before.ln()
    }
}

/// Removes two independently drawn edges `(u1, v1)`, `(u2, v2)` and adds
/// `(u1, v2)`, `(u2, v1)`: every vertex's degree is unchanged. Falls back to
/// the identity move if fewer than two edges are present.
#[derive(Debug, Clone, Copy)]
pub struct DoubleEdgeSwapProposer;

impl DoubleEdgeSwapProposer {
    #[must_use]
    pub fn propose(&self, rng: &mut dyn Rng, graph: &Multigraph) -> GraphMove {
        let edges: Vec<(usize, usize, u64)> = graph.edges().filter(|&(_, _, m)| m > 0).collect();
        if edges.len() < 2 {
            return GraphMove::default();
        }
        let weights: Vec<f64> = edges.iter().map(|&(_, _, m)| m as f64).collect();
        let i = rng.discrete(&weights);
        let j = loop {
            let j = rng.discrete(&weights);
            if j != i {
                break j;
            }
        };
        let (u1, v1, _) = edges[i];
        let (u2, v2, _) = edges[j];
        GraphMove::new(vec![(u1, v1), (u2, v2)], vec![canonical_edge(u1, v2), canonical_edge(u2, v1)])
    }

    /// Swap partners are drawn symmetrically forward and backward: `0`.
    #[must_use]
    pub fn log_proposal_ratio(&self, _graph: &Multigraph, _mv: &GraphMove) -> f64 {
        0.0
    }
}

/// Tagged dispatch over the four edge-move proposers.
#[derive(Debug, Clone)]
pub enum EdgeProposer {
    SingleEdge(SingleEdgeUniformProposer),
    HingeFlipUniform(HingeFlipUniformProposer),
    HingeFlipDegree(HingeFlipDegreeProposer),
    DoubleEdgeSwap(DoubleEdgeSwapProposer),
}

impl EdgeProposer {
    #[must_use]
    pub fn propose(&self, rng: &mut dyn Rng, graph: &Multigraph) -> GraphMove {
        match self {
            Self::SingleEdge(p) => p.propose(rng, graph),
            Self::HingeFlipUniform(p) => p.propose(rng, graph),
            Self::HingeFlipDegree(p) => p.propose(rng, graph),
            Self::DoubleEdgeSwap(p) => p.propose(rng, graph),
        }
    }

    #[must_use]
    pub fn log_proposal_ratio(&self, graph: &Multigraph, mv: &GraphMove) -> f64 {
        match self {
            Self::SingleEdge(p) => p.log_proposal_ratio(graph, mv),
            Self::HingeFlipUniform(p) => p.log_proposal_ratio(graph, mv),
            Self::HingeFlipDegree(p) => p.log_proposal_ratio(graph, mv),
            Self::DoubleEdgeSwap(p) => p.log_proposal_ratio(graph, mv),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::StdRngSource;

    #[test]
    fn single_edge_proposer_always_changes_edge_count_by_one() {
        let mut rng = StdRngSource::seeded(51);
        let mut g = Multigraph::new(4);
        g.add_multiedge(0, 1, 1);
        let proposer = SingleEdgeUniformProposer { n: 4, self_loops: false };
        for _ in 0..20 {
            let mv = proposer.propose(&mut rng, &g);
            assert_eq!(mv.edge_count_delta().abs(), 1);
        }
    }

    #[test]
    fn hinge_flip_preserves_edge_count() {
        let mut rng = StdRngSource::seeded(52);
        let mut g = Multigraph::new(5);
        g.add_multiedge(0, 1, 1);
        g.add_multiedge(1, 2, 1);
        let proposer = HingeFlipUniformProposer { n: 5 };
        let mv = proposer.propose(&mut rng, &g);
        assert_eq!(mv.edge_count_delta(), 0);
    }

    /// Fixture: `(0,1)` mult 1, `(1,1)` self-loop, `(0,2)` mult 2, `n=4`.
    fn toy_graph() -> Multigraph {
        let mut g = Multigraph::new(4);
        g.add_multiedge(0, 1, 1);
        g.add_multiedge(1, 1, 1);
        g.add_multiedge(0, 2, 2);
        g
    }

    #[test]
    fn hinge_flip_ratio_for_ordinary_moves_is_zero() {
        let g = toy_graph();
        let proposer = HingeFlipUniformProposer { n: 4 };
        let mv = GraphMove::new(vec![(0, 1)], vec![(0, 3)]);
        assert_eq!(proposer.log_proposal_ratio(&g, &mv), 0.0);
        let mv = GraphMove::new(vec![(0, 2)], vec![(0, 1)]);
        assert_eq!(proposer.log_proposal_ratio(&g, &mv), 0.0);
    }

    #[test]
    fn hinge_flip_ratio_accounts_for_multiplicity_change() {
        let g = toy_graph();
        let proposer = HingeFlipUniformProposer { n: 4 };
        let mv = GraphMove::new(vec![(0, 2)], vec![(0, 3)]);
        let ratio = proposer.log_proposal_ratio(&g, &mv);
        assert!((ratio - (-std::f64::consts::LN_2)).abs() < 1e-9);
    }

    #[test]
    fn hinge_flip_ratio_penalises_leaving_a_self_loop() {
        let g = toy_graph();
        let proposer = HingeFlipUniformProposer { n: 4 };
        let mv = GraphMove::new(vec![(1, 1)], vec![(1, 3)]);
        let ratio = proposer.log_proposal_ratio(&g, &mv);
        assert!((ratio - (-std::f64::consts::LN_2)).abs() < 1e-9);
    }

    #[test]
    fn hinge_flip_ratio_rewards_forming_a_self_loop() {
        let g = toy_graph();
        let proposer = HingeFlipUniformProposer { n: 4 };
        let mv = GraphMove::new(vec![(0, 1)], vec![(0, 0)]);
        let ratio = proposer.log_proposal_ratio(&g, &mv);
        assert!((ratio - std::f64::consts::LN_2).abs() < 1e-9);
    }

    #[test]
    fn hinge_flip_ratio_doubles_when_target_self_loop_already_exists() {
        let g = toy_graph();
        let proposer = HingeFlipUniformProposer { n: 4 };
        let mv = GraphMove::new(vec![(1, 0)], vec![(1, 1)]);
        let ratio = proposer.log_proposal_ratio(&g, &mv);
        assert!((ratio - 2.0 * std::f64::consts::LN_2).abs() < 1e-9);
    }

    #[test]
    fn double_edge_swap_preserves_all_degrees() {
        let mut rng = StdRngSource::seeded(53);
        let mut g = Multigraph::new(4);
        g.add_multiedge(0, 1, 1);
        g.add_multiedge(2, 3, 1);
        let proposer = DoubleEdgeSwapProposer;
        let mv = proposer.propose(&mut rng, &g);
        let degrees_before: Vec<u64> = (0..4).map(|v| g.degree(v)).collect();
        let mut next = g.clone();
        for &(u, v) in &mv.removed_edges {
            next.remove_multiedge(u, v, 1);
        }
        for &(u, v) in &mv.added_edges {
            next.add_multiedge(u, v, 1);
        }
        let degrees_after: Vec<u64> = (0..4).map(|v| next.degree(v)).collect();
        assert_eq!(degrees_before, degrees_after);
    }

    #[test]
    fn edge_proposer_enum_dispatches_to_its_variant() {
        let mut rng = StdRngSource::seeded(54);
        let mut g = Multigraph::new(4);
        g.add_multiedge(0, 1, 1);
        let proposer = EdgeProposer::SingleEdge(SingleEdgeUniformProposer { n: 4, self_loops: false });
        let mv = proposer.propose(&mut rng, &g);
        assert_eq!(mv.edge_count_delta().abs(), 1);
    }
}
