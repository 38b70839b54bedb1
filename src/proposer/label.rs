//! Flat label-move proposers (C10): uniform and neighbour-mixed.

use crate::graph::Multigraph;
use crate::moves::{LabelDelta, LabelMove};
use crate::rng::Rng;

/// Classifies the block-count effect of relabelling `vertex` to `next`,
/// reusing the same counts the flat block prior's own ratio formulae key
/// off. A move that simultaneously empties the old label and fills a
/// previously-empty one leaves the block count unchanged net, so it is
/// reported as `Unchanged` rather than both created and destroyed.
#[must_use]
pub fn label_delta_for_move(labels: &[usize], vertex: usize, next: usize) -> LabelDelta {
    let prev = labels[vertex];
    if prev == next {
        return LabelDelta::Unchanged;
    }
    let counts = crate::prior::block::vertex_counts(labels);
    let prev_count = counts.get(prev).copied().unwrap_or(0);
    let next_count = counts.get(next).copied().unwrap_or(0);
    match (prev_count == 1, next_count == 0) {
        (true, false) => LabelDelta::Destroyed,
        (false, true) => LabelDelta::Created,
        _ => LabelDelta::Unchanged,
    }
}

fn build_move(labels: &[usize], vertex: usize, next: usize, level: usize) -> LabelMove {
    let prev = labels[vertex];
    let delta = label_delta_for_move(labels, vertex, next);
    LabelMove::new(vertex, prev, next, delta, level)
}

/// Picks a vertex uniformly, then a new label uniformly over `{0, ...,
/// block_count}` (the extra slot lets the move create a fresh block).
#[derive(Debug, Clone, Copy)]
pub struct UniformLabelProposer {
    pub block_count: usize,
}

impl UniformLabelProposer {
    #[must_use]
    pub fn propose(&self, rng: &mut dyn Rng, labels: &[usize]) -> LabelMove {
        let vertex = rng.uniform_usize(0, labels.len());
        let next = rng.uniform_usize(0, self.block_count + 1);
        build_move(labels, vertex, next, 0)
    }

    /// The new label is always drawn uniformly from the same `block_count +
    /// 1`-sized domain, forward and backward alike: `0`.
    #[must_use]
    pub fn log_proposal_ratio(&self, _labels: &[usize], _mv: &LabelMove) -> f64 {
        0.0
    }
}

/// `P(s | v) ∝ Σ_{w ∈ N(v)} m(v,w) · (L(s, b(w)) + shift) / (L.deg(b(w)) +
/// shift·B)`: for every candidate label `s`, sums each neighbour's edge
/// weight scaled by how strongly its own block connects to `s` in the
/// current label graph, exploiting block-to-block connectivity rather than
/// just `v`'s immediate neighbour labels.
fn label_graph_preference(
    label_graph: &Multigraph,
    labels: &[usize],
    block_count: usize,
    shift: f64,
    neighbours: &[(usize, u64)],
    candidate: usize,
) -> f64 {
    // A candidate at or beyond the label graph's current size is a not-yet-
    // created block: it has no recorded edges, so `L(s, ·) = 0`.
    neighbours
        .iter()
        .map(|&(w, m)| {
            let bw = labels[w];
            let l_s_bw = if candidate < label_graph.size() { label_graph.edge_multiplicity(candidate, bw) as f64 } else { 0.0 };
            let deg_bw = label_graph.degree(bw) as f64;
            m as f64 * (l_s_bw + shift) / (deg_bw + shift * block_count as f64)
        })
        .sum()
}

fn label_graph_distribution(
    label_graph: &Multigraph,
    labels: &[usize],
    block_count: usize,
    shift: f64,
    neighbours: &[(usize, u64)],
    domain: usize,
) -> Vec<f64> {
    (0..domain).map(|s| label_graph_preference(label_graph, labels, block_count, shift, neighbours, s)).collect()
}

/// Normalised probability of `label` under `weights` (indexed by label);
/// `0` when every candidate has zero weight, matching the uniform-fallback
/// convention for an isolated vertex.
fn normalised(weights: &[f64], label: usize) -> f64 {
    let total: f64 = weights.iter().sum();
    if total == 0.0 {
        0.0
    } else {
        weights[label] / total
    }
}

/// Mixes a uniform proposal with a label-graph-informed one: with
/// probability `uniform_weight` draws the new label uniformly; otherwise
/// draws from the preference distribution in [`label_graph_preference`].
#[derive(Debug, Clone, Copy)]
pub struct MixedLabelProposer {
    pub block_count: usize,
    pub uniform_weight: f64,
    pub shift: f64,
}

impl MixedLabelProposer {
    #[must_use]
    pub fn propose(&self, rng: &mut dyn Rng, graph: &Multigraph, label_graph: &Multigraph, labels: &[usize]) -> LabelMove {
        let vertex = rng.uniform_usize(0, labels.len());
        let neighbours: Vec<(usize, u64)> = graph.neighbours(vertex).collect();
        let domain = self.block_count + 1;
        let weights = if neighbours.is_empty() {
            Vec::new()
        } else {
            label_graph_distribution(label_graph, labels, self.block_count, self.shift, &neighbours, domain)
        };
        let use_uniform = weights.is_empty() || rng.bernoulli(self.uniform_weight) || weights.iter().sum::<f64>() == 0.0;
        let next = if use_uniform { rng.uniform_usize(0, domain) } else { rng.discrete(&weights) };
        build_move(labels, vertex, next, 0)
    }

    /// `log q(reverse) - log q(forward)` under the mixture: each direction's
    /// proposal density is `uniform_weight / (B + 1) + (1 - uniform_weight) *
    /// P(label | v)` from [`label_graph_preference`], the reverse term read
    /// against the label graph and partition *after* `mv` is applied.
    #[must_use]
    pub fn log_proposal_ratio(&self, graph: &Multigraph, label_graph: &Multigraph, labels: &[usize], mv: &LabelMove) -> f64 {
        let domain = self.block_count + 1;
        let uniform_p = 1.0 / domain as f64;
        let neighbours: Vec<(usize, u64)> = graph.neighbours(mv.vertex).collect();

        let forward_weights = label_graph_distribution(label_graph, labels, self.block_count, self.shift, &neighbours, domain);
        let forward_local = normalised(&forward_weights, mv.next_label);
        let forward = self.uniform_weight * uniform_p + (1.0 - self.uniform_weight) * forward_local;

        let mut next_labels = labels.to_vec();
        next_labels[mv.vertex] = mv.next_label;
        let mut next_label_graph = label_graph.clone();
        if mv.next_label >= next_label_graph.size() {
            next_label_graph.resize(mv.next_label + 1);
        }
        crate::prior::label_graph::apply_label_move_to_state(&mut next_label_graph, graph, labels, mv);
        let reverse_weights =
            label_graph_distribution(&next_label_graph, &next_labels, self.block_count, self.shift, &neighbours, domain);
        let reverse_local = normalised(&reverse_weights, mv.prev_label);
        let reverse = self.uniform_weight * uniform_p + (1.0 - self.uniform_weight) * reverse_local;

        reverse.ln() - forward.ln()
    }
}

/// As [`UniformLabelProposer`], but the new label is drawn from the
/// existing `{0, ..., block_count - 1}` only: it never creates a block.
#[derive(Debug, Clone, Copy)]
pub struct RestrictedUniformLabelProposer {
    pub block_count: usize,
}

impl RestrictedUniformLabelProposer {
    #[must_use]
    pub fn propose(&self, rng: &mut dyn Rng, labels: &[usize]) -> LabelMove {
        let vertex = rng.uniform_usize(0, labels.len());
        let next = rng.uniform_usize(0, self.block_count);
        build_move(labels, vertex, next, 0)
    }

    #[must_use]
    pub fn log_proposal_ratio(&self, _labels: &[usize], _mv: &LabelMove) -> f64 {
        0.0
    }
}

/// As [`MixedLabelProposer`], but the uniform fallback draws from the
/// existing blocks only, matching [`RestrictedUniformLabelProposer`].
#[derive(Debug, Clone, Copy)]
pub struct RestrictedMixedLabelProposer {
    pub block_count: usize,
    pub uniform_weight: f64,
    pub shift: f64,
}

impl RestrictedMixedLabelProposer {
    #[must_use]
    pub fn propose(&self, rng: &mut dyn Rng, graph: &Multigraph, label_graph: &Multigraph, labels: &[usize]) -> LabelMove {
        let vertex = rng.uniform_usize(0, labels.len());
        let neighbours: Vec<(usize, u64)> = graph.neighbours(vertex).collect();
        let domain = self.block_count;
        let weights = if neighbours.is_empty() {
            Vec::new()
        } else {
            label_graph_distribution(label_graph, labels, self.block_count, self.shift, &neighbours, domain)
        };
        let use_uniform = weights.is_empty() || rng.bernoulli(self.uniform_weight) || weights.iter().sum::<f64>() == 0.0;
        let next = if use_uniform { rng.uniform_usize(0, domain) } else { rng.discrete(&weights) };
        build_move(labels, vertex, next, 0)
    }

    #[must_use]
    pub fn log_proposal_ratio(&self, graph: &Multigraph, label_graph: &Multigraph, labels: &[usize], mv: &LabelMove) -> f64 {
        let domain = self.block_count;
        let uniform_p = 1.0 / domain as f64;
        let neighbours: Vec<(usize, u64)> = graph.neighbours(mv.vertex).collect();

        let forward_weights = label_graph_distribution(label_graph, labels, self.block_count, self.shift, &neighbours, domain);
        let forward_local = normalised(&forward_weights, mv.next_label);
        let forward = self.uniform_weight * uniform_p + (1.0 - self.uniform_weight) * forward_local;

        let mut next_labels = labels.to_vec();
        next_labels[mv.vertex] = mv.next_label;
        let mut next_label_graph = label_graph.clone();
        crate::prior::label_graph::apply_label_move_to_state(&mut next_label_graph, graph, labels, mv);
        let reverse_weights =
            label_graph_distribution(&next_label_graph, &next_labels, self.block_count, self.shift, &neighbours, domain);
        let reverse_local = normalised(&reverse_weights, mv.prev_label);
        let reverse = self.uniform_weight * uniform_p + (1.0 - self.uniform_weight) * reverse_local;

        reverse.ln() - forward.ln()
    }
}

/// Tagged dispatch over the four flat label proposers, matched on the
/// generative design's "Gibbs" (may create a block) vs "Restricted"
/// (existing blocks only) and "uniform" vs "mixed" axes.
#[derive(Debug, Clone, Copy)]
pub enum LabelProposer {
    GibbsUniform(UniformLabelProposer),
    RestrictedUniform(RestrictedUniformLabelProposer),
    GibbsMixed(MixedLabelProposer),
    RestrictedMixed(RestrictedMixedLabelProposer),
}

impl LabelProposer {
    #[must_use]
    pub fn propose(&self, rng: &mut dyn Rng, graph: &Multigraph, label_graph: &Multigraph, labels: &[usize]) -> LabelMove {
        match self {
            Self::GibbsUniform(p) => p.propose(rng, labels),
            Self::RestrictedUniform(p) => p.propose(rng, labels),
            Self::GibbsMixed(p) => p.propose(rng, graph, label_graph, labels),
            Self::RestrictedMixed(p) => p.propose(rng, graph, label_graph, labels),
        }
    }

    #[must_use]
    pub fn log_proposal_ratio(&self, graph: &Multigraph, label_graph: &Multigraph, labels: &[usize], mv: &LabelMove) -> f64 {
        match self {
            Self::GibbsUniform(p) => p.log_proposal_ratio(labels, mv),
            Self::RestrictedUniform(p) => p.log_proposal_ratio(labels, mv),
            Self::GibbsMixed(p) => p.log_proposal_ratio(graph, label_graph, labels, mv),
            Self::RestrictedMixed(p) => p.log_proposal_ratio(graph, label_graph, labels, mv),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::StdRngSource;

    #[test]
    fn uniform_proposer_stays_within_extended_domain() {
        let mut rng = StdRngSource::seeded(61);
        let proposer = UniformLabelProposer { block_count: 3 };
        let labels = vec![0, 1, 2, 0];
        for _ in 0..20 {
            let mv = proposer.propose(&mut rng, &labels);
            assert!(mv.next_label <= 3);
        }
    }

    #[test]
    fn label_delta_detects_destroyed_singleton_block() {
        let labels = vec![0, 1, 1];
        assert_eq!(label_delta_for_move(&labels, 0, 1), LabelDelta::Destroyed);
    }

    #[test]
    fn label_delta_detects_created_block() {
        let labels = vec![0, 0, 1];
        assert_eq!(label_delta_for_move(&labels, 0, 2), LabelDelta::Created);
    }

    #[test]
    fn mixed_proposer_falls_back_to_uniform_for_isolated_vertex() {
        let mut rng = StdRngSource::seeded(62);
        let graph = Multigraph::new(3);
        let label_graph = Multigraph::new(3);
        let labels = vec![0, 1, 2];
        let proposer = MixedLabelProposer { block_count: 3, uniform_weight: 0.0, shift: 1.0 };
        let mv = proposer.propose(&mut rng, &graph, &label_graph, &labels);
        assert!(mv.next_label <= 3);
    }

    #[test]
    fn mixed_proposer_prefers_labels_connected_via_the_label_graph() {
        let mut rng = StdRngSource::seeded(65);
        let mut graph = Multigraph::new(3);
        graph.add_multiedge(0, 1, 1);
        let labels = vec![0, 1, 2];
        let mut label_graph = Multigraph::new(3);
        label_graph.add_multiedge(1, 1, 5);
        let proposer = MixedLabelProposer { block_count: 3, uniform_weight: 0.0, shift: 0.1 };
        let mut counts = [0u32; 4];
        for _ in 0..200 {
            let mv = proposer.propose(&mut rng, &graph, &label_graph, &labels);
            counts[mv.next_label] += 1;
        }
        assert!(counts[1] > counts[0] && counts[1] > counts[2] && counts[1] > counts[3]);
    }

    #[test]
    fn restricted_uniform_proposer_never_proposes_a_new_block() {
        let mut rng = StdRngSource::seeded(63);
        let proposer = RestrictedUniformLabelProposer { block_count: 3 };
        let labels = vec![0, 1, 2, 0];
        for _ in 0..20 {
            let mv = proposer.propose(&mut rng, &labels);
            assert!(mv.next_label < 3);
        }
    }

    #[test]
    fn label_proposer_enum_dispatches_to_its_variant() {
        let mut rng = StdRngSource::seeded(64);
        let graph = Multigraph::new(3);
        let label_graph = Multigraph::new(3);
        let labels = vec![0, 1, 2];
        let proposer = LabelProposer::RestrictedUniform(RestrictedUniformLabelProposer { block_count: 3 });
        let mv = proposer.propose(&mut rng, &graph, &label_graph, &labels);
        assert!(mv.next_label < 3);
    }
}
