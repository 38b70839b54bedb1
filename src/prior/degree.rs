//! Degree prior (C5): plain and vertex-labelled variants.
//!
//! State is a degree sequence `k ∈ ℕ^N` with `Σ k_i = 2E`. The
//! vertex-labelled variant shares the same state representation but scores
//! and updates per block, taking the partition and the label graph's
//! per-block degree totals as explicit parameters rather than holding a
//! back-reference to either parent.

use std::collections::HashMap;

use crate::error::InvalidMoveError;
use crate::generators::{sample_random_restricted_partition, sample_random_weak_composition, shuffle};
use crate::moves::GraphMove;
use crate::numeric::{log_multinomial_coefficient, log_multiset_coefficient, log_q};
use crate::prior::{process_once, PriorId, PriorNode, VisitGuard};
use crate::rng::Rng;

/// Below this size, `log_q` is evaluated by the exact memoised recursion;
/// above it, the asymptotic approximation is used.
const LOG_Q_EXACT_THRESHOLD: u64 = 200;

fn log_q_auto(n: u64, k: u64) -> f64 {
    log_q(n, k, n.max(k) <= LOG_Q_EXACT_THRESHOLD)
}

fn value_counts(degrees: &[u64]) -> Vec<u64> {
    let mut histogram: HashMap<u64, u64> = HashMap::new();
    for &d in degrees {
        *histogram.entry(d).or_insert(0) += 1;
    }
    histogram.into_values().collect()
}

/// Updates `degrees` in place for `mv`'s removed-then-added edges,
/// returning an error if any vertex's degree would go negative.
fn apply_move_to_degrees(degrees: &mut [u64], mv: &GraphMove) -> Result<(), InvalidMoveError> {
    for &(u, v) in &mv.removed_edges {
        let delta = if u == v { 2 } else { 1 };
        if degrees[u] < delta || degrees[v] < delta {
            return Err(InvalidMoveError::NegativeEdgeCount {
                got: degrees[u].min(degrees[v]) as i64 - delta as i64,
            });
        }
        degrees[u] -= delta;
        if u != v {
            degrees[v] -= delta;
        }
    }
    for &(u, v) in &mv.added_edges {
        let delta = if u == v { 2 } else { 1 };
        degrees[u] += delta;
        if u != v {
            degrees[v] += delta;
        }
    }
    Ok(())
}

fn degrees_after_move(degrees: &[u64], mv: &GraphMove) -> Result<Vec<u64>, InvalidMoveError> {
    let mut next = degrees.to_vec();
    apply_move_to_degrees(&mut next, mv)?;
    Ok(next)
}

/// Fixed degree sequence `k0`.
#[derive(Debug, Clone)]
pub struct DegreeDeltaPrior {
    id: PriorId,
    state: Vec<u64>,
}

impl DegreeDeltaPrior {
    #[must_use]
    pub fn new(k0: Vec<u64>) -> Self {
        Self { id: PriorId::next(), state: k0 }
    }
}

/// Uniform over weak compositions of `2E` into `N` non-negative parts.
#[derive(Debug, Clone)]
pub struct DegreeUniformPrior {
    id: PriorId,
    state: Vec<u64>,
}

impl DegreeUniformPrior {
    #[must_use]
    pub fn new(state: Vec<u64>) -> Self {
        Self { id: PriorId::next(), state }
    }
}

/// Uniform over unordered partitions of `2E` into `N` non-negative parts,
/// then a uniform permutation across vertices.
#[derive(Debug, Clone)]
pub struct DegreeUniformHyperPrior {
    id: PriorId,
    state: Vec<u64>,
}

impl DegreeUniformHyperPrior {
    #[must_use]
    pub fn new(state: Vec<u64>) -> Self {
        Self { id: PriorId::next(), state }
    }
}

/// Tagged union of plain degree-prior variants.
#[derive(Debug, Clone)]
pub enum DegreePrior {
    Delta(DegreeDeltaPrior),
    Uniform(DegreeUniformPrior),
    UniformHyper(DegreeUniformHyperPrior),
}

impl DegreePrior {
    #[must_use]
    pub fn id(&self) -> PriorId {
        match self {
            Self::Delta(p) => p.id,
            Self::Uniform(p) => p.id,
            Self::UniformHyper(p) => p.id,
        }
    }

    #[must_use]
    pub fn state(&self) -> &[u64] {
        match self {
            Self::Delta(p) => &p.state,
            Self::Uniform(p) => &p.state,
            Self::UniformHyper(p) => &p.state,
        }
    }

    pub fn set_state(&mut self, state: Vec<u64>) {
        match self {
            Self::Delta(p) => p.state = state,
            Self::Uniform(p) => p.state = state,
            Self::UniformHyper(p) => p.state = state,
        }
    }

    /// Samples a degree sequence for `n` vertices summing to `2 * edge_count`.
    pub fn sample_state(&mut self, rng: &mut dyn Rng, n: usize, edge_count: u64) {
        let two_e = 2 * edge_count;
        let state = match self {
            Self::Delta(_) => return,
            Self::Uniform(_) => sample_random_weak_composition(rng, two_e, n as u64),
            Self::UniformHyper(_) => {
                let mut parts = sample_random_restricted_partition(rng, two_e, n as u64, 10 * n.max(1) as u64);
                shuffle(rng, &mut parts);
                parts
            }
        };
        self.set_state(state);
    }

    #[must_use]
    pub fn log_prior(&self) -> f64 {
        0.0
    }

    #[must_use]
    pub fn log_likelihood_from_state(&self, degrees: &[u64], edge_count: u64) -> f64 {
        let n = degrees.len() as u64;
        let two_e = 2 * edge_count;
        match self {
            Self::Delta(p) => {
                if degrees == p.state.as_slice() {
                    0.0
                } else {
                    f64::NEG_INFINITY
                }
            }
            Self::Uniform(_) => -log_multiset_coefficient(n, two_e),
            Self::UniformHyper(_) => {
                -log_multinomial_coefficient(n, &value_counts(degrees)) - log_q_auto(two_e, n)
            }
        }
    }

    #[must_use]
    pub fn log_likelihood(&self, edge_count: u64) -> f64 {
        self.log_likelihood_from_state(self.state(), edge_count)
    }

    pub fn state_after_graph_move(&self, mv: &GraphMove) -> Result<Vec<u64>, InvalidMoveError> {
        degrees_after_move(self.state(), mv)
    }

    pub fn apply_graph_move(&mut self, mv: &GraphMove) -> Result<(), InvalidMoveError> {
        let next = self.state_after_graph_move(mv)?;
        self.set_state(next);
        Ok(())
    }

    /// `_getLogLikelihoodRatioFromGraphMove`: evaluated against `next_edge_count`
    /// (the edge-count prior's state *after* the same move), since the degree
    /// prior holds no back-reference to its parent.
    #[must_use]
    pub fn log_likelihood_ratio_from_graph_move(&self, mv: &GraphMove, edge_count: u64, next_edge_count: u64) -> f64 {
        match self.state_after_graph_move(mv) {
            Err(_) => f64::NEG_INFINITY,
            Ok(next) => {
                self.log_likelihood_from_state(&next, next_edge_count) - self.log_likelihood(edge_count)
            }
        }
    }
}

impl PriorNode for DegreePrior {
    fn id(&self) -> PriorId {
        Self::id(self)
    }

    fn sample_priors(&mut self, _rng: &mut dyn Rng, visited: &mut VisitGuard) {
        process_once(visited, self.id(), (), |_| {});
    }
}

/// Per-block degree allocation, stratified by the current partition:
/// "the same identities stratified by block, with per-block `(E_r, N_r)`
/// in place of `(E, N)`". State is still a flat `Vec<u64>` indexed by
/// vertex; block membership is supplied by the caller at scoring time.
#[derive(Debug, Clone)]
pub enum VertexLabeledDegreePrior {
    Delta(DegreeDeltaPrior),
    Uniform(DegreeUniformPrior),
    UniformHyper(DegreeUniformHyperPrior),
}

impl VertexLabeledDegreePrior {
    #[must_use]
    pub fn id(&self) -> PriorId {
        match self {
            Self::Delta(p) => p.id,
            Self::Uniform(p) => p.id,
            Self::UniformHyper(p) => p.id,
        }
    }

    #[must_use]
    pub fn state(&self) -> &[u64] {
        match self {
            Self::Delta(p) => &p.state,
            Self::Uniform(p) => &p.state,
            Self::UniformHyper(p) => &p.state,
        }
    }

    pub fn set_state(&mut self, state: Vec<u64>) {
        match self {
            Self::Delta(p) => p.state = state,
            Self::Uniform(p) => p.state = state,
            Self::UniformHyper(p) => p.state = state,
        }
    }

    /// Samples a degree sequence block by block: block `r` gets a weak
    /// composition (or restricted partition) of `edge_counts_by_block[r]`
    /// into `vertex_counts_by_block[r]` parts, assigned to that block's
    /// member vertices in `labels` order.
    pub fn sample_state(&mut self, rng: &mut dyn Rng, labels: &[usize], edge_counts_by_block: &[u64]) {
        if matches!(self, Self::Delta(_)) {
            return;
        }
        let members = crate::generators::block_members(labels);
        let mut degrees = vec![0u64; labels.len()];
        let mut blocks: Vec<usize> = members.keys().copied().collect();
        blocks.sort_unstable();
        for r in blocks {
            let vs = &members[&r];
            let e_r = edge_counts_by_block.get(r).copied().unwrap_or(0);
            let n_r = vs.len() as u64;
            let mut allocation = match self {
                Self::Uniform(_) => sample_random_weak_composition(rng, e_r, n_r),
                Self::UniformHyper(_) => {
                    sample_random_restricted_partition(rng, e_r, n_r, 10 * n_r.max(1))
                }
                Self::Delta(_) => unreachable!("handled above"),
            };
            shuffle(rng, &mut allocation);
            for (&v, k) in vs.iter().zip(allocation) {
                degrees[v] = k;
            }
        }
        self.set_state(degrees);
    }

    #[must_use]
    pub fn log_prior(&self) -> f64 {
        0.0
    }

    /// Per-block log-likelihood, summing the flat identity over each block
    /// with `(N, 2E)` replaced by `(n_r, edge_counts_by_block[r])`.
    #[must_use]
    pub fn log_likelihood_from_state(
        &self,
        degrees: &[u64],
        labels: &[usize],
        edge_counts_by_block: &[u64],
    ) -> f64 {
        if let Self::Delta(p) = self {
            return if degrees == p.state.as_slice() {
                0.0
            } else {
                f64::NEG_INFINITY
            };
        }
        let members = crate::generators::block_members(labels);
        let mut total = 0.0;
        for (&r, vs) in &members {
            let n_r = vs.len() as u64;
            let e_r = edge_counts_by_block.get(r).copied().unwrap_or(0);
            let block_degrees: Vec<u64> = vs.iter().map(|&v| degrees[v]).collect();
            total += match self {
                Self::Uniform(_) => -log_multiset_coefficient(n_r, e_r),
                Self::UniformHyper(_) => {
                    -log_multinomial_coefficient(n_r, &value_counts(&block_degrees)) - log_q_auto(e_r, n_r)
                }
                Self::Delta(_) => unreachable!("handled above"),
            };
        }
        total
    }

    #[must_use]
    pub fn log_likelihood(&self, labels: &[usize], edge_counts_by_block: &[u64]) -> f64 {
        self.log_likelihood_from_state(self.state(), labels, edge_counts_by_block)
    }

    pub fn state_after_graph_move(&self, mv: &GraphMove) -> Result<Vec<u64>, InvalidMoveError> {
        degrees_after_move(self.state(), mv)
    }

    pub fn apply_graph_move(&mut self, mv: &GraphMove) -> Result<(), InvalidMoveError> {
        let next = self.state_after_graph_move(mv)?;
        self.set_state(next);
        Ok(())
    }

    #[must_use]
    pub fn log_likelihood_ratio_from_graph_move(
        &self,
        mv: &GraphMove,
        labels: &[usize],
        edge_counts_by_block: &[u64],
        next_edge_counts_by_block: &[u64],
    ) -> f64 {
        match self.state_after_graph_move(mv) {
            Err(_) => f64::NEG_INFINITY,
            Ok(next) => {
                self.log_likelihood_from_state(&next, labels, next_edge_counts_by_block)
                    - self.log_likelihood(labels, edge_counts_by_block)
            }
        }
    }
}

impl PriorNode for VertexLabeledDegreePrior {
    fn id(&self) -> PriorId {
        Self::id(self)
    }

    fn sample_priors(&mut self, _rng: &mut dyn Rng, visited: &mut VisitGuard) {
        process_once(visited, self.id(), (), |_| {});
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_likelihood_matches_multiset_formula() {
        let prior = DegreePrior::Uniform(DegreeUniformPrior::new(vec![2, 2, 2]));
        let ll = prior.log_likelihood(3);
        assert!((ll + log_multiset_coefficient(3, 6)).abs() < 1e-9);
    }

    #[test]
    fn delta_rejects_mismatched_sequence() {
        let prior = DegreePrior::Delta(DegreeDeltaPrior::new(vec![1, 1]));
        assert_eq!(prior.log_likelihood_from_state(&[2, 0], 1), f64::NEG_INFINITY);
    }

    #[test]
    fn graph_move_updates_degrees_with_self_loop_doubling() {
        let mut prior = DegreePrior::Uniform(DegreeUniformPrior::new(vec![0, 0, 0]));
        let mv = GraphMove::new(vec![], vec![(0, 0), (1, 2)]);
        prior.apply_graph_move(&mv).expect("valid move");
        assert_eq!(prior.state(), &[2, 1, 1]);
    }

    #[test]
    fn negative_degree_removal_is_rejected() {
        let prior = DegreePrior::Uniform(DegreeUniformPrior::new(vec![0, 0]));
        let mv = GraphMove::new(vec![(0, 1)], vec![]);
        assert!(prior.state_after_graph_move(&mv).is_err());
    }

    #[test]
    fn vertex_labelled_likelihood_sums_over_blocks() {
        let prior = VertexLabeledDegreePrior::Uniform(DegreeUniformPrior::new(vec![1, 1, 2, 2]));
        let labels = vec![0, 0, 1, 1];
        let edge_counts = vec![2, 4];
        let ll = prior.log_likelihood(&labels, &edge_counts);
        let expected = -log_multiset_coefficient(2, 2) - log_multiset_coefficient(2, 4);
        assert!((ll - expected).abs() < 1e-9);
    }
}
