//! Sampling generators (C8).
//!
//! Combinatorial samplers used both to draw initial states for the flat
//! priors in [`crate::prior`] and as the graph generators a random-graph
//! model calls from `sample()`. Every function here takes its [`Rng`] by
//! `&mut dyn` rather than holding one, matching the injected-resource
//! design of [`crate::rng`].

use std::collections::HashMap;

use crate::graph::Multigraph;
use crate::numeric::log_multinomial_coefficient;
use crate::rng::Rng;

/// In-place uniform shuffle (Fisher-Yates).
pub fn shuffle<T>(rng: &mut dyn Rng, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = rng.uniform_usize(0, i + 1);
        items.swap(i, j);
    }
}

/// Draws `k` distinct indices from `0..n` without replacement, via a
/// partial Fisher-Yates over a `0..n` pool. `O(k)` after the initial pool
/// allocation.
#[must_use]
pub fn sample_uniform_sequence_without_replacement(rng: &mut dyn Rng, n: usize, k: usize) -> Vec<usize> {
    assert!(k <= n, "cannot draw {k} distinct values from {n}");
    let mut pool: Vec<usize> = (0..n).collect();
    let mut result = Vec::with_capacity(k);
    for i in 0..k {
        let j = rng.uniform_usize(i, n);
        pool.swap(i, j);
        result.push(pool[i]);
    }
    result
}

/// Draws a uniformly random strict composition of `n` into `k` positive
/// parts: `k - 1` sorted distinct values in `{1, ..., n-1}`, differenced.
#[must_use]
pub fn sample_random_composition(rng: &mut dyn Rng, n: u64, k: u64) -> Vec<u64> {
    if k == 0 {
        return Vec::new();
    }
    if k == 1 {
        return vec![n];
    }
    let domain = (n - 1) as usize;
    let mut xs: Vec<u64> = sample_uniform_sequence_without_replacement(rng, domain, (k - 1) as usize)
        .into_iter()
        .map(|x| x as u64 + 1)
        .collect();
    xs.sort_unstable();
    let mut result = Vec::with_capacity(k as usize);
    let mut prev = 0u64;
    for x in xs.drain(..) {
        result.push(x - prev);
        prev = x;
    }
    result.push(n - prev);
    result
}

/// Draws a uniformly random weak composition of `n` into `k` non-negative
/// parts: `k - 1` sorted distinct values in `{0, ..., n+k-2}`, with the
/// transform `c_i = x_i - x_{i-1} - 1` (boundary values `x_0 = -1`,
/// `x_k = n+k-1`).
#[must_use]
pub fn sample_random_weak_composition(rng: &mut dyn Rng, n: u64, k: u64) -> Vec<u64> {
    if k == 0 {
        return Vec::new();
    }
    if k == 1 {
        return vec![n];
    }
    let domain = (n + k - 1) as usize;
    let mut xs: Vec<i64> = sample_uniform_sequence_without_replacement(rng, domain, (k - 1) as usize)
        .into_iter()
        .map(|x| x as i64)
        .collect();
    xs.sort_unstable();
    let mut result = Vec::with_capacity(k as usize);
    let mut prev = -1i64;
    for x in xs.drain(..) {
        result.push((x - prev - 1) as u64);
        prev = x;
    }
    result.push(((n + k - 1) as i64 - prev - 1) as u64);
    result
}

/// Metropolis chain of length `steps` over weak compositions of `n` into
/// `k` parts, targeting the distribution uniform over *unordered*
/// partitions: the acceptance ratio `exp(logMultinomial(prev) -
/// logMultinomial(next))` downweights compositions with many symmetric
/// orderings so that, once the caller permutes positions uniformly, every
/// partition shape is equally likely.
#[must_use]
pub fn sample_random_restricted_partition(rng: &mut dyn Rng, n: u64, k: u64, steps: u64) -> Vec<u64> {
    if k == 0 {
        return Vec::new();
    }
    let mut state = sample_random_weak_composition(rng, n, k);
    if k < 2 {
        return state;
    }
    let mut state_log_m = log_multinomial_coefficient(n, &state);
    for _ in 0..steps {
        let i = rng.uniform_usize(0, k as usize);
        let mut j = rng.uniform_usize(0, k as usize);
        while j == i {
            j = rng.uniform_usize(0, k as usize);
        }
        if state[i] == 0 {
            continue;
        }
        let mut proposal = state.clone();
        proposal[i] -= 1;
        proposal[j] += 1;
        let proposal_log_m = log_multinomial_coefficient(n, &proposal);
        let log_accept = state_log_m - proposal_log_m;
        if log_accept >= 0.0 || rng.uniform_real() < log_accept.exp() {
            state = proposal;
            state_log_m = proposal_log_m;
        }
    }
    state
}

/// Samples a uniformly random label sequence whose per-label occurrence
/// counts match `counts`, by shuffling a pool with `counts[label]` copies
/// of each `label`.
#[must_use]
pub fn sample_random_permutation(rng: &mut dyn Rng, counts: &[u64]) -> Vec<usize> {
    let mut pool = Vec::with_capacity(counts.iter().sum::<u64>() as usize);
    for (label, &count) in counts.iter().enumerate() {
        pool.extend(std::iter::repeat(label).take(count as usize));
    }
    shuffle(rng, &mut pool);
    pool
}

/// All canonical vertex pairs `(u, v)`, `u <= v`, eligible to carry an
/// edge; `self_loops` controls whether `u == v` is included.
fn all_vertex_pairs(n: usize, self_loops: bool) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for u in 0..n {
        let start = if self_loops { u } else { u + 1 };
        for v in start..n {
            pairs.push((u, v));
        }
    }
    pairs
}

/// Draws `e` edges uniformly from the eligible pair set `pairs`, either
/// with replacement (`parallel_edges`) or as a uniform subset of distinct
/// pairs, writing each into `g`.
fn fill_edges_from_pairs(
    rng: &mut dyn Rng,
    g: &mut Multigraph,
    pairs: &[(usize, usize)],
    e: u64,
    parallel_edges: bool,
) {
    if parallel_edges {
        for _ in 0..e {
            let idx = rng.uniform_usize(0, pairs.len());
            let (u, v) = pairs[idx];
            g.add_multiedge(u, v, 1);
        }
    } else {
        let idxs = sample_uniform_sequence_without_replacement(rng, pairs.len(), e as usize);
        for idx in idxs {
            let (u, v) = pairs[idx];
            g.add_multiedge(u, v, 1);
        }
    }
}

/// Samples an Erdős–Rényi graph with `n` vertices and `e` edges, uniform
/// over the eligible edge set selected by `self_loops`/`parallel_edges`.
/// The stub-labelled and multigraph variants named in §4.7 coincide with
/// this generator once edges are drawn with replacement; stub identity is
/// not separately represented since the likelihood only needs aggregate
/// multiplicities.
#[must_use]
pub fn sample_erdos_renyi(rng: &mut dyn Rng, n: usize, e: u64, self_loops: bool, parallel_edges: bool) -> Multigraph {
    let mut g = Multigraph::new(n);
    let pairs = all_vertex_pairs(n, self_loops);
    fill_edges_from_pairs(rng, &mut g, &pairs, e, parallel_edges);
    g
}

/// Samples a configuration-model graph realising exactly the degree
/// sequence `degrees` (whose sum must be even), via stub matching: build
/// the stub list, shuffle it, and pair consecutive stubs.
#[must_use]
pub fn sample_configuration_model(rng: &mut dyn Rng, degrees: &[u64]) -> Multigraph {
    let mut stubs = Vec::with_capacity(degrees.iter().sum::<u64>() as usize);
    for (v, &k) in degrees.iter().enumerate() {
        stubs.extend(std::iter::repeat(v).take(k as usize));
    }
    shuffle(rng, &mut stubs);
    let mut g = Multigraph::new(degrees.len());
    for pair in stubs.chunks(2) {
        if let [u, v] = *pair {
            g.add_multiedge(u, v, 1);
        }
    }
    g
}

/// Per-block vertex membership lists, in vertex order.
#[must_use]
pub fn block_members(labels: &[usize]) -> HashMap<usize, Vec<usize>> {
    let mut members: HashMap<usize, Vec<usize>> = HashMap::new();
    for (v, &b) in labels.iter().enumerate() {
        members.entry(b).or_default().push(v);
    }
    members
}

fn block_pair_candidates(
    members: &HashMap<usize, Vec<usize>>,
    r: usize,
    s: usize,
    self_loops: bool,
) -> Vec<(usize, usize)> {
    let empty = Vec::new();
    let rs = members.get(&r).unwrap_or(&empty);
    let ss = members.get(&s).unwrap_or(&empty);
    let mut candidates = Vec::new();
    if r == s {
        for (i, &u) in rs.iter().enumerate() {
            let start = if self_loops { i } else { i + 1 };
            for &v in &rs[start..] {
                candidates.push(crate::graph::canonical_edge(u, v));
            }
        }
    } else {
        for &u in rs {
            for &v in ss {
                candidates.push(crate::graph::canonical_edge(u, v));
            }
        }
    }
    candidates
}

/// Samples a stochastic-block-model graph whose realised block-to-block
/// edge counts match `label_graph_counts` exactly (keyed by canonical
/// block pair `(r, s)`, `r <= s`): within each block pair, edges are drawn
/// uniformly over that pair's eligible vertex pairs, exactly as
/// [`sample_erdos_renyi`] does for the whole graph.
#[must_use]
pub fn sample_sbm(
    rng: &mut dyn Rng,
    labels: &[usize],
    label_graph_counts: &HashMap<(usize, usize), u64>,
    self_loops: bool,
    parallel_edges: bool,
) -> Multigraph {
    let n = labels.len();
    let mut g = Multigraph::new(n);
    let members = block_members(labels);
    for (&(r, s), &count) in label_graph_counts {
        if count == 0 {
            continue;
        }
        let candidates = block_pair_candidates(&members, r, s, self_loops);
        fill_edges_from_pairs(rng, &mut g, &candidates, count, parallel_edges);
    }
    g
}

/// Samples a degree-corrected SBM graph: within each block pair `(r, s)`
/// carrying `e_rs` edges, repeatedly draws an endpoint from each side
/// weighted by its remaining stub allocation, matching the stub-labelled
/// numerator the likelihood scores against.
#[must_use]
pub fn sample_degree_corrected_sbm(
    rng: &mut dyn Rng,
    labels: &[usize],
    degrees: &[u64],
    label_graph_counts: &HashMap<(usize, usize), u64>,
    self_loops: bool,
) -> Multigraph {
    let n = labels.len();
    let mut g = Multigraph::new(n);
    let members = block_members(labels);
    let mut remaining: Vec<f64> = degrees.iter().map(|&k| k as f64).collect();

    for (&(r, s), &count) in label_graph_counts {
        let empty = Vec::new();
        let rs = members.get(&r).unwrap_or(&empty).clone();
        let ss = members.get(&s).unwrap_or(&empty).clone();
        for _ in 0..count {
            let u = weighted_pick(rng, &rs, &remaining);
            let v = if r == s {
                loop {
                    let candidate = weighted_pick(rng, &ss, &remaining);
                    if self_loops || candidate != u {
                        break candidate;
                    }
                    if rs.len() < 2 {
                        break candidate;
                    }
                }
            } else {
                weighted_pick(rng, &ss, &remaining)
            };
            let (a, b) = crate::graph::canonical_edge(u, v);
            g.add_multiedge(a, b, 1);
            remaining[u] = (remaining[u] - 1.0).max(0.0);
            remaining[v] = (remaining[v] - 1.0).max(0.0);
        }
    }
    g
}

fn weighted_pick(rng: &mut dyn Rng, candidates: &[usize], weights: &[f64]) -> usize {
    let local: Vec<f64> = candidates.iter().map(|&v| weights[v].max(1e-9)).collect();
    candidates[rng.discrete(&local)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::StdRngSource;

    #[test]
    fn weak_composition_sums_to_n() {
        let mut rng = StdRngSource::seeded(3);
        let parts = sample_random_weak_composition(&mut rng, 10, 4);
        assert_eq!(parts.len(), 4);
        assert_eq!(parts.iter().sum::<u64>(), 10);
    }

    #[test]
    fn strict_composition_has_no_zero_parts() {
        let mut rng = StdRngSource::seeded(4);
        let parts = sample_random_composition(&mut rng, 10, 4);
        assert_eq!(parts.iter().sum::<u64>(), 10);
        assert!(parts.iter().all(|&p| p >= 1));
    }

    #[test]
    fn permutation_matches_requested_counts() {
        let mut rng = StdRngSource::seeded(5);
        let labels = sample_random_permutation(&mut rng, &[2, 3, 1]);
        let mut counts = [0u64; 3];
        for &l in &labels {
            counts[l] += 1;
        }
        assert_eq!(counts, [2, 3, 1]);
    }

    #[test]
    fn configuration_model_realises_degree_sequence() {
        let mut rng = StdRngSource::seeded(6);
        let degrees = vec![2, 2, 2];
        let g = sample_configuration_model(&mut rng, &degrees);
        for (v, &k) in degrees.iter().enumerate() {
            assert_eq!(g.degree(v), k);
        }
    }

    #[test]
    fn sbm_realises_exact_label_graph() {
        let mut rng = StdRngSource::seeded(7);
        let labels = vec![0, 0, 1, 1];
        let mut counts = HashMap::new();
        counts.insert((0, 0), 1);
        counts.insert((0, 1), 2);
        counts.insert((1, 1), 1);
        let g = sample_sbm(&mut rng, &labels, &counts, true, true);
        let members = block_members(&labels);
        let mut realised: HashMap<(usize, usize), u64> = HashMap::new();
        for (u, v, m) in g.edges() {
            let r = labels[u];
            let s = labels[v];
            let key = if r <= s { (r, s) } else { (s, r) };
            *realised.entry(key).or_insert(0) += m;
        }
        assert_eq!(realised, counts);
        let _ = members;
    }

    #[test]
    fn restricted_partition_has_requested_length_and_sum() {
        let mut rng = StdRngSource::seeded(8);
        let parts = sample_random_restricted_partition(&mut rng, 12, 5, 50);
        assert_eq!(parts.len(), 5);
        assert_eq!(parts.iter().sum::<u64>(), 12);
    }
}
