//! Multigraph data structure consumed by priors, likelihoods, and proposers.
//!
//! The broader specification treats the multigraph as an external
//! collaborator; a self-contained crate still has to provide one. Storage
//! is an adjacency map per vertex, sufficient for the incremental
//! add/remove/neighbour operations the rest of the crate needs and cheap
//! to keep consistent under single-edge moves.

use std::collections::HashMap;

/// A multigraph over `0..n` vertices with non-negative integer edge
/// multiplicities. Self-loops and parallel edges are both representable;
/// whether a given model allows them is a property of that model, not of
/// this structure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Multigraph {
    adjacency: Vec<HashMap<usize, u64>>,
    total_edge_number: u64,
}

/// Canonicalises an edge endpoint pair so `u <= v`.
#[must_use]
pub fn canonical_edge(u: usize, v: usize) -> (usize, usize) {
    if u <= v { (u, v) } else { (v, u) }
}

impl Multigraph {
    /// Creates an empty multigraph over `n` vertices.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            adjacency: vec![HashMap::new(); n],
            total_edge_number: 0,
        }
    }

    /// Number of vertices.
    #[must_use]
    pub fn size(&self) -> usize {
        self.adjacency.len()
    }

    /// Resizes the vertex set. Shrinking drops edges touching removed
    /// vertices and adjusts `total_edge_number` accordingly.
    pub fn resize(&mut self, new_size: usize) {
        if new_size < self.adjacency.len() {
            for v in new_size..self.adjacency.len() {
                let neighbours: Vec<(usize, u64)> =
                    self.adjacency[v].iter().map(|(&w, &m)| (w, m)).collect();
                for (w, m) in neighbours {
                    if w >= new_size || w == v {
                        self.total_edge_number -= m;
                    }
                    if w < new_size && w != v {
                        self.adjacency[w].remove(&v);
                    }
                }
            }
        }
        self.adjacency.resize(new_size, HashMap::new());
    }

    /// Adds `multiplicity` parallel edges between `u` and `v` (a self-loop
    /// when `u == v`).
    pub fn add_multiedge(&mut self, u: usize, v: usize, multiplicity: u64) {
        if multiplicity == 0 {
            return;
        }
        *self.adjacency[u].entry(v).or_insert(0) += multiplicity;
        if u != v {
            *self.adjacency[v].entry(u).or_insert(0) += multiplicity;
        }
        self.total_edge_number += multiplicity;
    }

    /// Removes up to `multiplicity` parallel edges between `u` and `v`.
    /// Saturates at zero rather than panicking; callers that need strict
    /// accounting should check [`Self::edge_multiplicity`] first.
    pub fn remove_multiedge(&mut self, u: usize, v: usize, multiplicity: u64) {
        if multiplicity == 0 {
            return;
        }
        let removed = {
            let entry = self.adjacency[u].get_mut(&v);
            match entry {
                None => 0,
                Some(m) => {
                    let r = multiplicity.min(*m);
                    *m -= r;
                    if *m == 0 {
                        self.adjacency[u].remove(&v);
                    }
                    r
                }
            }
        };
        if u != v && removed > 0 {
            if let Some(m) = self.adjacency[v].get_mut(&u) {
                *m -= removed;
                if *m == 0 {
                    self.adjacency[v].remove(&u);
                }
            }
        }
        self.total_edge_number -= removed;
    }

    /// Current multiplicity of the edge `(u, v)`.
    #[must_use]
    pub fn edge_multiplicity(&self, u: usize, v: usize) -> u64 {
        self.adjacency[u].get(&v).copied().unwrap_or(0)
    }

    /// Degree of `v`: sum of incident edge multiplicities, with self-loops
    /// counted twice (standard multigraph convention).
    #[must_use]
    pub fn degree(&self, v: usize) -> u64 {
        self.adjacency[v]
            .iter()
            .map(|(&w, &m)| if w == v { 2 * m } else { m })
            .sum()
    }

    /// Iterator over `(neighbour, multiplicity)` pairs incident to `v`.
    pub fn neighbours(&self, v: usize) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.adjacency[v].iter().map(|(&w, &m)| (w, m))
    }

    /// Total number of edges (sum of multiplicities over canonical pairs).
    #[must_use]
    pub fn total_edge_number(&self) -> u64 {
        self.total_edge_number
    }

    /// Iterator over canonical `(u, v, multiplicity)` triples with `u <= v`,
    /// each distinct pair emitted once.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, u64)> + '_ {
        self.adjacency.iter().enumerate().flat_map(|(u, nbrs)| {
            nbrs.iter()
                .filter(move |&(&v, _)| v >= u)
                .map(move |(&v, &m)| (u, v, m))
        })
    }

    /// Whether any edge with nonzero multiplicity exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_edge_number == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_remove_round_trip() {
        let mut g = Multigraph::new(4);
        g.add_multiedge(0, 1, 3);
        assert_eq!(g.edge_multiplicity(0, 1), 3);
        assert_eq!(g.edge_multiplicity(1, 0), 3);
        assert_eq!(g.degree(0), 3);
        assert_eq!(g.total_edge_number(), 3);
        g.remove_multiedge(0, 1, 2);
        assert_eq!(g.edge_multiplicity(0, 1), 1);
        assert_eq!(g.total_edge_number(), 1);
    }

    #[test]
    fn self_loop_counts_twice_in_degree() {
        let mut g = Multigraph::new(2);
        g.add_multiedge(0, 0, 1);
        assert_eq!(g.degree(0), 2);
        assert_eq!(g.total_edge_number(), 1);
    }

    #[test]
    fn edges_iterator_emits_each_pair_once() {
        let mut g = Multigraph::new(3);
        g.add_multiedge(0, 1, 2);
        g.add_multiedge(1, 2, 1);
        let mut edges: Vec<_> = g.edges().collect();
        edges.sort();
        assert_eq!(edges, vec![(0, 1, 2), (1, 2, 1)]);
    }

    #[test]
    fn canonical_edge_orders_endpoints() {
        assert_eq!(canonical_edge(3, 1), (1, 3));
        assert_eq!(canonical_edge(1, 3), (1, 3));
    }
}

