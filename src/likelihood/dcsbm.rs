//! Degree-corrected SBM graph likelihood (C6).
//!
//! Reuses the stub-labelled SBM numerator: conditioned on the degree
//! sequence, the block structure (already fixed by the label-graph prior's
//! edge-count totals) adds no further combinatorial information, so the
//! likelihood is the same configuration-model expression the stub-labelled
//! variant uses.

use crate::graph::Multigraph;

#[must_use]
pub fn log_likelihood(graph: &Multigraph, degrees: &[u64]) -> f64 {
    crate::likelihood::sbm::stub_labeled_log_likelihood(graph, degrees)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_stub_labeled_value() {
        let mut g = Multigraph::new(3);
        g.add_multiedge(0, 1, 2);
        let degrees = vec![2, 2, 0];
        assert_eq!(
            log_likelihood(&g, &degrees),
            crate::likelihood::sbm::stub_labeled_log_likelihood(&g, &degrees)
        );
    }
}
