//! Nested label-move proposers (C10).
//!
//! A nested level's "local graph" is the real graph at level 0 and the
//! label graph one level below for `level > 0`, the same convention
//! [`crate::prior::nested_label_graph::NestedLabelGraphPrior`] uses to
//! aggregate upward. Both proposers here are thin per-level wrappers around
//! the flat proposers in [`crate::proposer::label`], delegating to them
//! against whichever graph the caller supplies and stamping the resulting
//! move with `level`.

use crate::graph::Multigraph;
use crate::moves::LabelMove;
use crate::prior::nested_block::NestedBlockPrior;
use crate::proposer::label::{MixedLabelProposer, UniformLabelProposer};
use crate::rng::Rng;

#[derive(Debug, Clone, Copy)]
pub struct NestedUniformLabelProposer {
    pub inner: UniformLabelProposer,
    pub level: usize,
}

impl NestedUniformLabelProposer {
    #[must_use]
    pub fn propose(&self, rng: &mut dyn Rng, nested: &NestedBlockPrior) -> LabelMove {
        let labels = &nested.levels()[self.level];
        let mut mv = self.inner.propose(rng, labels);
        mv.level = self.level;
        mv
    }

    #[must_use]
    pub fn log_proposal_ratio(&self, nested: &NestedBlockPrior, mv: &LabelMove) -> f64 {
        let labels = &nested.levels()[self.level];
        self.inner.log_proposal_ratio(labels, mv)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NestedMixedLabelProposer {
    pub inner: MixedLabelProposer,
    pub level: usize,
}

impl NestedMixedLabelProposer {
    #[must_use]
    pub fn propose(
        &self,
        rng: &mut dyn Rng,
        local_graph: &Multigraph,
        label_graph: &Multigraph,
        nested: &NestedBlockPrior,
    ) -> LabelMove {
        let labels = &nested.levels()[self.level];
        let mut mv = self.inner.propose(rng, local_graph, label_graph, labels);
        mv.level = self.level;
        mv
    }

    #[must_use]
    pub fn log_proposal_ratio(
        &self,
        local_graph: &Multigraph,
        label_graph: &Multigraph,
        nested: &NestedBlockPrior,
        mv: &LabelMove,
    ) -> f64 {
        let labels = &nested.levels()[self.level];
        self.inner.log_proposal_ratio(local_graph, label_graph, labels, mv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prior::nested_block::NestedBlockVariant;
    use crate::rng::StdRngSource;

    #[test]
    fn nested_uniform_proposer_stamps_its_level() {
        let mut rng = StdRngSource::seeded(71);
        let nested = NestedBlockPrior::new(NestedBlockVariant::Uniform, vec![vec![0, 1, 2, 0], vec![0, 1]]);
        let proposer = NestedUniformLabelProposer { inner: UniformLabelProposer { block_count: 3 }, level: 0 };
        let mv = proposer.propose(&mut rng, &nested);
        assert_eq!(mv.level, 0);
    }

    #[test]
    fn nested_mixed_proposer_falls_back_to_uniform_when_isolated() {
        let mut rng = StdRngSource::seeded(72);
        let nested = NestedBlockPrior::new(NestedBlockVariant::Uniform, vec![vec![0, 1]]);
        let local_graph = Multigraph::new(2);
        let label_graph = Multigraph::new(2);
        let proposer = NestedMixedLabelProposer {
            inner: MixedLabelProposer { block_count: 2, uniform_weight: 0.0, shift: 1.0 },
            level: 0,
        };
        let mv = proposer.propose(&mut rng, &local_graph, &label_graph, &nested);
        assert_eq!(mv.level, 0);
        assert!(mv.next_label <= 2);
    }
}
