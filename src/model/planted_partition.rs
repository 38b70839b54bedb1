//! Planted-partition model (C7): equal-sized blocks with a label graph
//! driven by a single assortativity parameter, built from the general SBM
//! family.

use crate::likelihood::GraphType;
use crate::prior::block::{BlockPrior, BlockUniformHyperPrior};
use crate::prior::block_count::{BlockCountDeltaPrior, BlockCountPrior};
use crate::prior::edge_count::EdgeCountPrior;
use crate::prior::label_graph::{LabelGraph, LabelGraphPlantedPartitionPrior, LabelGraphPrior};
use crate::rng::Rng;

use super::sbm::StochasticBlockModelFamily;

/// Builds a [`StochasticBlockModelFamily`] pinned to `block_count` equal
/// blocks (via [`BlockUniformHyperPrior`]) and a planted-partition label
/// graph with the given `assortativity`.
#[must_use]
pub fn build(
    n: usize,
    block_count: u64,
    assortativity: f64,
    self_loops: bool,
    parallel_edges: bool,
    edge_count_prior: EdgeCountPrior,
) -> StochasticBlockModelFamily {
    StochasticBlockModelFamily::new(
        n,
        GraphType::StubLabeled,
        self_loops,
        parallel_edges,
        BlockCountPrior::Delta(BlockCountDeltaPrior::new(block_count)),
        BlockPrior::UniformHyper(BlockUniformHyperPrior::new(vec![0; n])),
        edge_count_prior,
        LabelGraphPrior::PlantedPartition(LabelGraphPlantedPartitionPrior::new(
            assortativity,
            LabelGraph::new(block_count as usize),
        )),
    )
}

/// Samples a fresh planted-partition graph with `block_count` equal-sized
/// blocks, `edge_count` edges total, and the given `assortativity`.
pub fn sample(
    rng: &mut dyn Rng,
    n: usize,
    block_count: u64,
    edge_count: u64,
    assortativity: f64,
) -> StochasticBlockModelFamily {
    let mut model = build(
        n,
        block_count,
        assortativity,
        false,
        true,
        EdgeCountPrior::Delta(crate::prior::edge_count::EdgeCountDeltaPrior::new(edge_count)),
    );
    model.sample(rng);
    model
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::StdRngSource;

    #[test]
    fn high_assortativity_concentrates_edges_within_blocks() {
        let mut rng = StdRngSource::seeded(31);
        let model = sample(&mut rng, 20, 2, 40, 0.95);
        model.check_consistency().expect("sampled state is consistent");

        let labels = model.labels();
        let within: u64 = model
            .graph()
            .edges()
            .filter(|&(u, v, _)| labels[u] == labels[v])
            .map(|(_, _, m)| m)
            .sum();
        assert!(within > model.graph().total_edge_number() / 2);
    }
}
