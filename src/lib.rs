//! Bayesian inference engine over random-graph models: generative
//! prior/likelihood trees for Erdős-Rényi, configuration-model, (nested,
//! degree-corrected) stochastic block models and planted partitions, plus
//! the move proposers an external MCMC driver combines with them.

mod error;
mod generators;
mod graph;
mod likelihood;
mod model;
mod moves;
mod numeric;
mod prior;
mod proposer;
mod rng;

pub use crate::error::{ConsistencyError, DepletedMethodError, InvalidMoveError, InvalidMoveErrorCode, SafetyError};
pub use crate::generators::{
    block_members, sample_configuration_model, sample_degree_corrected_sbm, sample_erdos_renyi,
    sample_random_composition, sample_random_permutation, sample_random_restricted_partition,
    sample_random_weak_composition, sample_sbm, sample_uniform_sequence_without_replacement, shuffle,
};
pub use crate::graph::{canonical_edge, Multigraph};
pub use crate::likelihood::{GraphLikelihood, GraphType, LikelihoodContext};
pub use crate::model::configuration::ConfigurationModel;
pub use crate::model::dcsbm::DegreeCorrectedStochasticBlockModelFamily;
pub use crate::model::erdos_renyi::ErdosRenyiModel;
pub use crate::model::nested_sbm::NestedStochasticBlockModelFamily;
pub use crate::model::planted_partition;
pub use crate::model::sbm::{StochasticBlockModel, StochasticBlockModelFamily};
pub use crate::moves::{Edge, GraphMove, LabelDelta, LabelMove};
pub use crate::numeric::{
    log_binomial_coefficient, log_factorial, log_multinomial_coefficient, log_multiset_coefficient, log_poisson_pmf,
    log_q, log_zero_truncated_poisson_pmf,
};
pub use crate::prior::block::{BlockDeltaPrior, BlockPrior, BlockUniformHyperPrior, BlockUniformPrior};
pub use crate::prior::block_count::{BlockCountDeltaPrior, BlockCountPoissonPrior, BlockCountPrior, BlockCountUniformPrior};
pub use crate::prior::degree::{
    DegreeDeltaPrior, DegreePrior, DegreeUniformHyperPrior, DegreeUniformPrior, VertexLabeledDegreePrior,
};
pub use crate::prior::edge_count::{EdgeCountDeltaPrior, EdgeCountExponentialPrior, EdgeCountPoissonPrior, EdgeCountPrior};
pub use crate::prior::label_graph::{
    LabelGraph, LabelGraphDeltaPrior, LabelGraphErdosRenyiPrior, LabelGraphPlantedPartitionPrior, LabelGraphPrior,
};
pub use crate::prior::nested_block::{NestedBlockPrior, NestedBlockVariant};
pub use crate::prior::nested_label_graph::NestedLabelGraphPrior;
pub use crate::proposer::edge::{
    DoubleEdgeSwapProposer, EdgeProposer, HingeFlipDegreeProposer, HingeFlipUniformProposer,
    SingleEdgeUniformProposer,
};
pub use crate::proposer::label::{
    LabelProposer, MixedLabelProposer, RestrictedMixedLabelProposer, RestrictedUniformLabelProposer,
    UniformLabelProposer,
};
pub use crate::proposer::nested_label::{NestedMixedLabelProposer, NestedUniformLabelProposer};
pub use crate::rng::{Rng, StdRngSource};
