//! Graph likelihoods (C6).
//!
//! A likelihood is a pure function from parent-state references to a
//! log-probability; per the "shared-state-pointer redesign" it owns none
//! of that state itself. [`LikelihoodContext`] bundles the references a
//! given variant needs and is built by the caller (the random-graph model)
//! at scoring time rather than being held across calls.

pub mod configuration;
pub mod dcsbm;
pub mod erdos_renyi;
pub mod sbm;

use crate::graph::Multigraph;
use crate::prior::label_graph::LabelGraph;

/// SBM edge-generation convention: whether edges are realised through
/// labelled stub matching or as a uniform draw over block-pair slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphType {
    StubLabeled,
    UniformMultigraph,
}

/// Tagged union of graph-likelihood kinds (C6), collapsing the source's
/// likelihood-class hierarchy per the design notes.
#[derive(Debug, Clone, Copy)]
pub enum GraphLikelihood {
    ErdosRenyi { self_loops: bool, parallel_edges: bool },
    Configuration,
    StochasticBlockModel { graph_type: GraphType, self_loops: bool, parallel_edges: bool },
    DegreeCorrectedStochasticBlockModel,
}

/// The parent-state references a likelihood variant may need, assembled by
/// the model at call time.
pub struct LikelihoodContext<'a> {
    pub graph: &'a Multigraph,
    pub degrees: Option<&'a [u64]>,
    pub label_graph: Option<&'a LabelGraph>,
    pub vertex_counts: Option<&'a [u64]>,
}

impl GraphLikelihood {
    #[must_use]
    pub fn log_likelihood(&self, ctx: &LikelihoodContext) -> f64 {
        match self {
            Self::ErdosRenyi { self_loops, parallel_edges } => erdos_renyi::log_likelihood(
                ctx.graph.size() as u64,
                ctx.graph.total_edge_number(),
                *self_loops,
                *parallel_edges,
            ),
            Self::Configuration => {
                configuration::log_likelihood(ctx.graph, ctx.degrees.expect("configuration likelihood requires degrees"))
            }
            Self::StochasticBlockModel { graph_type, self_loops, parallel_edges } => match graph_type {
                GraphType::StubLabeled => {
                    sbm::stub_labeled_log_likelihood(ctx.graph, ctx.degrees.expect("stub-labelled SBM requires degrees"))
                }
                GraphType::UniformMultigraph => sbm::uniform_multigraph_log_likelihood(
                    ctx.label_graph.expect("uniform-multigraph SBM requires a label graph"),
                    ctx.vertex_counts.expect("uniform-multigraph SBM requires vertex counts"),
                    *self_loops,
                    *parallel_edges,
                ),
            },
            Self::DegreeCorrectedStochasticBlockModel => {
                dcsbm::log_likelihood(ctx.graph, ctx.degrees.expect("DC-SBM requires degrees"))
            }
        }
    }

    /// Ratio by direct recomputation against a caller-built post-move
    /// context; matches the label-graph prior's ratio-by-recomputation
    /// policy rather than an incremental shortcut.
    #[must_use]
    pub fn log_likelihood_ratio(&self, before: &LikelihoodContext, after: &LikelihoodContext) -> f64 {
        self.log_likelihood(after) - self.log_likelihood(before)
    }
}
