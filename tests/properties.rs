//! Cross-module properties: enumeration normalisation, exact degree/label-graph
//! realisation, a mixed MCMC sweep, a nested label move that changes depth, and
//! planted-partition edge concentration with unequal block sizes.

use std::collections::HashMap;

use graphinf::{
    BlockCountDeltaPrior, BlockCountPrior, BlockDeltaPrior, BlockPrior, ConfigurationModel,
    DegreeCorrectedStochasticBlockModelFamily, DegreeDeltaPrior, DegreePrior, DegreeUniformPrior, EdgeCountDeltaPrior,
    EdgeCountPrior, EdgeProposer, GraphLikelihood, GraphType, HingeFlipUniformProposer, LabelGraph,
    LabelGraphDeltaPrior, LabelGraphErdosRenyiPrior, LabelGraphPlantedPartitionPrior, LabelGraphPrior, LabelMove,
    LabelProposer, Multigraph, NestedBlockPrior, NestedBlockVariant, NestedStochasticBlockModelFamily,
    RestrictedMixedLabelProposer, StdRngSource, StochasticBlockModel, StochasticBlockModelFamily,
    VertexLabeledDegreePrior,
};

/// Rebuilds a label graph from a realised graph and partition, using only
/// the public `Multigraph` API; mirrors how each model derives its own
/// label graph from its generator's output.
fn label_graph_from(graph: &Multigraph, labels: &[usize], block_count: usize) -> LabelGraph {
    let mut lg = LabelGraph::new(block_count);
    for (u, v, m) in graph.edges() {
        lg.add_multiedge(labels[u], labels[v], m);
    }
    lg
}

#[test]
fn enumeration_normalisation_sums_to_one_for_small_er() {
    let pairs = [(0usize, 1usize), (0, 2), (1, 2)];
    let target_edges = 3u64;
    let likelihood = GraphLikelihood::ErdosRenyi { self_loops: false, parallel_edges: true };
    let mut total = 0.0;
    for m01 in 0..=target_edges {
        for m02 in 0..=(target_edges - m01) {
            let m12 = target_edges - m01 - m02;
            let mut g = Multigraph::new(3);
            g.add_multiedge(pairs[0].0, pairs[0].1, m01);
            g.add_multiedge(pairs[1].0, pairs[1].1, m02);
            g.add_multiedge(pairs[2].0, pairs[2].1, m12);
            let ctx = graphinf::LikelihoodContext { graph: &g, degrees: None, label_graph: None, vertex_counts: None };
            total += likelihood.log_likelihood(&ctx).exp();
        }
    }
    assert!((total - 1.0).abs() < 1e-6, "expected probabilities to sum to 1, got {total}");
}

#[test]
fn configuration_model_realises_exact_degree_sequence() {
    let degrees = vec![4u64, 2, 2, 0, 2, 0, 2];
    let mut rng = StdRngSource::seeded(101);
    let mut model =
        ConfigurationModel::new(degrees.len(), DegreePrior::Delta(DegreeDeltaPrior::new(degrees.clone())));
    model.sample(&mut rng, degrees.iter().sum::<u64>() / 2);

    assert_eq!(model.degrees(), degrees.as_slice());
    let total_degree: u64 = (0..degrees.len()).map(|v| model.graph().degree(v)).sum();
    assert_eq!(total_degree, degrees.iter().sum::<u64>());
    assert_eq!(total_degree, 2 * model.graph().total_edge_number());
    model.check_consistency().expect("realised graph matches the fixed degree sequence");
}

#[test]
fn sbm_sampling_realises_the_given_label_graph_exactly() {
    let labels = vec![0, 0, 0, 0, 1, 1, 1, 2, 2, 2, 2, 2];
    let mut given = LabelGraph::new(3);
    given.add_multiedge(0, 0, 3);
    given.add_multiedge(0, 1, 2);
    given.add_multiedge(1, 1, 1);
    given.add_multiedge(1, 2, 4);
    given.add_multiedge(2, 2, 2);
    let edge_count = given.total_edge_number();

    let mut rng = StdRngSource::seeded(102);
    let mut model = StochasticBlockModel::new(
        labels.len(),
        labels.clone(),
        GraphType::StubLabeled,
        true,
        true,
        EdgeCountPrior::Delta(EdgeCountDeltaPrior::new(edge_count)),
        LabelGraphPrior::Delta(LabelGraphDeltaPrior::new(given.clone())),
    );
    model.sample(&mut rng);

    let realised = label_graph_from(model.graph(), &labels, 3);
    for (r, s, m) in given.edges() {
        assert_eq!(realised.edge_multiplicity(r, s), m, "block pair ({r}, {s}) mismatched");
    }
    model.check_consistency().expect("sampled state is consistent");
}

fn fresh_dcsbm(n: usize, b: u64, e: u64) -> DegreeCorrectedStochasticBlockModelFamily {
    DegreeCorrectedStochasticBlockModelFamily::new(
        n,
        false,
        BlockCountPrior::Delta(BlockCountDeltaPrior::new(b)),
        BlockPrior::Uniform(graphinf::BlockUniformPrior::new(vec![0; n])),
        EdgeCountPrior::Delta(EdgeCountDeltaPrior::new(e)),
        LabelGraphPrior::ErdosRenyi(LabelGraphErdosRenyiPrior::new(LabelGraph::new(b as usize))),
        VertexLabeledDegreePrior::Uniform(DegreeUniformPrior::new(vec![0; n])),
    )
}

#[test]
fn dcsbm_sweep_of_mixed_moves_stays_consistent() {
    let mut rng = StdRngSource::seeded(103);
    let mut model = fresh_dcsbm(12, 3, 10);
    model.sample(&mut rng);
    model.check_consistency().expect("initial sample is consistent");

    let edge_proposer = EdgeProposer::HingeFlipUniform(HingeFlipUniformProposer { n: 12 });
    let label_proposer = LabelProposer::RestrictedMixed(RestrictedMixedLabelProposer {
        block_count: 3,
        uniform_weight: 0.3,
        shift: 1.0,
    });

    for step in 0..200 {
        if model.graph().is_empty() {
            break;
        }
        if step % 2 == 0 {
            let mv = edge_proposer.propose(&mut rng, model.graph());
            if model.apply_graph_move(&mv).is_ok() {
                model.check_consistency().expect("graph move kept the model consistent");
            }
        } else {
            let block_count = 3;
            let label_graph = label_graph_from(model.graph(), model.labels(), block_count);
            let mv: LabelMove = label_proposer.propose(&mut rng, model.graph(), &label_graph, model.labels());
            if model.apply_label_move(&mv).is_ok() {
                model.check_consistency().expect("label move kept the model consistent");
            }
        }
    }
}

#[test]
fn nested_label_move_destroying_a_block_updates_depth_and_stays_consistent() {
    let n = 8;
    let block_counts = vec![4u64, 2, 1];
    let mut chosen = None;
    for seed in 1..200u64 {
        let mut rng = StdRngSource::seeded(seed);
        let mut model = NestedStochasticBlockModelFamily::new(
            n,
            GraphType::StubLabeled,
            false,
            true,
            block_counts.clone(),
            NestedBlockPrior::new(NestedBlockVariant::Uniform, Vec::new()),
            EdgeCountPrior::Delta(EdgeCountDeltaPrior::new(6)),
        );
        model.sample(&mut rng);
        let (level1, _) = model.nested_state(1);
        let level1 = level1.to_vec();
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for &label in &level1 {
            *counts.entry(label).or_insert(0) += 1;
        }
        let Some((&singleton, _)) = counts.iter().find(|&(_, &c)| c == 1) else { continue };
        let Some(block) = level1.iter().position(|&label| label == singleton) else { continue };
        let Some(&survivor) = level1.iter().find(|&&label| label != singleton) else { continue };
        chosen = Some((model, block, singleton, survivor));
        break;
    }

    let (mut model, block, singleton, survivor) =
        chosen.expect("some seed in range yields a level-1 singleton label");

    let depth_before = model.depth();
    let mv = LabelMove::new(block, singleton, survivor, graphinf::LabelDelta::Destroyed, 1);
    model.apply_label_move(&mv).expect("destroying a non-orphaning label is valid");

    assert_eq!(model.depth(), depth_before - 1);
    model.check_consistency().expect("nested state stays consistent after the move");
}

#[test]
fn planted_partition_with_unequal_block_sizes_concentrates_edges_within_blocks() {
    let sizes = [10usize, 20, 30];
    let mut labels = Vec::new();
    for (block, &size) in sizes.iter().enumerate() {
        labels.extend(std::iter::repeat(block).take(size));
    }
    let n = labels.len();
    let edge_count = 100u64;
    let assortativity = 0.8;

    let mut rng = StdRngSource::seeded(104);
    let mut model = StochasticBlockModelFamily::new(
        n,
        GraphType::StubLabeled,
        false,
        true,
        BlockCountPrior::Delta(BlockCountDeltaPrior::new(sizes.len() as u64)),
        BlockPrior::Delta(BlockDeltaPrior::new(labels.clone())),
        EdgeCountPrior::Delta(EdgeCountDeltaPrior::new(edge_count)),
        LabelGraphPrior::PlantedPartition(LabelGraphPlantedPartitionPrior::new(
            assortativity,
            LabelGraph::new(sizes.len()),
        )),
    );
    model.sample(&mut rng);

    let within: u64 =
        model.graph().edges().filter(|&(u, v, _)| labels[u] == labels[v]).map(|(_, _, m)| m).sum();
    let total = model.graph().total_edge_number();
    assert!(total > 0);
    assert!(
        within as f64 / total as f64 >= 0.7,
        "expected at least 70% of edges within blocks, got {within}/{total}"
    );
}
