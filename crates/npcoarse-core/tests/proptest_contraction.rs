//! Property tests for contraction and the hierarchy.
//!
//! Random layered graphs are contracted by random same-layer matchings
//! (chained targets included) and checked for conservation of weight,
//! provenance and layer purity.

use proptest::prelude::*;

use npcoarse_core::graph::{LayeredGraph, contract};
use npcoarse_core::hierarchy::Hierarchy;
use npcoarse_core::matching::Matching;

type Case = (Vec<usize>, Vec<(usize, usize, f64)>, Vec<Option<usize>>);

/// Vertex counts per layer, an edge list, and a same-layer target (or none)
/// per vertex.
fn arb_case() -> impl Strategy<Value = Case> {
    prop::collection::vec(1_usize..6, 1..4)
        .prop_flat_map(|counts| {
            let n: usize = counts.iter().sum();
            let edges = prop::collection::vec((0..n, 0..n, 1_u8..5), 0..n * 2);
            let picks = prop::collection::vec(prop::option::of(any::<prop::sample::Index>()), n);
            (Just(counts), edges, picks)
        })
        .prop_map(|(counts, edges, picks)| {
            let mut targets = Vec::with_capacity(picks.len());
            let mut start = 0;
            for &count in &counts {
                for pick in &picks[start..start + count] {
                    targets.push(pick.as_ref().map(|idx| start + idx.index(count)));
                }
                start += count;
            }
            let edges = edges
                .into_iter()
                .map(|(u, v, w)| (u, v, f64::from(w)))
                .collect();
            (counts, edges, targets)
        })
}

fn build(case: &Case) -> (LayeredGraph, Matching) {
    let (counts, edges, targets) = case;
    let graph = LayeredGraph::from_edges(counts, edges).expect("generated graph is valid");
    let mut matching = Matching::unset(targets.len());
    for (v, target) in targets.iter().enumerate() {
        if let Some(t) = target {
            matching.assign(v, *t);
        }
    }
    (graph, matching)
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(512))]

    #[test]
    fn weight_is_conserved(case in arb_case()) {
        let (graph, matching) = build(&case);
        let c = contract(&graph, &matching);
        prop_assert_eq!(c.coarse.total_weight(), graph.vertex_count() as u64);
    }

    #[test]
    fn sources_partition_the_original_vertices(case in arb_case()) {
        let (graph, matching) = build(&case);
        let c = contract(&graph, &matching);
        let mut all: Vec<usize> = c.coarse.vertices().flat_map(|v| v.source().to_vec()).collect();
        all.sort_unstable();
        prop_assert_eq!(all, (0..graph.vertex_count()).collect::<Vec<_>>());
    }

    #[test]
    fn supervertices_never_span_layers(case in arb_case()) {
        let (graph, matching) = build(&case);
        let c = contract(&graph, &matching);
        for vertex in c.coarse.vertices() {
            for &s in vertex.source() {
                prop_assert_eq!(graph.layer_of(s), vertex.type_id());
            }
            for &p in vertex.predecessor() {
                prop_assert_eq!(graph.layer_of(p), vertex.type_id());
            }
        }
        prop_assert_eq!(c.coarse.layers(), graph.layers());
    }

    #[test]
    fn layer_sizes_count_distinct_targets(case in arb_case()) {
        let (graph, matching) = build(&case);
        let c = contract(&graph, &matching);
        for layer in 0..graph.layers() {
            let mut targets: Vec<usize> =
                graph.layer_range(layer).map(|v| matching.resolve(v)).collect();
            targets.sort_unstable();
            targets.dedup();
            prop_assert_eq!(c.coarse.layer_size(layer), targets.len());
        }
    }

    #[test]
    fn cut_edge_weight_is_conserved(case in arb_case()) {
        let (graph, matching) = build(&case);
        let c = contract(&graph, &matching);
        let cut: f64 = graph
            .edges()
            .filter(|&(u, v, _)| c.successors[u] != c.successors[v])
            .map(|(_, _, w)| w)
            .sum();
        let coarse: f64 = c.coarse.edges().map(|(_, _, w)| w).sum();
        prop_assert!((cut - coarse).abs() < 1e-9);
    }

    #[test]
    fn identity_contraction_preserves_the_graph(case in arb_case()) {
        let (graph, _) = build(&case);
        let c = contract(&graph, &Matching::identity(graph.vertex_count()));
        prop_assert_eq!(c.coarse.vertex_count(), graph.vertex_count());
        prop_assert_eq!(c.coarse.edge_count(), graph.edge_count());
        prop_assert_eq!(c.coarse.vertex_count_by_type(), graph.vertex_count_by_type());
        prop_assert_eq!(c.coarse.edges().collect::<Vec<_>>(), graph.edges().collect::<Vec<_>>());
        prop_assert_eq!(c.successors, (0..graph.vertex_count()).collect::<Vec<_>>());
    }

    #[test]
    fn hierarchy_traces_reach_the_membership(case in arb_case()) {
        let (graph, matching) = build(&case);
        let c = contract(&graph, &matching);
        let mut hierarchy = Hierarchy::new(graph);
        hierarchy.push(&c.successors, c.coarse);
        let membership = hierarchy.membership(1).expect("level 1 exists");
        for (v, &cluster) in membership.iter().enumerate() {
            prop_assert_eq!(hierarchy.trace(v), vec![v, cluster]);
        }
    }
}
