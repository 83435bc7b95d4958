use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use npcoarse_coarsen::Coarsener;
use npcoarse_core::config::CoarseningOptions;
use npcoarse_core::graph::LayeredGraph;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// `(layer_0, layer_1, edges)` per tier.
const TIERS: &[(&str, usize, usize, usize)] = &[
    ("small", 200, 100, 1_000),
    ("medium", 1_000, 500, 6_000),
];

fn random_bipartite(a: usize, b: usize, edges: usize, seed: u64) -> LayeredGraph {
    let mut rng = StdRng::seed_from_u64(seed);
    let list: Vec<_> = (0..edges)
        .map(|_| (rng.gen_range(0..a), rng.gen_range(a..a + b), 1.0))
        .collect();
    LayeredGraph::from_edges(&[a, b], &list).expect("generated graph is valid")
}

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("coarsen.strategies");
    group.sample_size(10);

    for &(tier, a, b, edges) in TIERS {
        let graph = random_bipartite(a, b, edges, 0xC0A2_u64 + a as u64);
        group.throughput(Throughput::Elements(graph.vertex_count() as u64));

        for strategy in ["rgmb", "gmb", "hem", "mlpb"] {
            let options = CoarseningOptions {
                matching: vec![strategy.to_string()],
                ..CoarseningOptions::default()
            };
            let coarsener =
                Coarsener::new(options.validate(2).expect("valid options")).expect("pool");
            group.bench_with_input(BenchmarkId::new(strategy, tier), &graph, |bencher, g| {
                bencher.iter(|| black_box(coarsener.run(g.clone()).expect("run").hierarchy.len()));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_strategies);
criterion_main!(benches);
