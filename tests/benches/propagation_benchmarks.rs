//! # CBAM Propagation Benchmarks
//!
//! | Area | Operation | Expectation |
//! |------|-----------|-------------|
//! | Traversal | Kahn ordering of a layered DAG | linear in nodes + edges |
//! | Propagation | Graph mode over the in-memory store | one step per process |
//! | Detection | Linear chain detection | linear in path length |

use cbam_propagation::algorithms::{build_edge_graph, detect_linear_chains, kahns_topological_order};
use cbam_propagation::{EdgeGraph, EdgeKind, EmissionAccountingApi, GraphScope};
use cbam_tests::fixtures::{layered_dag_store, linear_store, make_service};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

const MAX_NODES: usize = 100_000;
const MAX_EDGES: usize = 500_000;

fn bench_kahns_ordering(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("kahns-ordering");

    for width in [10, 50, 100] {
        let store = layered_dag_store(20, width, &mut StdRng::seed_from_u64(7));
        let edges = runtime
            .block_on(store.query_edges_by_kind(EdgeKind::Continue))
            .unwrap();
        let graph = build_edge_graph(&edges, MAX_NODES, MAX_EDGES).unwrap();

        group.throughput(Throughput::Elements(graph.node_count() as u64));
        group.bench_with_input(BenchmarkId::new("layered_dag", width), &graph, |b, graph| {
            b.iter(|| black_box(kahns_topological_order(graph).unwrap()))
        });
    }

    group.finish();
}

fn bench_graph_propagation(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("graph-propagation");
    group.measurement_time(Duration::from_secs(10));

    for width in [10, 50] {
        let store = layered_dag_store(10, width, &mut StdRng::seed_from_u64(11));
        let service = make_service(&store);

        group.throughput(Throughput::Elements((10 * width) as u64));
        group.bench_function(BenchmarkId::new("layered_dag", width), |b| {
            b.iter(|| {
                runtime
                    .block_on(service.propagate_graph(GraphScope::All))
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_chain_detection(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("chain-detection");

    for length in [100, 1_000] {
        let store = linear_store(length);
        let edges = runtime
            .block_on(store.query_edges_by_kind(EdgeKind::Continue))
            .unwrap();
        let graph = build_edge_graph(&edges, MAX_NODES, MAX_EDGES).unwrap();

        group.bench_with_input(BenchmarkId::new("linear", length), &graph, |b, graph| {
            b.iter(|| black_box(detect_linear_chains(graph, 10).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_kahns_ordering,
    bench_graph_propagation,
    bench_chain_detection
);
criterion_main!(benches);
