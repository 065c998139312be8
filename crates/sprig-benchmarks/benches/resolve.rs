//! Graph loading and ordering benchmarks
//!
//! Loads layered DAGs of increasing size from an in-memory host, orders
//! them for building, and checks a candidate package for conflicts.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use sprig_benchmarks::{criterion_config, dag_host, project, runtime};
use sprig_core::types::PackageConfig;
use sprig_resolver::Candidate;

const SIZES: [usize; 3] = [10, 100, 500];

fn bench_graph_loading(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_loading");
    let rt = runtime();

    for size in SIZES {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("packages", size), &size, |b, &size| {
            b.iter(|| {
                let mut project = project(dag_host(size, 3));
                rt.block_on(project.load()).unwrap();
                black_box(project.graph().len())
            });
        });
    }

    group.finish();
}

fn bench_build_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_order");
    let rt = runtime();

    for size in SIZES {
        let mut project = project(dag_host(size, 3));
        rt.block_on(project.load()).unwrap();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("packages", size), &project, |b, project| {
            b.iter(|| black_box(project.sorted_deps().len()));
        });
    }

    group.finish();
}

fn bench_conflict_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("conflict_detection");
    let rt = runtime();

    for size in SIZES {
        let mut project = project(dag_host(size, 3));
        rt.block_on(project.load()).unwrap();

        // Clashes with the setting of the deepest package, so every
        // ancestor of it is reported
        let last = format!("p{}", size - 1);
        let text = json!({
            "name": "extra",
            "dependencies": {},
            "files": [],
            "nativeBuild": {"config": {(last): {"enabled": 0}}}
        })
        .to_string();
        let candidate = PackageConfig::parse("extra", &text).unwrap();

        group.bench_with_input(BenchmarkId::new("packages", size), &candidate, |b, candidate| {
            b.iter(|| {
                let conflicts = rt
                    .block_on(project.find_conflicts(Candidate::Config(candidate.clone()), "*"))
                    .unwrap();
                black_box(conflicts.len())
            });
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_graph_loading, bench_build_order, bench_conflict_detection
}
criterion_main!(benches);
