//! Benchmarks for task graph operations
//!
//! Run with: cargo bench -p martflow-task-graph

#![allow(clippy::unwrap_used)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use martflow_task_graph::{TaskGraph, TaskGraphBuilder, TaskNodeData};
use std::hint::black_box;

#[derive(Debug, Clone)]
struct BenchTask {
    deps: Vec<String>,
}

impl TaskNodeData for BenchTask {
    fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.deps.iter().map(String::as_str)
    }
}

/// Layered pipeline: a linear chain of `depth` steps followed by a fan-out of
/// `width` tasks joined by a terminal marker.
fn layered_pipeline(depth: usize, width: usize) -> TaskGraphBuilder<BenchTask> {
    let mut builder = TaskGraph::builder().task("start", BenchTask { deps: vec![] });
    let mut prev = "start".to_string();

    for i in 0..depth {
        let name = format!("layer_{i}");
        builder = builder.task(name.clone(), BenchTask { deps: vec![prev] });
        prev = name;
    }

    let fan_out: Vec<String> = (0..width).map(|w| format!("mart_{w}")).collect();
    for name in &fan_out {
        builder = builder.task(
            name.clone(),
            BenchTask {
                deps: vec![prev.clone()],
            },
        );
    }

    builder.task("end", BenchTask { deps: fan_out })
}

fn benchmark_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");

    for (depth, width) in [(5, 4), (50, 50), (200, 500)] {
        let label = format!("d{depth}_w{width}");
        group.bench_with_input(
            BenchmarkId::from_parameter(&label),
            &(depth, width),
            |b, &(depth, width)| {
                b.iter(|| black_box(layered_pipeline(depth, width).build().unwrap()));
            },
        );
    }

    group.finish();
}

fn benchmark_parallel_groups(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_parallel_groups");

    for width in [4, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            let graph = layered_pipeline(10, width).build().unwrap();
            b.iter(|| black_box(graph.get_parallel_groups().len()));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_build, benchmark_parallel_groups);

criterion_main!(benches);
