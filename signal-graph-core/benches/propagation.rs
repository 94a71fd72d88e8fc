//! Benchmarks for push propagation.
//!
//! Measures how long a single push takes to reach the end of:
//! - a chain of derived signals of increasing depth
//! - a fan-in signal combining many primary signals
//! - a graph build, without any pushes

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use signal_graph_core::dsl::{add_derived, add_primary, SignalGraphBuilder, Transform};
use signal_graph_core::graph::Upstreams;
use signal_graph_core::reactive::Stream;
use std::hint::black_box;

fn increment(up: &Upstreams<'_, u64>) -> Result<Stream<u64>, signal_graph_core::UpstreamError> {
    Ok(up.stream(0)?.map(|x: u64| x + 1))
}

/// x -> s1 -> s2 -> ... -> s{depth}
fn chain(depth: usize) -> SignalGraphBuilder<u64> {
    let mut transforms: Vec<Transform<u64>> = vec![add_primary("x")];
    for i in 1..=depth {
        let upstream = if i == 1 { "x".to_string() } else { format!("s{}", i - 1) };
        transforms.push(add_derived(format!("s{i}"), increment, [upstream]));
    }
    SignalGraphBuilder::new().define(transforms)
}

fn bench_chain_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_push");
    for depth in [1, 4, 8] {
        let graph = chain(depth).build().unwrap();
        let tail = format!("s{depth}");
        let _sub = graph.output(&tail).unwrap().subscribe(|value| {
            black_box(value);
        });
        let input = graph.input("x").unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            let mut value = 0u64;
            b.iter(|| {
                value += 1;
                input.push(black_box(value));
            });
        });
    }
    group.finish();
}

fn bench_fan_in_push(c: &mut Criterion) {
    let width = 10;
    let names: Vec<String> = (0..width).map(|i| format!("in{i}")).collect();

    let mut transforms: Vec<Transform<u64>> = names.iter().map(add_primary).collect();
    transforms.push(add_derived(
        "sum",
        |up: &Upstreams<'_, u64>| {
            let sum = Stream::combine_latest_all(up.streams()?)
                .map(|values: Vec<u64>| values.iter().sum::<u64>());
            Ok(sum)
        },
        names.clone(),
    ));

    let graph = SignalGraphBuilder::new().define(transforms).build().unwrap();
    for name in &names {
        graph.input(name).unwrap().push(0);
    }
    let _sub = graph.output("sum").unwrap().subscribe(|value| {
        black_box(value);
    });
    let first = graph.input("in0").unwrap();

    c.bench_function("fan_in_push", |b| {
        let mut value = 0u64;
        b.iter(|| {
            value += 1;
            first.push(black_box(value));
        });
    });
}

fn bench_build(c: &mut Criterion) {
    let builder = chain(32);
    c.bench_function("build_chain_32", |b| {
        b.iter(|| black_box(builder.build().unwrap()));
    });
}

criterion_group!(benches, bench_chain_push, bench_fan_in_push, bench_build);
criterion_main!(benches);
