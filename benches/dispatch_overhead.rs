//! Benchmarks comparing threaded dispatch with a plain sequential loop

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fanmap::prelude::*;
use serde::Deserialize;

#[derive(Deserialize)]
struct SpinArgs {
    rounds: u64,
    seed: u64,
}

fn spin(args: SpinArgs) -> std::result::Result<u64, String> {
    let mut x = args.seed;
    for _ in 0..args.rounds {
        x = x.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    }
    Ok(x)
}

fn specs(n: u64, rounds: u64) -> Vec<Kwargs> {
    (0..n).map(|seed| kwargs! { "rounds" => rounds, "seed" => seed }).collect()
}

fn sequential(specs: &[Kwargs]) -> Vec<u64> {
    specs
        .iter()
        .filter_map(|spec| serde_json::from_value(serde_json::Value::Object(spec.clone())).ok())
        .filter_map(|args| spin(args).ok())
        .collect()
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    let dispatcher = Dispatcher::new(DispatchConfig::default()).with_observer(fanmap::SilentObserver);

    for rounds in [1_000u64, 100_000].iter() {
        let work = specs(64, *rounds);

        group.bench_with_input(BenchmarkId::new("sequential", rounds), &work, |b, work| {
            b.iter(|| black_box(sequential(work)));
        });

        group.bench_with_input(BenchmarkId::new("threaded", rounds), &work, |b, work| {
            b.iter(|| black_box(dispatcher.threaded(spin, work, None).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
