use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use replay_check::ConsistencyChecker;
use replay_check::diff::diff;
use std::hint::black_box;

fn body(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

fn benchmark_diff(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("diff");

    for len in [1024, 64 * 1024, 1024 * 1024] {
        let baseline = body(len, 0);
        let equal = baseline.clone();
        let mut tail_changed = baseline.clone();
        tail_changed[len - 1] ^= 0xff;

        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::new("equal", len), &equal, |b, candidate| {
            b.iter(|| black_box(diff(&baseline, candidate)));
        });
        group.bench_with_input(BenchmarkId::new("tail_changed", len), &tail_changed, |b, candidate| {
            b.iter(|| black_box(diff(&baseline, candidate)));
        });
    }

    group.finish();
}

fn benchmark_checker(criterion: &mut Criterion) {
    let checker = ConsistencyChecker::new();
    let baseline = Bytes::from(body(64 * 1024, 0));
    checker.capture(baseline.clone());

    criterion.bench_function("checker_consistent_64k", |b| {
        b.iter(|| black_box(checker.capture(baseline.clone())));
    });
}

criterion_group!(benches, benchmark_diff, benchmark_checker);
criterion_main!(benches);
