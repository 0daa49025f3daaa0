//! Differ benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dbsync_bench::{perturb, random_snapshot, FILES_TABLE};
use dbsync_core::{diff, Schema, Snapshot};

/// Benchmark snapshot decoding.
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let schema = Schema::parse(FILES_TABLE).unwrap();

    for rows in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), rows, |b, &rows| {
            let payload = random_snapshot(rows);
            b.iter(|| Snapshot::decode(&schema, black_box(&payload)).unwrap());
        });
    }
    group.finish();
}

/// Benchmark diffing a snapshot against an identical table.
fn bench_diff_unchanged(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_unchanged");
    let schema = Schema::parse(FILES_TABLE).unwrap();

    for rows in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), rows, |b, &rows| {
            let snapshot = Snapshot::decode(&schema, &random_snapshot(rows)).unwrap();
            let persisted = snapshot.rows().to_vec();
            b.iter(|| diff(&schema, black_box(&persisted), black_box(&snapshot)).unwrap());
        });
    }
    group.finish();
}

/// Benchmark diffing when a share of the rows changed.
fn bench_diff_modified(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_modified");
    let schema = Schema::parse(FILES_TABLE).unwrap();

    for percent in [1u32, 10, 50].iter() {
        group.throughput(Throughput::Elements(1_000));
        group.bench_with_input(
            BenchmarkId::from_parameter(percent),
            percent,
            |b, &percent| {
                let base = random_snapshot(1_000);
                let persisted = Snapshot::decode(&schema, &base).unwrap().rows().to_vec();
                let snapshot = Snapshot::decode(&schema, &perturb(&base, percent)).unwrap();
                b.iter(|| diff(&schema, black_box(&persisted), black_box(&snapshot)).unwrap());
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_decode, bench_diff_unchanged, bench_diff_modified);
criterion_main!(benches);
