//! Benchmark for PathBatch accumulation

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use metric_autohide::batch::PathBatch;

fn make_paths(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| format!("one_min.host{:05}.disk.sda{}.write_bytes", i % 5_000, i))
        .collect()
}

fn bench_fill_and_take(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_batch");
    group.throughput(Throughput::Elements(100_000));

    group.bench_function("fill_100k_batch_50k", |b| {
        b.iter_batched(
            || make_paths(100_000),
            |paths| {
                let mut batch = PathBatch::new(50_000);
                let mut flushed = 0;
                for path in paths {
                    if batch.push(path) {
                        flushed += black_box(batch.take()).len();
                    }
                }
                flushed += batch.take().len();
                black_box(flushed)
            },
            criterion::BatchSize::LargeInput,
        );
    });

    group.finish();
}

fn bench_small_batches(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_batch_small");
    group.throughput(Throughput::Elements(10_000));

    group.bench_function("fill_10k_batch_100", |b| {
        b.iter_batched(
            || make_paths(10_000),
            |paths| {
                let mut batch = PathBatch::new(100);
                for path in paths {
                    if batch.push(path) {
                        black_box(batch.take());
                    }
                }
                black_box(batch.take())
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_fill_and_take, bench_small_batches);
criterion_main!(benches);
