use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use atomic_experiments::{bucket_input, Bucketer, Sha256Bucketer, TOTAL_BUCKETS};

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("bucketing");
    group.throughput(Throughput::Elements(1));

    group.bench_function("bucket_input", |b| {
        b.iter(|| {
            bucket_input(
                black_box("f8b7b506-fedd-4ebe-b2d4-ac9e71fbf337"),
                black_box("checkout-button"),
                black_box(7),
            )
        })
    });

    group.bench_function("bucket", |b| {
        b.iter(|| {
            Sha256Bucketer.bucket(
                black_box("f8b7b506-fedd-4ebe-b2d4-ac9e71fbf337-checkout-button-7"),
                black_box(TOTAL_BUCKETS),
            )
        })
    });

    group.bench_function("input_and_bucket", |b| {
        b.iter(|| {
            let input = bucket_input(
                black_box("f8b7b506-fedd-4ebe-b2d4-ac9e71fbf337"),
                black_box("checkout-button"),
                black_box(7),
            );
            Sha256Bucketer.bucket(input, black_box(TOTAL_BUCKETS))
        })
    });

    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default().noise_threshold(0.02);
    targets = criterion_benchmark);
criterion_main!(benches);
