use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use semisort::hash::FastIntHash;
use semisort::util::{generate_exponential, generate_uniform, generate_zipf, records_from_keys};
use semisort::{semi_sort_with_hash, SemiSortParams};

fn bench_distributions(c: &mut Criterion) {
    let mut group = c.benchmark_group("semi_sort");
    let params = SemiSortParams::default();

    for size in [100_000usize, 1_000_000] {
        group.throughput(Throughput::Elements(size as u64));

        let datasets = [
            ("uniform", generate_uniform(size, size as u64 / 100, 1)),
            ("exponential", generate_exponential(size, 10.0, 2)),
            ("zipf", generate_zipf(size, 1.0, 10_000, 3)),
        ];

        for (name, keys) in &datasets {
            let records = records_from_keys(keys);
            group.bench_with_input(BenchmarkId::new(*name, size), &records, |b, records| {
                b.iter_batched(
                    || records.clone(),
                    |mut records| {
                        semi_sort_with_hash::<FastIntHash, _, _>(&mut records, &params);
                        black_box(records)
                    },
                    criterion::BatchSize::LargeInput,
                )
            });
        }
    }

    group.finish();
}

fn bench_sampling_rates(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampling_rate");
    let keys = generate_exponential(500_000, 10.0, 4);
    let records = records_from_keys(&keys);

    for (name, params) in [
        ("current", SemiSortParams::default_current()),
        ("legacy", SemiSortParams::default_legacy()),
    ] {
        group.bench_with_input(BenchmarkId::new(name, records.len()), &records, |b, records| {
            b.iter_batched(
                || records.clone(),
                |mut records| {
                    semi_sort_with_hash::<FastIntHash, _, _>(&mut records, &params);
                    black_box(records)
                },
                criterion::BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_distributions, bench_sampling_rates);
criterion_main!(benches);
