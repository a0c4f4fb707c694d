use cadence_core::batching::{max_time_series_count, select_batch};
use cadence_core::models::{CadenceRange, Target, TimeSeriesId};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn targets(count: usize, pixels: usize) -> Vec<Target> {
    (0..count)
        .map(|t| {
            Target::new(
                t as i64,
                (0..pixels).map(|p| TimeSeriesId::new(format!("/pixel/{t}/{p}"))),
            )
        })
        .collect()
}

fn benchmark_select_batch(c: &mut Criterion) {
    let items = targets(10_000, 12);
    let range = CadenceRange::new(0, 4319).unwrap();
    let budget = max_time_series_count(20_000_000, range);

    c.bench_function("select_batch_partition", |b| {
        b.iter(|| {
            let mut start = 0;
            let mut batches = 0;
            while start < items.len() {
                start = select_batch(black_box(&items), start, budget).end;
                batches += 1;
            }
            batches
        })
    });
}

fn benchmark_series_budget(c: &mut Criterion) {
    let range = CadenceRange::new(0, 4319).unwrap();
    c.bench_function("max_time_series_count", |b| {
        b.iter(|| max_time_series_count(black_box(20_000_000), black_box(range)))
    });
}

criterion_group!(benches, benchmark_select_batch, benchmark_series_budget);
criterion_main!(benches);
