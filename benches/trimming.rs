use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use massplane::data_handler::{
    trimming::{histogram_rows, trim_rows},
    Histogram, IngestionContext,
};

/// `n` rows `[x, y, value]` on a 100-wide grid.
fn rows(n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| vec![(i / 100) as f64, (i % 100) as f64, 1.0])
        .collect()
}

fn bench_trim_rows(c: &mut Criterion) {
    let input = rows(200_000);

    c.bench_function("trim_rows/200k", |b| {
        b.iter_batched(
            || (input.clone(), IngestionContext::default()),
            |(rows, mut ctx)| black_box(trim_rows(rows, "bench.csv", &mut ctx)),
            BatchSize::LargeInput,
        )
    });
}

fn bench_histogram_rows(c: &mut Criterion) {
    let axis = |n: usize| (0..n).map(|i| i as f64).collect::<Vec<_>>();
    let hist = Histogram::new(vec![axis(400), axis(300)], vec![0.5; 400 * 300]).unwrap();

    c.bench_function("histogram_rows/400x300", |b| {
        b.iter_batched(
            IngestionContext::default,
            |mut ctx| black_box(histogram_rows(&hist, "bench.root:h", &mut ctx)),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_trim_rows, bench_histogram_rows);
criterion_main!(benches);
