use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, ArrayView1};
use siteml::metrics::{mae, mse, r2_score, rmse, RegressionMetrics};

type Metric = fn(ArrayView1<'_, f64>, ArrayView1<'_, f64>) -> f64;

fn inputs(n: usize) -> (Array1<f64>, Array1<f64>) {
    let y_true = Array1::from_shape_fn(n, |i| i as f64 * 0.1);
    let y_pred = Array1::from_shape_fn(n, |i| i as f64 * 0.1 + 0.5);
    (y_true, y_pred)
}

fn bench_metrics(c: &mut Criterion) {
    let metrics: [(&str, Metric); 4] =
        [("mse", mse), ("rmse", rmse), ("mae", mae), ("r2_score", r2_score)];
    for (name, metric) in metrics {
        for size in [100, 10000, 100000].iter() {
            let (y_true, y_pred) = inputs(*size);
            c.bench_with_input(BenchmarkId::new(name, size), size, |b, _| {
                b.iter(|| black_box(metric(black_box(y_true.view()), black_box(y_pred.view()))));
            });
        }
    }
}

fn bench_calculate_all(c: &mut Criterion) {
    for size in [100, 10000, 100000].iter() {
        let (y_true, y_pred) = inputs(*size);
        c.bench_with_input(BenchmarkId::new("calculate_all", size), size, |b, _| {
            b.iter(|| {
                let metrics = RegressionMetrics::calculate(
                    black_box(y_true.view()),
                    black_box(y_pred.view()),
                );
                black_box(metrics);
            });
        });
    }
}

criterion_group!(benches, bench_metrics, bench_calculate_all);
criterion_main!(benches);
