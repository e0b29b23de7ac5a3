use benchmarks::SyntheticProjects;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use siteml::preprocessing::{FeaturePreprocessor, FittedTransformer, Transformer};

fn bench_fit(c: &mut Criterion) {
    let projects = SyntheticProjects::carbon_emission(42);
    for size in [100, 1000, 10000].iter() {
        let dataset = projects.generate(*size);
        c.bench_with_input(BenchmarkId::new("preprocessor_fit", size), size, |b, _| {
            let preprocessor = FeaturePreprocessor::new(projects.schema().clone());
            b.iter(|| {
                let fitted = preprocessor.fit(black_box(dataset.records())).unwrap();
                black_box(fitted);
            });
        });
    }
}

fn bench_transform(c: &mut Criterion) {
    let projects = SyntheticProjects::carbon_emission(42);
    let train = projects.generate(1000);
    let fitted = FeaturePreprocessor::new(projects.schema().clone())
        .fit(train.records())
        .unwrap();

    for size in [1, 100, 10000].iter() {
        let rows = SyntheticProjects::carbon_emission(7).generate(*size);
        c.bench_with_input(
            BenchmarkId::new("preprocessor_transform", size),
            size,
            |b, _| {
                b.iter(|| {
                    let x = fitted.transform(black_box(rows.records())).unwrap();
                    black_box(x);
                });
            },
        );
    }
}

criterion_group!(benches, bench_fit, bench_transform);
criterion_main!(benches);
