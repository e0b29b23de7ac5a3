use benchmarks::SyntheticProjects;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use siteml::inference::InferenceService;
use siteml::model::{InferenceModel, ModelConfig, RandomForestRegressor};

fn service() -> InferenceService {
    let split = SyntheticProjects::carbon_emission(42).prepare(1000, 0.2);
    let model = ModelConfig::RandomForest(RandomForestRegressor::new(50).with_random_state(42))
        .fit(split.x_train.view(), split.y_train.view())
        .expect("Failed to fit model");
    InferenceService::from_parts(split.preprocessor, model).expect("Widths match")
}

fn bench_predict_single(c: &mut Criterion) {
    let service = service();
    let request = SyntheticProjects::carbon_emission(9).generate(1);
    let record = &request.records()[0];

    c.bench_function("predict_single", |b| {
        b.iter(|| {
            let pred = service.predict(black_box(record)).unwrap();
            black_box(pred);
        });
    });

    c.bench_function("respond_single", |b| {
        b.iter(|| {
            let response = service.respond(black_box(record));
            black_box(response);
        });
    });
}

fn bench_predict_batch(c: &mut Criterion) {
    let service = service();
    for size in [10, 100, 1000].iter() {
        let rows = SyntheticProjects::carbon_emission(11).generate(*size);
        c.bench_with_input(BenchmarkId::new("predict_batch", size), size, |b, _| {
            b.iter(|| {
                let preds = service.predict_batch(black_box(rows.records())).unwrap();
                black_box(preds);
            });
        });
    }
}

fn bench_model_only(c: &mut Criterion) {
    let split = SyntheticProjects::carbon_emission(42).prepare(1000, 0.2);
    let model = ModelConfig::RandomForest(RandomForestRegressor::new(50).with_random_state(42))
        .fit(split.x_train.view(), split.y_train.view())
        .expect("Failed to fit model");

    c.bench_function("forest_predict_matrix", |b| {
        b.iter(|| {
            let preds = model.predict_batch(black_box(split.x_test.view())).unwrap();
            black_box(preds);
        });
    });
}

criterion_group!(benches, bench_predict_single, bench_predict_batch, bench_model_only);
criterion_main!(benches);
