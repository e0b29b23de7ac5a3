use benchmarks::SyntheticProjects;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use siteml::model::ModelFamily;
use siteml::selection::{Catalog, FamilyGrid, ModelSearch, ParamGrid};

fn bench_fit_per_family(c: &mut Criterion) {
    let split = SyntheticProjects::carbon_emission(42).prepare(500, 0.2);
    let mut group = c.benchmark_group("fit_family");
    group.sample_size(10);

    for family in ModelFamily::ALL {
        // the first configuration of each default grid
        let Some(config) = FamilyGrid::default_for(family).configs(42).into_iter().next() else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(family), &config, |b, config| {
            b.iter(|| {
                let fitted = config
                    .fit(black_box(split.x_train.view()), black_box(split.y_train.view()))
                    .unwrap();
                black_box(fitted);
            });
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let split = SyntheticProjects::carbon_emission(42).prepare(300, 0.2);
    let catalog = Catalog::with_families(&[
        ModelFamily::LinearRegression,
        ModelFamily::DecisionTree,
        ModelFamily::RandomForest,
    ]);
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    for n_threads in [1, 0].iter() {
        let label = if *n_threads == 1 { "sequential" } else { "parallel" };
        group.bench_with_input(BenchmarkId::from_parameter(label), n_threads, |b, &n| {
            let search = ModelSearch::new().with_n_threads(n);
            b.iter(|| {
                let outcome = search
                    .search(
                        split.x_train.view(),
                        split.y_train.view(),
                        split.x_test.view(),
                        split.y_test.view(),
                        black_box(&catalog),
                    )
                    .unwrap();
                black_box(outcome.score);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fit_per_family, bench_search);
criterion_main!(benches);
