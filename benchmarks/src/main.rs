//! Times the full default-catalog search on synthetic data, sequential vs
//! parallel, and prints the winner of each run.

use benchmarks::SyntheticProjects;
use siteml::selection::{Catalog, ModelSearch};
use std::time::Instant;

fn main() {
    let n_rows: usize = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(400);
    let split = SyntheticProjects::carbon_emission(42).prepare(n_rows, 0.2);
    let catalog = Catalog::default();

    println!("siteml search scaling");
    println!(
        "rows: {} train / {} test, {} features, {} candidates",
        split.x_train.nrows(),
        split.x_test.nrows(),
        split.x_train.ncols(),
        catalog.len()
    );

    for (label, n_threads) in [("sequential", 1), ("parallel", 0)] {
        let start = Instant::now();
        let outcome = ModelSearch::new()
            .with_n_threads(n_threads)
            .search(
                split.x_train.view(),
                split.y_train.view(),
                split.x_test.view(),
                split.y_test.view(),
                &catalog,
            );
        let elapsed = start.elapsed();
        match outcome {
            Ok(outcome) => println!(
                "{label:>10}: {:>8.1} ms  best {} (R² = {:.4})",
                elapsed.as_secs_f64() * 1000.0,
                outcome.config,
                outcome.score
            ),
            Err(e) => println!("{label:>10}: search failed: {e}"),
        }
    }
}
