//! Holdout model search.
//!
//! Every configuration in the catalog is fitted on the training split and
//! scored by R² on the test split. Results are collected in declaration
//! order and merged sequentially, so the winner does not depend on how many
//! threads ran the fits.

use super::catalog::Catalog;
use super::parallelism::Parallelism;
use crate::model::{FittedModel, InferenceModel, ModelConfig, ModelError, ModelFamily};
use ndarray::{ArrayView1, ArrayView2};
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default R² below which the winner is flagged as low quality.
pub const DEFAULT_MIN_SCORE: f64 = 0.01;

/// R² is undefined on fewer held-out rows than this.
pub const MIN_TEST_ROWS: usize = 2;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("the model catalog contains no configurations")]
    EmptyCatalog,
    #[error("held-out set has {n_test} rows; at least {MIN_TEST_ROWS} are needed to score")]
    TooFewTestRows { n_test: usize },
    #[error("all {} candidates failed: {}", .failures.len(), .failures.join("; "))]
    AllCandidatesFailed { failures: Vec<String> },
}

/// Outcome of one (family, configuration) evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub family: ModelFamily,
    pub config: ModelConfig,
    /// Test R²; `None` when the candidate failed.
    pub score: Option<f64>,
    pub error: Option<String>,
}

impl EvaluationRecord {
    pub fn succeeded(&self) -> bool {
        self.score.is_some()
    }
}

/// The selected model and everything that was tried.
#[derive(Clone, Debug)]
pub struct SearchOutcome {
    /// The fitted instance that produced `score`.
    pub model: FittedModel,
    pub family: ModelFamily,
    pub config: ModelConfig,
    pub score: f64,
    pub evaluations: Vec<EvaluationRecord>,
    pub low_quality: bool,
}

/// Search settings.
#[derive(Clone, Debug)]
pub struct ModelSearch {
    min_score: f64,
    n_threads: usize,
    seed: u64,
}

impl Default for ModelSearch {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            n_threads: 0,
            seed: 42,
        }
    }
}

impl ModelSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    /// 0 = all cores, 1 = sequential, n = dedicated pool of n threads.
    pub fn with_n_threads(mut self, n_threads: usize) -> Self {
        self.n_threads = n_threads;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn search(
        &self,
        train_x: ArrayView2<'_, f64>,
        train_y: ArrayView1<'_, f64>,
        test_x: ArrayView2<'_, f64>,
        test_y: ArrayView1<'_, f64>,
        catalog: &Catalog,
    ) -> Result<SearchOutcome, TrainingError> {
        let candidates = catalog.candidates(self.seed);
        if candidates.is_empty() {
            return Err(TrainingError::EmptyCatalog);
        }
        if test_x.nrows() < MIN_TEST_ROWS {
            return Err(TrainingError::TooFewTestRows {
                n_test: test_x.nrows(),
            });
        }
        info!(
            n_candidates = candidates.len(),
            n_train = train_x.nrows(),
            n_test = test_x.nrows(),
            "starting model search"
        );

        let parallelism = Parallelism::from_threads(self.n_threads);
        let evaluate = |config: &ModelConfig| evaluate(config, train_x, train_y, test_x, test_y);
        let results = match self.n_threads {
            0 | 1 => parallelism.maybe_par_map(&candidates, evaluate),
            n => match ThreadPoolBuilder::new().num_threads(n).build() {
                Ok(pool) => pool.install(|| parallelism.maybe_par_map(&candidates, evaluate)),
                Err(e) => {
                    warn!(error = %e, "could not build thread pool, searching sequentially");
                    Parallelism::Sequential.maybe_par_map(&candidates, evaluate)
                }
            },
        };

        let mut evaluations = Vec::with_capacity(results.len());
        let mut fitted = Vec::with_capacity(results.len());
        for (config, result) in candidates.into_iter().zip(results) {
            let record = match &result {
                Ok((_, score)) => {
                    debug!(candidate = %config, score, "candidate scored");
                    EvaluationRecord {
                        family: config.family(),
                        config,
                        score: Some(*score),
                        error: None,
                    }
                }
                Err(e) => {
                    warn!(candidate = %config, error = %e, "candidate failed");
                    EvaluationRecord {
                        family: config.family(),
                        config,
                        score: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            evaluations.push(record);
            fitted.push(result.ok().map(|(model, _)| model));
        }

        let scores: Vec<Option<f64>> = evaluations.iter().map(|r| r.score).collect();
        let Some(best) = best_index(&scores) else {
            let failures = evaluations
                .iter()
                .map(|r| {
                    format!(
                        "{}: {}",
                        r.config,
                        r.error.as_deref().unwrap_or("no score")
                    )
                })
                .collect();
            return Err(TrainingError::AllCandidatesFailed { failures });
        };

        let record = &evaluations[best];
        let score = record.score.unwrap_or(f64::NAN);
        let config = record.config.clone();
        let model = fitted
            .swap_remove(best)
            .ok_or_else(|| TrainingError::AllCandidatesFailed { failures: vec![] })?;
        let low_quality = score < self.min_score;
        if low_quality {
            warn!(
                best = %config,
                score,
                min_score = self.min_score,
                "best model scores below the quality threshold"
            );
        }
        info!(best = %config, score, "model search finished");

        Ok(SearchOutcome {
            family: config.family(),
            model,
            config,
            score,
            evaluations,
            low_quality,
        })
    }
}

fn evaluate(
    config: &ModelConfig,
    train_x: ArrayView2<'_, f64>,
    train_y: ArrayView1<'_, f64>,
    test_x: ArrayView2<'_, f64>,
    test_y: ArrayView1<'_, f64>,
) -> Result<(FittedModel, f64), ModelError> {
    if train_x.ncols() != test_x.ncols() {
        return Err(ModelError::ShapeMismatch {
            expected: train_x.ncols(),
            got: test_x.ncols(),
        });
    }
    let model = config.fit(train_x, train_y)?;
    let score = model.score(test_x, test_y)?;
    if !score.is_finite() {
        return Err(ModelError::Numerical(format!("non-finite test score {score}")));
    }
    Ok((model, score))
}

/// Index of the highest finite score; earlier entries win ties.
pub(crate) fn best_index(scores: &[Option<f64>]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, score) in scores.iter().enumerate() {
        let Some(score) = score.filter(|s| s.is_finite()) else {
            continue;
        };
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_data;
    use crate::selection::grid::{FamilyGrid, ForestGrid, LinearGrid, TreeGrid};
    use ndarray::{s, Array1, Array2};

    fn split(
        x: &Array2<f64>,
        y: &Array1<f64>,
        n_train: usize,
    ) -> [(Array2<f64>, Array1<f64>); 2] {
        [
            (
                x.slice(s![..n_train, ..]).to_owned(),
                y.slice(s![..n_train]).to_owned(),
            ),
            (
                x.slice(s![n_train.., ..]).to_owned(),
                y.slice(s![n_train..]).to_owned(),
            ),
        ]
    }

    #[test]
    fn test_best_index() {
        assert_eq!(best_index(&[Some(0.4), Some(0.6)]), Some(1));
        assert_eq!(best_index(&[Some(0.6), Some(0.4)]), Some(0));
        assert_eq!(best_index(&[Some(0.5), Some(0.5)]), Some(0));
        assert_eq!(best_index(&[None, Some(f64::NAN), Some(-3.0)]), Some(2));
        assert_eq!(best_index(&[None, Some(f64::INFINITY)]), None);
        assert_eq!(best_index(&[]), None);
    }

    #[test]
    fn test_linear_target_selects_linear_regression() {
        let (x, y) = test_data::linear(60);
        let [(train_x, train_y), (test_x, test_y)] = split(&x, &y, 45);
        let catalog =
            Catalog::with_families(&[ModelFamily::DecisionTree, ModelFamily::LinearRegression]);
        let outcome = ModelSearch::new()
            .with_n_threads(1)
            .search(train_x.view(), train_y.view(), test_x.view(), test_y.view(), &catalog)
            .unwrap();
        assert_eq!(outcome.family, ModelFamily::LinearRegression);
        assert!((outcome.score - 1.0).abs() < 1e-9);
        assert!(!outcome.low_quality);
        assert_eq!(outcome.evaluations.len(), 5);

        // the returned model is the one that was scored
        let rescored = outcome.model.score(test_x.view(), test_y.view()).unwrap();
        assert_eq!(rescored, outcome.score);
    }

    #[test]
    fn test_search_is_reproducible_across_thread_counts() {
        let (x, y) = test_data::linear(50);
        let [(train_x, train_y), (test_x, test_y)] = split(&x, &y, 40);
        let catalog = Catalog::new(vec![
            FamilyGrid::RandomForest(ForestGrid {
                n_estimators: vec![5, 10],
            }),
            FamilyGrid::DecisionTree(TreeGrid::default()),
        ]);
        let run = |threads| {
            ModelSearch::new()
                .with_n_threads(threads)
                .with_seed(3)
                .search(train_x.view(), train_y.view(), test_x.view(), test_y.view(), &catalog)
                .unwrap()
        };
        let a = run(1);
        let b = run(2);
        assert_eq!(a.config, b.config);
        assert_eq!(a.score, b.score);
        let scores_a: Vec<_> = a.evaluations.iter().map(|r| r.score).collect();
        let scores_b: Vec<_> = b.evaluations.iter().map(|r| r.score).collect();
        assert_eq!(scores_a, scores_b);
    }

    #[test]
    fn test_failed_candidates_are_recorded() {
        // negative targets make poisson fail; the rest still compete
        let (x, y) = test_data::linear(40);
        let y = y.mapv(|v| v - 1000.0);
        let [(train_x, train_y), (test_x, test_y)] = split(&x, &y, 30);
        let catalog = Catalog::with_families(&[ModelFamily::DecisionTree]);
        let outcome = ModelSearch::new()
            .with_n_threads(1)
            .search(train_x.view(), train_y.view(), test_x.view(), test_y.view(), &catalog)
            .unwrap();
        let failed: Vec<_> = outcome.evaluations.iter().filter(|r| !r.succeeded()).collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].config.describe().contains("poisson"));
        assert!(failed[0].error.is_some());
    }

    #[test]
    fn test_width_mismatch_fails_every_candidate() {
        let (x, y) = test_data::linear(20);
        let test_x = Array2::<f64>::zeros((5, 3));
        let test_y = Array1::<f64>::zeros(5);
        let catalog =
            Catalog::with_families(&[ModelFamily::LinearRegression, ModelFamily::DecisionTree]);
        let err = ModelSearch::new()
            .with_n_threads(1)
            .search(x.view(), y.view(), test_x.view(), test_y.view(), &catalog)
            .unwrap_err();
        match err {
            TrainingError::AllCandidatesFailed { failures } => assert_eq!(failures.len(), 5),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_empty_catalog() {
        let (x, y) = test_data::linear(10);
        let err = ModelSearch::new()
            .search(x.view(), y.view(), x.view(), y.view(), &Catalog::new(vec![]))
            .unwrap_err();
        assert!(matches!(err, TrainingError::EmptyCatalog));
    }

    #[test]
    fn test_empty_test_set_is_rejected() {
        let (x, y) = test_data::linear(20);
        let [(train_x, train_y), (test_x, test_y)] = split(&x, &y, 20);
        let catalog = Catalog::with_families(&[ModelFamily::LinearRegression]);
        let err = ModelSearch::new()
            .search(
                train_x.view(),
                train_y.view(),
                test_x.view(),
                test_y.view(),
                &catalog,
            )
            .unwrap_err();
        assert!(matches!(err, TrainingError::TooFewTestRows { n_test: 0 }));
    }

    #[test]
    fn test_low_quality_is_flagged() {
        // targets unrelated to the features
        let x = Array2::from_shape_fn((30, 1), |(i, _)| i as f64);
        let y = Array1::from_shape_fn(30, |i| if i % 2 == 0 { 1.0 } else { -1.0 });
        let [(train_x, train_y), (test_x, test_y)] = split(&x, &y, 20);
        let catalog = Catalog::new(vec![FamilyGrid::LinearRegression(LinearGrid::default())]);
        let outcome = ModelSearch::new()
            .with_n_threads(1)
            .search(train_x.view(), train_y.view(), test_x.view(), test_y.view(), &catalog)
            .unwrap();
        assert!(outcome.score < DEFAULT_MIN_SCORE);
        assert!(outcome.low_quality);
    }
}
