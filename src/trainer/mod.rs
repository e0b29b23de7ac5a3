//! End-to-end training: load data, fit the preprocessor, search, persist.

use crate::artifact::ArtifactStore;
use crate::config::{DataSource, PipelineConfig};
use crate::dataset::{load_csv, TabularDataset};
use crate::error::Result;
use crate::metrics::RegressionMetrics;
use crate::model::{InferenceModel, ModelConfig, ModelFamily};
use crate::preprocessing::{
    FeaturePreprocessor, FeatureSchema, FittedFeaturePreprocessor, FittedTransformer, Transformer,
};
use crate::selection::{EvaluationRecord, ModelSearch, SearchOutcome};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Summary of one training run, printed by the CLI as JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub best_family: ModelFamily,
    pub best_config: ModelConfig,
    /// Held-out R² of the winner.
    pub best_score: f64,
    pub low_quality: bool,
    pub n_train: usize,
    pub n_test: usize,
    pub feature_names: Vec<String>,
    pub train_metrics: RegressionMetrics,
    pub test_metrics: RegressionMetrics,
    pub evaluations: Vec<EvaluationRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts_dir: Option<PathBuf>,
}

/// The fitted pair produced by [`TrainingPipeline::train`].
#[derive(Clone, Debug)]
pub struct TrainedPipeline {
    pub preprocessor: FittedFeaturePreprocessor,
    pub outcome: SearchOutcome,
    pub report: TrainingReport,
}

pub struct TrainingPipeline {
    config: PipelineConfig,
}

impl TrainingPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load, train, and save both artifacts.
    pub fn run(&self) -> Result<TrainingReport> {
        self.config.validate()?;
        let (schema, target) = self.config.schema.resolve()?;
        let (train, test) = self.load_data(&schema, &target)?;

        let trained = self.train(schema, &train, &test)?;
        let store = ArtifactStore::new(&self.config.artifacts.dir);
        store.save(&trained.preprocessor)?;
        store.save(&trained.outcome.model)?;

        let mut report = trained.report;
        report.artifacts_dir = Some(store.dir().to_path_buf());
        info!(dir = %store.dir().display(), "training run complete");
        Ok(report)
    }

    /// Read the configured data and return `(train, test)`.
    pub fn load_data(
        &self,
        schema: &FeatureSchema,
        target: &str,
    ) -> Result<(TabularDataset, TabularDataset)> {
        let split = match self.config.data.source()? {
            DataSource::Single {
                path,
                test_fraction,
                seed,
            } => {
                let dataset = load_csv(&path, schema, target)?;
                info!(path = %path.display(), rows = dataset.len(), "loaded dataset");
                dataset.train_test_split(test_fraction, seed)?
            }
            DataSource::Split { train, test } => {
                let train_set = load_csv(&train, schema, target)?;
                let test_set = load_csv(&test, schema, target)?;
                info!(
                    train = %train.display(),
                    test = %test.display(),
                    "loaded pre-split datasets"
                );
                (train_set, test_set)
            }
        };
        Ok(split)
    }

    /// Fit the preprocessor on `train` only, then search over the catalog.
    pub fn train(
        &self,
        schema: FeatureSchema,
        train: &TabularDataset,
        test: &TabularDataset,
    ) -> Result<TrainedPipeline> {
        let preprocessor =
            FeaturePreprocessor::with_config(schema, self.config.preprocessing.clone())
                .fit(train.records())?;
        let x_train = preprocessor.transform(train.records())?;
        let x_test = preprocessor.transform(test.records())?;
        let y_train = train.targets_array();
        let y_test = test.targets_array();
        info!(
            n_train = x_train.nrows(),
            n_test = x_test.nrows(),
            n_features = x_train.ncols(),
            "preprocessed training data"
        );

        let search = &self.config.search;
        let outcome = ModelSearch::new()
            .with_min_score(search.min_score)
            .with_n_threads(search.n_threads)
            .with_seed(search.seed)
            .search(
                x_train.view(),
                y_train.view(),
                x_test.view(),
                y_test.view(),
                &search.catalog(),
            )?;

        let train_pred = outcome.model.predict_batch(x_train.view())?;
        let test_pred = outcome.model.predict_batch(x_test.view())?;
        let report = TrainingReport {
            best_family: outcome.family,
            best_config: outcome.config.clone(),
            best_score: outcome.score,
            low_quality: outcome.low_quality,
            n_train: train.len(),
            n_test: test.len(),
            feature_names: preprocessor.feature_names(),
            train_metrics: RegressionMetrics::calculate(y_train.view(), train_pred.view()),
            test_metrics: RegressionMetrics::calculate(y_test.view(), test_pred.view()),
            evaluations: outcome.evaluations.clone(),
            artifacts_dir: None,
        };

        Ok(TrainedPipeline {
            preprocessor,
            outcome,
            report,
        })
    }
}
