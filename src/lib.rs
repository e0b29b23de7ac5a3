//! # siteml
//!
//! Training, model selection and inference for construction-project outcome
//! regression (resource-allocation efficiency, cost, carbon emission).
//!
//! ## Core Design Principles
//!
//! - **Fit-once Type Safety**: unfitted transformers and models only offer
//!   `fit`; `transform`/`predict` exist only on the fitted types they return.
//! - **Typed Catalog**: the search runs over a closed enum of model families,
//!   each with its own typed hyperparameter grid.
//! - **Plain Artifacts**: fitted objects persist as serializable params, so
//!   `load(save(x))` behaves exactly like `x`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use siteml::artifact::ArtifactStore;
//! use siteml::config::PipelineConfig;
//! use siteml::dataset::RawRecord;
//! use siteml::inference::InferenceService;
//! use siteml::trainer::TrainingPipeline;
//!
//! # fn main() -> siteml::Result<()> {
//! let config = PipelineConfig::from_file("train.toml")?;
//! let report = TrainingPipeline::new(config.clone()).run()?;
//! println!("best: {} (R² = {:.3})", report.best_config, report.best_score);
//!
//! let service = InferenceService::load(&ArtifactStore::new(&config.artifacts.dir))?;
//! let record = RawRecord::new()
//!     .with("Duration", 120.0)
//!     .with("WeatherCondition", "Rainy");
//! let response = service.respond(&record);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - `dataset`: raw records, CSV loading, holdout split
//! - `preprocessing`: imputation, scaling, one-hot encoding, the schema-driven preprocessor
//! - `model`: regressors and the `ModelConfig`/`FittedModel` dispatch enums
//! - `selection`: hyperparameter grids, catalog, and the holdout search
//! - `artifact`: saving and loading fitted objects
//! - `inference`: the prediction service
//! - `trainer`: the end-to-end training pipeline
//! - `config`, `logging`, `metrics`, `serialization`: supporting pieces

pub mod artifact;
pub mod config;
pub mod dataset;
pub mod error;
pub mod inference;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod preprocessing;
pub mod selection;
pub mod serialization;
pub mod trainer;

pub use error::{Error, Result};
