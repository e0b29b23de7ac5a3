//! Training pipeline configuration, loaded from TOML.
//!
//! ```toml
//! [schema]
//! preset = "carbon_emission"
//!
//! [data]
//! path = "data/carbon.csv"
//! test_fraction = 0.2
//!
//! [search]
//! n_threads = 0
//!
//! [[search.catalog]]
//! family = "random_forest"
//! n_estimators = [50, 100]
//! ```
//!
//! Everything except the data location has a default.

use crate::preprocessing::{FeatureSchema, PreprocessorConfig, SchemaPreset};
use crate::selection::{Catalog, DEFAULT_MIN_SCORE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub schema: SchemaConfig,
    pub data: DataConfig,
    pub preprocessing: PreprocessorConfig,
    pub search: SearchConfig,
    pub artifacts: ArtifactsConfig,
}

/// Either a preset or explicit column lists with a target.
///
/// With neither, the carbon emission preset is used.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub preset: Option<SchemaPreset>,
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
    /// Overrides the preset's target when set.
    pub target: Option<String>,
}

impl SchemaConfig {
    /// The feature schema and target column this config describes.
    pub fn resolve(&self) -> Result<(FeatureSchema, String), ConfigError> {
        let has_lists = !self.numeric.is_empty() || !self.categorical.is_empty();
        let (schema, target) = match (self.preset, has_lists) {
            (Some(_), true) => {
                return Err(ConfigError::Invalid(
                    "schema: give either a preset or explicit column lists, not both".to_string(),
                ))
            }
            (preset, false) => {
                let preset = preset.unwrap_or(SchemaPreset::CarbonEmission);
                (
                    preset.schema(),
                    self.target.clone().unwrap_or_else(|| preset.target().to_string()),
                )
            }
            (None, true) => {
                let target = self.target.clone().ok_or_else(|| {
                    ConfigError::Invalid("schema: explicit columns need a target".to_string())
                })?;
                (
                    FeatureSchema::new(self.numeric.clone(), self.categorical.clone()),
                    target,
                )
            }
        };
        schema
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("schema: {e}")))?;
        if schema.columns().any(|c| *c == target) {
            return Err(ConfigError::Invalid(format!(
                "schema: target `{target}` is also a feature"
            )));
        }
        Ok((schema, target))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// One file, split by `test_fraction`.
    pub path: Option<PathBuf>,
    /// Pre-split files; used together instead of `path`.
    pub train_path: Option<PathBuf>,
    pub test_path: Option<PathBuf>,
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: None,
            train_path: None,
            test_path: None,
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

/// Where the training data comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum DataSource {
    Single { path: PathBuf, test_fraction: f64, seed: u64 },
    Split { train: PathBuf, test: PathBuf },
}

impl DataConfig {
    pub fn source(&self) -> Result<DataSource, ConfigError> {
        match (&self.path, &self.train_path, &self.test_path) {
            (Some(path), None, None) => {
                if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
                    return Err(ConfigError::Invalid(format!(
                        "data.test_fraction must be in (0, 1), got {}",
                        self.test_fraction
                    )));
                }
                Ok(DataSource::Single {
                    path: path.clone(),
                    test_fraction: self.test_fraction,
                    seed: self.seed,
                })
            }
            (None, Some(train), Some(test)) => Ok(DataSource::Split {
                train: train.clone(),
                test: test.clone(),
            }),
            (None, None, None) => Err(ConfigError::Invalid(
                "data: set `path` or both `train_path` and `test_path`".to_string(),
            )),
            _ => Err(ConfigError::Invalid(
                "data: use either `path` alone or `train_path` with `test_path`".to_string(),
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub min_score: f64,
    /// 0 = all cores, 1 = sequential.
    pub n_threads: usize,
    pub seed: u64,
    /// Replaces the default grids when present.
    pub catalog: Option<Catalog>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            n_threads: 0,
            seed: 42,
            catalog: None,
        }
    }
}

impl SearchConfig {
    pub fn catalog(&self) -> Catalog {
        self.catalog.clone().unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    pub dir: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("artifacts"),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schema.resolve()?;
        self.data.source()?;
        if !self.search.min_score.is_finite() {
            return Err(ConfigError::Invalid(
                "search.min_score must be finite".to_string(),
            ));
        }
        if self.search.catalog().is_empty() {
            return Err(ConfigError::Invalid(
                "search.catalog has no configurations".to_string(),
            ));
        }
        Ok(())
    }
}
