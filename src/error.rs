use crate::artifact::ArtifactError;
use crate::config::ConfigError;
use crate::dataset::DatasetError;
use crate::inference::ServiceError;
use crate::model::ModelError;
use crate::preprocessing::PreprocessingError;
use crate::selection::TrainingError;
use thiserror::Error;

/// Any error the crate can return.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Preprocessing(#[from] PreprocessingError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Training(#[from] TrainingError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
