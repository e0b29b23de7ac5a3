//! Error types for preprocessing operations.

use thiserror::Error;

/// Error type for preprocessing operations.
#[derive(Debug, Error)]
pub enum PreprocessingError {
    /// Structural mismatch between the declared schema and the data.
    #[error("schema error in column '{column}': {reason}")]
    Schema { column: String, reason: String },
    /// Empty data provided where non-empty was required.
    #[error("empty data: {0}")]
    EmptyData(String),
    /// Feature dimension mismatch.
    #[error("feature mismatch: expected {expected_features} features, got {got_features}")]
    FeatureMismatch {
        expected_features: usize,
        got_features: usize,
    },
    /// A category outside the fitted vocabulary under `HandleUnknown::Error`.
    #[error("unknown category '{value}' in column '{column}'")]
    UnknownCategory { column: String, value: String },
    /// Invalid hyperparameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl PreprocessingError {
    pub(crate) fn schema(column: impl Into<String>, reason: impl Into<String>) -> Self {
        PreprocessingError::Schema {
            column: column.into(),
            reason: reason.into(),
        }
    }
}
