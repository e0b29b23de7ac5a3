//! Feature preprocessing.
//!
//! Transformers follow a type-state split: an unfitted transformer only offers
//! `fit`, and `transform` exists only on the fitted type it returns. Fitted
//! transformers expose their learned state as serializable params.
//!
//! # Core Traits
//!
//! - [`Transformer`]: Unfitted transformer with hyperparameters
//! - [`FittedTransformer`]: Fitted transformer ready for inference
//!
//! # Available Transformers
//!
//! - [`SimpleImputer`]: numeric imputation (mean, median, most frequent, constant)
//! - [`CategoricalImputer`]: most-frequent imputation for labels
//! - [`StandardScaler`]: Z-score normalization
//! - [`OneHotEncoder`]: label indicators with configurable unknown handling
//! - [`FeaturePreprocessor`]: the schema-driven composition of all of the above

pub mod column_transformer;
pub mod encoding;
pub mod error;
pub mod imputation;
pub mod scaling;
pub mod schema;
pub mod traits;

use ndarray::Array2;

/// Row-major matrix of optional category labels.
pub type CategoricalMatrix = Array2<Option<String>>;

pub use column_transformer::{
    FeaturePreprocessor, FittedFeaturePreprocessor, PreprocessorConfig, PreprocessorParams,
};
pub use encoding::{FittedOneHotEncoder, HandleUnknown, OneHotEncoder, OneHotEncoderParams};
pub use error::PreprocessingError;
pub use imputation::{
    CategoricalImputer, FittedCategoricalImputer, FittedSimpleImputer, ImputeStrategy,
    SimpleImputer, SimpleImputerParams,
};
pub use scaling::{FittedStandardScaler, StandardScaler, StandardScalerConfig, StandardScalerParams};
pub use schema::{FeatureSchema, SchemaPreset};
pub use traits::{FittedTransformer, Transformer};
