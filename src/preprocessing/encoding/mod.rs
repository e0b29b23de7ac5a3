//! Categorical feature encoding.
//!
//! ## OneHotEncoder
//! Converts string categories to one-hot (dummy) indicator columns.
//!
//! ```ignore
//! // Input: [["Steel"], ["Wood"], ["Steel"]]
//! // Output: [[1,0], [0,1], [1,0]]
//! ```

mod one_hot;

pub use one_hot::{FittedOneHotEncoder, OneHotEncoder, OneHotEncoderParams, UNKNOWN_LABEL};

/// Strategy for handling unknown categories during transform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    /// Raise an error when unknown categories are encountered.
    Error,
    /// Unknown categories encode as all zeros.
    #[default]
    Ignore,
    /// Reserve an extra indicator column per feature for unknown categories.
    Bucket,
}
