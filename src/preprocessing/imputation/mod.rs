//! Missing-value imputation.
//!
//! - [`SimpleImputer`] fills numeric columns (NaN marks a missing value).
//! - [`CategoricalImputer`] fills string columns with the most frequent label.

mod categorical;
mod simple;

pub use categorical::{CategoricalImputer, CategoricalImputerParams, FittedCategoricalImputer};
pub use simple::{FittedSimpleImputer, ImputeStrategy, SimpleImputer, SimpleImputerParams};
