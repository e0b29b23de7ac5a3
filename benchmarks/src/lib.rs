//! Shared fixtures for the siteml benchmarks.
//!
//! - Synthetic construction-project datasets for any feature schema
//! - Preprocessed train/test matrices ready for the model search

pub mod data;

pub use data::{PreparedSplit, SyntheticProjects};
