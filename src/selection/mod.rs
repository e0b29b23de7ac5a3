//! Model search and selection.
//!
//! A [`Catalog`] lists the families to try, each with a typed grid of
//! hyperparameters. [`ModelSearch::search`] fits every configuration on a
//! training split, scores it by R² on a held-out split, and keeps the best.

pub mod catalog;
pub mod grid;
pub mod parallelism;
pub mod search;

pub use catalog::Catalog;
pub use grid::{
    AdaBoostGrid, BoostingGrid, FamilyGrid, ForestGrid, LinearGrid, ParamGrid, TreeGrid, XgbGrid,
};
pub use parallelism::Parallelism;
pub use search::{
    EvaluationRecord, ModelSearch, SearchOutcome, TrainingError, DEFAULT_MIN_SCORE, MIN_TEST_ROWS,
};
