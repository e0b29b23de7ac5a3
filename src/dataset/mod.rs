//! Raw tabular records and datasets.
//!
//! A [`RawRecord`] is a single row of named scalar values as it arrives from a
//! CSV file or an inference request. [`TabularDataset`] pairs records with
//! their targets and owns the holdout split.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub mod csv;
pub mod memory;

pub use self::csv::{load_csv, read_csv};
pub use self::memory::TabularDataset;

/// Tokens treated as a missing cell.
pub const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// A single scalar cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A quantity.
    Number(f64),
    /// A category label, or a number still in its textual form.
    Text(String),
    /// No value; imputed during preprocessing.
    Missing,
}

impl Value {
    /// Returns true for [`Value::Missing`].
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric view of the value. Text is parsed; missing values are `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Missing => None,
        }
    }

    /// Categorical view of the value. Numbers are rendered as text.
    pub fn as_category(&self) -> Option<String> {
        match self {
            Value::Number(v) => Some(v.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Missing => None,
        }
    }

    /// Parse a raw cell, mapping the usual missing tokens to [`Value::Missing`].
    pub fn parse_cell(cell: &str) -> Self {
        let cell = cell.trim();
        if MISSING_TOKENS.contains(&cell) {
            return Value::Missing;
        }
        match cell.parse::<f64>() {
            Ok(v) => Value::Number(v),
            Err(_) => Value::Text(cell.to_string()),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Missing)
    }
}

/// A mapping from feature name to scalar value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(BTreeMap<String, Value>);

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<BTreeMap<String, Value>> for RawRecord {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Errors raised while loading or splitting a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("csv error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("target column '{0}' not found in header")]
    MissingTargetColumn(String),
    #[error("row {row}: invalid target value '{value}'")]
    InvalidTarget { row: usize, value: String },
    #[error("row {row}: column '{column}' holds non-numeric value '{value}'")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },
    #[error("csv source holds a header but no data rows")]
    NoRows,
    #[error("records and targets differ in length ({records} vs {targets})")]
    LengthMismatch { records: usize, targets: usize },
    #[error("test fraction must be in (0, 1), got {0}")]
    InvalidFraction(f64),
    #[error("cannot split {n_rows} rows with test fraction {test_fraction}")]
    TooSmall { n_rows: usize, test_fraction: f64 },
}
