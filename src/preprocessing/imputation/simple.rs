//! Simple Imputer.
//!
//! Imputation transformer for completing missing numeric values.
//! Supports mean, median, most_frequent, and constant strategies.
//!
//! Note: This implementation treats NaN as missing values.
//!
//! # Example
//! ```ignore
//! use siteml::preprocessing::{Transformer, FittedTransformer, SimpleImputer, ImputeStrategy};
//!
//! let imputer = SimpleImputer::new(ImputeStrategy::Median);
//! let fitted = imputer.fit(&data)?;
//! let imputed = fitted.transform(&data)?;
//! ```

use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Strategy for imputing missing values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    /// Replace missing values with the mean of each column.
    Mean,
    /// Replace missing values with the median of each column.
    #[default]
    Median,
    /// Replace missing values with the most frequent value of each column.
    MostFrequent,
    /// Replace missing values with a constant value.
    Constant(f64),
}

/// Serializable parameters for a fitted SimpleImputer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimpleImputerParams {
    /// Strategy used for imputation.
    pub strategy: ImputeStrategy,
    /// Statistics (fill values) for each feature.
    pub statistics: Vec<f64>,
}

/// SimpleImputer transformer (unfitted).
#[derive(Clone, Debug, Default)]
pub struct SimpleImputer {
    strategy: ImputeStrategy,
}

impl SimpleImputer {
    /// Create a new SimpleImputer with the specified strategy.
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self { strategy }
    }
}

/// Compute the fill value for one column, ignoring NaN values.
fn column_statistic(column: ArrayView1<'_, f64>, strategy: &ImputeStrategy) -> f64 {
    if let ImputeStrategy::Constant(val) = strategy {
        return *val;
    }

    let mut observed: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
    if observed.is_empty() {
        return 0.0; // Default to 0 if all values are missing
    }

    match strategy {
        ImputeStrategy::Mean => observed.iter().sum::<f64>() / observed.len() as f64,
        ImputeStrategy::Median => {
            observed.sort_by(|a, b| a.total_cmp(b));
            let n = observed.len();
            if n % 2 == 0 {
                (observed[n / 2 - 1] + observed[n / 2]) / 2.0
            } else {
                observed[n / 2]
            }
        }
        ImputeStrategy::MostFrequent => {
            // BTreeMap keeps keys ordered, so ties resolve to the smallest value
            let mut counts: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
            for &v in &observed {
                let key = ordered_key(v);
                counts.entry(key).or_insert((v, 0)).1 += 1;
            }
            let mut best = (0.0, 0usize);
            for (value, count) in counts.into_values() {
                if count > best.1 {
                    best = (value, count);
                }
            }
            best.0
        }
        ImputeStrategy::Constant(val) => *val,
    }
}

/// Total-order key for a float, monotone in the value.
fn ordered_key(v: f64) -> i64 {
    let bits = v.to_bits() as i64;
    bits ^ (((bits >> 63) as u64) >> 1) as i64
}

impl Transformer for SimpleImputer {
    type Input = Array2<f64>;
    type Output = Array2<f64>;
    type Params = SimpleImputerParams;
    type Fitted = FittedSimpleImputer;

    fn fit(&self, data: &Self::Input) -> Result<Self::Fitted, PreprocessingError> {
        if data.nrows() == 0 {
            return Err(PreprocessingError::EmptyData(
                "Cannot fit SimpleImputer on empty data".to_string(),
            ));
        }

        let statistics: Array1<f64> = data
            .axis_iter(Axis(1))
            .map(|column| column_statistic(column, &self.strategy))
            .collect();

        Ok(FittedSimpleImputer {
            strategy: self.strategy.clone(),
            statistics,
        })
    }
}

/// Fitted SimpleImputer ready for inference.
#[derive(Clone, Debug)]
pub struct FittedSimpleImputer {
    strategy: ImputeStrategy,
    statistics: Array1<f64>,
}

impl FittedSimpleImputer {
    /// Get the imputation statistics (fill values) for each feature.
    pub fn statistics(&self) -> &Array1<f64> {
        &self.statistics
    }
}

impl FittedTransformer for FittedSimpleImputer {
    type Input = Array2<f64>;
    type Output = Array2<f64>;
    type Params = SimpleImputerParams;

    fn transform(&self, data: &Self::Input) -> Result<Self::Output, PreprocessingError> {
        if data.ncols() != self.statistics.len() {
            return Err(PreprocessingError::FeatureMismatch {
                expected_features: self.statistics.len(),
                got_features: data.ncols(),
            });
        }

        let mut result = data.clone();
        for (mut column, &fill) in result.axis_iter_mut(Axis(1)).zip(self.statistics.iter()) {
            column.mapv_inplace(|v| if v.is_nan() { fill } else { v });
        }
        Ok(result)
    }

    fn extract_params(&self) -> Self::Params {
        SimpleImputerParams {
            strategy: self.strategy.clone(),
            statistics: self.statistics.to_vec(),
        }
    }

    fn from_params(params: Self::Params) -> Result<Self, PreprocessingError> {
        if params.statistics.iter().any(|v| v.is_nan()) {
            return Err(PreprocessingError::InvalidParameter(
                "SimpleImputer statistics must not contain NaN".to_string(),
            ));
        }
        Ok(Self {
            strategy: params.strategy,
            statistics: Array1::from(params.statistics),
        })
    }

    fn n_features_in(&self) -> usize {
        self.statistics.len()
    }
}
