//! Standard Scaler (Z-score normalization).
//!
//! Transforms features by removing the mean and scaling to unit variance.
//!
//! The standard score of a sample `x` is calculated as:
//! ```text
//! z = (x - u) / s
//! ```
//! where `u` is the mean of the training samples, and `s` is the population
//! standard deviation (ddof = 0). Constant features get `s = 1`.

use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// A variance within rounding error of zero, given the column mean.
fn is_constant(var: f64, mean: f64, n: f64) -> bool {
    let eps = f64::EPSILON;
    var <= n * eps * var + (n * mean.abs() * eps).powi(2)
}

/// Configuration for StandardScaler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardScalerConfig {
    /// If true, center the data before scaling.
    pub with_mean: bool,
    /// If true, scale the data to unit variance.
    pub with_std: bool,
}

impl Default for StandardScalerConfig {
    fn default() -> Self {
        Self {
            with_mean: true,
            with_std: true,
        }
    }
}

/// Serializable parameters for a fitted StandardScaler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardScalerParams {
    /// Configuration options.
    pub config: StandardScalerConfig,
    /// Mean of each feature (zeros if with_mean=false).
    pub mean: Vec<f64>,
    /// Standard deviation of each feature (ones if with_std=false).
    pub std: Vec<f64>,
}

/// StandardScaler transformer (unfitted).
#[derive(Clone, Debug, Default)]
pub struct StandardScaler {
    config: StandardScalerConfig,
}

impl StandardScaler {
    /// Create a new StandardScaler with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to center data by mean.
    pub fn with_mean(mut self, with_mean: bool) -> Self {
        self.config.with_mean = with_mean;
        self
    }

    /// Set whether to scale data to unit variance.
    pub fn with_std(mut self, with_std: bool) -> Self {
        self.config.with_std = with_std;
        self
    }
}

impl Transformer for StandardScaler {
    type Input = Array2<f64>;
    type Output = Array2<f64>;
    type Params = StandardScalerParams;
    type Fitted = FittedStandardScaler;

    fn fit(&self, data: &Self::Input) -> Result<Self::Fitted, PreprocessingError> {
        let cols = data.ncols();
        if data.nrows() == 0 {
            return Err(PreprocessingError::EmptyData(
                "Cannot fit StandardScaler on empty data".to_string(),
            ));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(PreprocessingError::InvalidParameter(
                "StandardScaler requires finite input; impute missing values first".to_string(),
            ));
        }

        let mean = if self.config.with_mean {
            data.mean_axis(Axis(0))
                .unwrap_or_else(|| Array1::zeros(cols))
        } else {
            Array1::zeros(cols)
        };

        let std = if self.config.with_std {
            // population std (ddof=0); constant features keep scale 1
            let n = data.nrows() as f64;
            let centers = data.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(cols));
            let var = data.var_axis(Axis(0), 0.0);
            Array1::from_iter(var.iter().zip(centers.iter()).map(|(&v, &m)| {
                if is_constant(v, m, n) {
                    1.0
                } else {
                    v.sqrt()
                }
            }))
        } else {
            Array1::ones(cols)
        };

        Ok(FittedStandardScaler {
            config: self.config.clone(),
            mean,
            std,
        })
    }
}

/// Fitted StandardScaler ready for inference.
#[derive(Clone, Debug)]
pub struct FittedStandardScaler {
    config: StandardScalerConfig,
    mean: Array1<f64>,
    std: Array1<f64>,
}

impl FittedStandardScaler {
    /// Get the mean values for each feature.
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Get the standard deviation values for each feature.
    pub fn std(&self) -> &Array1<f64> {
        &self.std
    }
}

impl FittedTransformer for FittedStandardScaler {
    type Input = Array2<f64>;
    type Output = Array2<f64>;
    type Params = StandardScalerParams;

    fn transform(&self, data: &Self::Input) -> Result<Self::Output, PreprocessingError> {
        if data.ncols() != self.mean.len() {
            return Err(PreprocessingError::FeatureMismatch {
                expected_features: self.mean.len(),
                got_features: data.ncols(),
            });
        }

        let mut result = data.clone();
        if self.config.with_mean {
            result -= &self.mean;
        }
        if self.config.with_std {
            result /= &self.std;
        }
        Ok(result)
    }

    fn extract_params(&self) -> Self::Params {
        StandardScalerParams {
            config: self.config.clone(),
            mean: self.mean.to_vec(),
            std: self.std.to_vec(),
        }
    }

    fn from_params(params: Self::Params) -> Result<Self, PreprocessingError> {
        if params.mean.len() != params.std.len() {
            return Err(PreprocessingError::InvalidParameter(format!(
                "StandardScaler params disagree: {} means, {} stds",
                params.mean.len(),
                params.std.len()
            )));
        }
        if params.std.iter().any(|&s| s == 0.0 || !s.is_finite()) {
            return Err(PreprocessingError::InvalidParameter(
                "StandardScaler std must be finite and non-zero".to_string(),
            ));
        }
        Ok(Self {
            config: params.config,
            mean: Array1::from(params.mean),
            std: Array1::from(params.std),
        })
    }

    fn n_features_in(&self) -> usize {
        self.mean.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standard_scaler_basic() {
        let data = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let fitted = StandardScaler::new().fit(&data).unwrap();

        assert!((fitted.mean()[0] - 3.0).abs() < 1e-12);
        assert!((fitted.mean()[1] - 4.0).abs() < 1e-12);
        let expected_std = (8.0f64 / 3.0).sqrt();
        assert!((fitted.std()[0] - expected_std).abs() < 1e-12);

        let scaled = fitted.transform(&data).unwrap();
        for col in 0..2 {
            let column = scaled.column(col);
            assert!(column.mean().unwrap().abs() < 1e-12);
            assert!((column.std(0.0) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_standard_scaler_constant_feature() {
        let data = array![[30.0], [30.0]];
        let fitted = StandardScaler::new().fit(&data).unwrap();
        assert_eq!(fitted.std()[0], 1.0);
        assert_eq!(fitted.transform(&data).unwrap()[[0, 0]], 0.0);
    }

    #[test]
    fn test_constant_feature_with_rounding_noise() {
        // the mean of 0.1 repeated is not exactly 0.1
        let data = array![[0.1, 1.0], [0.1, 2.0], [0.1, 3.0]];
        let fitted = StandardScaler::new().fit(&data).unwrap();
        assert_eq!(fitted.std()[0], 1.0);
        assert!((fitted.std()[1] - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
        for v in fitted.transform(&data).unwrap().column(0) {
            assert!(v.abs() < 1e-12);
        }
    }

    #[test]
    fn test_standard_scaler_without_mean() {
        let data = array![[2.0], [4.0]];
        let fitted = StandardScaler::new().with_mean(false).fit(&data).unwrap();
        let scaled = fitted.transform(&data).unwrap();
        assert!((scaled[[0, 0]] - 2.0).abs() < 1e-12);
        assert!((scaled[[1, 0]] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_standard_scaler_rejects_nan() {
        let data = array![[1.0], [f64::NAN]];
        assert!(StandardScaler::new().fit(&data).is_err());
    }

    #[test]
    fn test_standard_scaler_params_round_trip() {
        let data = array![[1.0, 10.0], [2.0, 20.0], [4.0, 15.0]];
        let fitted = StandardScaler::new().fit(&data).unwrap();
        let restored = FittedStandardScaler::from_params(fitted.extract_params()).unwrap();
        assert_eq!(
            fitted.transform(&data).unwrap(),
            restored.transform(&data).unwrap()
        );
    }

    #[test]
    fn test_from_params_rejects_zero_std() {
        let params = StandardScalerParams {
            config: StandardScalerConfig::default(),
            mean: vec![0.0],
            std: vec![0.0],
        };
        assert!(FittedStandardScaler::from_params(params).is_err());
    }
}
