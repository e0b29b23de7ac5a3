//! Regression models.
//!
//! Every family comes as a pair: a serializable hyperparameter struct that
//! implements [`TrainableModel`], and the fitted type it produces, which
//! implements [`InferenceModel`]. An unfitted model has no `predict`.
//!
//! [`ModelConfig`] and [`FittedModel`] are the closed set of families the
//! search works over; they dispatch to the concrete types by variant.

pub mod adaboost;
pub mod boosting;
pub mod forest;
pub mod linear;
pub mod tree;
pub mod xgboost;

use crate::metrics::r2_score;
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use adaboost::{AdaBoostRegressor, FittedAdaBoost};
pub use boosting::{FittedGradientBoosting, GradientBoostingRegressor};
pub use forest::{FittedRandomForest, RandomForestRegressor};
pub use linear::{FittedLinearRegression, LinearRegression};
pub use tree::{DecisionTreeRegressor, FittedDecisionTree, SplitCriterion, TreeNode};
pub use xgboost::{FittedXgb, XgbRegressor};

/// Errors raised while fitting or applying a single model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("feature mismatch: model expects {expected} features, got {got}")]
    ShapeMismatch { expected: usize, got: usize },
    #[error("{samples} samples but {targets} targets")]
    LengthMismatch { samples: usize, targets: usize },
    #[error("cannot fit on zero samples")]
    EmptyData,
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("numerical failure: {0}")]
    Numerical(String),
    #[error("inconsistent fitted state: {0}")]
    InvalidState(String),
}

/// A model configuration that can be fitted.
pub trait TrainableModel {
    /// The fitted model type.
    type Output: InferenceModel;

    /// Fit a fresh model on `x` (rows are samples) and `y`.
    fn fit(&self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>)
        -> Result<Self::Output, ModelError>;
}

/// A fitted model ready for prediction.
pub trait InferenceModel {
    /// Number of features seen during fit.
    fn n_features_in(&self) -> usize;

    /// Predict one row. The caller guarantees the width.
    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64;

    /// Predict one sample.
    fn predict(&self, row: ArrayView1<'_, f64>) -> Result<f64, ModelError> {
        check_width(self.n_features_in(), row.len())?;
        Ok(self.predict_row(row))
    }

    /// Predict every row of `x`.
    fn predict_batch(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        check_width(self.n_features_in(), x.ncols())?;
        Ok(x.rows().into_iter().map(|row| self.predict_row(row)).collect())
    }

    /// Coefficient of determination on `(x, y)`.
    fn score(&self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<f64, ModelError> {
        if x.nrows() != y.len() {
            return Err(ModelError::LengthMismatch {
                samples: x.nrows(),
                targets: y.len(),
            });
        }
        let predictions = self.predict_batch(x)?;
        Ok(r2_score(y, predictions.view()))
    }
}

fn check_width(expected: usize, got: usize) -> Result<(), ModelError> {
    if expected != got {
        return Err(ModelError::ShapeMismatch { expected, got });
    }
    Ok(())
}

/// Shared input checks for every `fit`.
pub(crate) fn validate_training_data(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
) -> Result<(), ModelError> {
    if x.nrows() != y.len() {
        return Err(ModelError::LengthMismatch {
            samples: x.nrows(),
            targets: y.len(),
        });
    }
    if x.nrows() == 0 {
        return Err(ModelError::EmptyData);
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::InvalidInput(
            "feature matrix contains non-finite values".to_string(),
        ));
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::InvalidTarget(
            "targets contain non-finite values".to_string(),
        ));
    }
    Ok(())
}

/// The regressor families known to the search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    LinearRegression,
    DecisionTree,
    RandomForest,
    GradientBoosting,
    #[serde(rename = "xgboost")]
    XGBoost,
    AdaBoost,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 6] = [
        ModelFamily::LinearRegression,
        ModelFamily::DecisionTree,
        ModelFamily::RandomForest,
        ModelFamily::GradientBoosting,
        ModelFamily::XGBoost,
        ModelFamily::AdaBoost,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ModelFamily::LinearRegression => "Linear Regression",
            ModelFamily::DecisionTree => "Decision Tree",
            ModelFamily::RandomForest => "Random Forest",
            ModelFamily::GradientBoosting => "Gradient Boosting",
            ModelFamily::XGBoost => "XGBRegressor",
            ModelFamily::AdaBoost => "AdaBoost Regressor",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One concrete hyperparameter configuration of one family.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelConfig {
    LinearRegression(LinearRegression),
    DecisionTree(DecisionTreeRegressor),
    RandomForest(RandomForestRegressor),
    GradientBoosting(GradientBoostingRegressor),
    #[serde(rename = "xgboost")]
    XGBoost(XgbRegressor),
    AdaBoost(AdaBoostRegressor),
}

impl ModelConfig {
    pub fn family(&self) -> ModelFamily {
        match self {
            ModelConfig::LinearRegression(_) => ModelFamily::LinearRegression,
            ModelConfig::DecisionTree(_) => ModelFamily::DecisionTree,
            ModelConfig::RandomForest(_) => ModelFamily::RandomForest,
            ModelConfig::GradientBoosting(_) => ModelFamily::GradientBoosting,
            ModelConfig::XGBoost(_) => ModelFamily::XGBoost,
            ModelConfig::AdaBoost(_) => ModelFamily::AdaBoost,
        }
    }

    /// The hyperparameters that vary across the search grids, as `key=value` pairs.
    pub fn describe(&self) -> String {
        match self {
            ModelConfig::LinearRegression(m) => format!("fit_intercept={}", m.fit_intercept),
            ModelConfig::DecisionTree(m) => format!("criterion={}", m.criterion),
            ModelConfig::RandomForest(m) => format!("n_estimators={}", m.n_estimators),
            ModelConfig::GradientBoosting(m) => format!(
                "learning_rate={}, subsample={}, n_estimators={}",
                m.learning_rate, m.subsample, m.n_estimators
            ),
            ModelConfig::XGBoost(m) => format!(
                "learning_rate={}, n_estimators={}",
                m.learning_rate, m.n_estimators
            ),
            ModelConfig::AdaBoost(m) => format!(
                "learning_rate={}, n_estimators={}",
                m.learning_rate, m.n_estimators
            ),
        }
    }

    /// Fit a fresh instance of this configuration.
    pub fn fit(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
    ) -> Result<FittedModel, ModelError> {
        Ok(match self {
            ModelConfig::LinearRegression(m) => FittedModel::LinearRegression(m.fit(x, y)?),
            ModelConfig::DecisionTree(m) => FittedModel::DecisionTree(m.fit(x, y)?),
            ModelConfig::RandomForest(m) => FittedModel::RandomForest(m.fit(x, y)?),
            ModelConfig::GradientBoosting(m) => FittedModel::GradientBoosting(m.fit(x, y)?),
            ModelConfig::XGBoost(m) => FittedModel::XGBoost(m.fit(x, y)?),
            ModelConfig::AdaBoost(m) => FittedModel::AdaBoost(m.fit(x, y)?),
        })
    }
}

impl fmt::Display for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.family(), self.describe())
    }
}

/// A fitted model of any family.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum FittedModel {
    LinearRegression(FittedLinearRegression),
    DecisionTree(FittedDecisionTree),
    RandomForest(FittedRandomForest),
    GradientBoosting(FittedGradientBoosting),
    XGBoost(FittedXgb),
    AdaBoost(FittedAdaBoost),
}

impl FittedModel {
    pub fn family(&self) -> ModelFamily {
        match self {
            FittedModel::LinearRegression(_) => ModelFamily::LinearRegression,
            FittedModel::DecisionTree(_) => ModelFamily::DecisionTree,
            FittedModel::RandomForest(_) => ModelFamily::RandomForest,
            FittedModel::GradientBoosting(_) => ModelFamily::GradientBoosting,
            FittedModel::XGBoost(_) => ModelFamily::XGBoost,
            FittedModel::AdaBoost(_) => ModelFamily::AdaBoost,
        }
    }

    /// Check that deserialized state can be predicted with without panicking.
    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            FittedModel::LinearRegression(m) => m.validate(),
            FittedModel::DecisionTree(m) => m.validate(),
            FittedModel::RandomForest(m) => m.validate(),
            FittedModel::GradientBoosting(m) => m.validate(),
            FittedModel::XGBoost(m) => m.validate(),
            FittedModel::AdaBoost(m) => m.validate(),
        }
    }
}

impl InferenceModel for FittedModel {
    fn n_features_in(&self) -> usize {
        match self {
            FittedModel::LinearRegression(m) => m.n_features_in(),
            FittedModel::DecisionTree(m) => m.n_features_in(),
            FittedModel::RandomForest(m) => m.n_features_in(),
            FittedModel::GradientBoosting(m) => m.n_features_in(),
            FittedModel::XGBoost(m) => m.n_features_in(),
            FittedModel::AdaBoost(m) => m.n_features_in(),
        }
    }

    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        match self {
            FittedModel::LinearRegression(m) => m.predict_row(row),
            FittedModel::DecisionTree(m) => m.predict_row(row),
            FittedModel::RandomForest(m) => m.predict_row(row),
            FittedModel::GradientBoosting(m) => m.predict_row(row),
            FittedModel::XGBoost(m) => m.predict_row(row),
            FittedModel::AdaBoost(m) => m.predict_row(row),
        }
    }
}
