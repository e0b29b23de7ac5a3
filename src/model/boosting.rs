//! Gradient boosting regressor with squared loss.
//!
//! # Algorithm
//!
//! 1. Initialize every prediction with the target mean
//! 2. For each boosting iteration:
//!    - Compute residuals `y - F(x)` (the negative squared-loss gradient)
//!    - Draw a subsample without replacement when `subsample < 1`
//!    - Fit a shallow `friedman_mse` tree to the residuals of the subsample
//!    - Update `F(x) += learning_rate * tree(x)`
//! 3. Final prediction = init + learning_rate * sum of tree predictions

use super::tree::{DecisionTreeRegressor, FittedDecisionTree, SplitCriterion};
use super::{validate_training_data, InferenceModel, ModelError, TrainableModel};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Gradient boosting hyperparameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientBoostingRegressor {
    pub n_estimators: usize,
    pub learning_rate: f64,
    /// Fraction of rows each tree sees, in (0, 1].
    pub subsample: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub random_state: u64,
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            subsample: 1.0,
            max_depth: 3,
            min_samples_leaf: 1,
            random_state: 0,
        }
    }
}

impl GradientBoostingRegressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_subsample(mut self, subsample: f64) -> Self {
        self.subsample = subsample;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.n_estimators == 0 {
            return Err(ModelError::InvalidParameter(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ModelError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(ModelError::InvalidParameter(format!(
                "subsample must be in (0, 1], got {}",
                self.subsample
            )));
        }
        Ok(())
    }
}

impl TrainableModel for GradientBoostingRegressor {
    type Output = FittedGradientBoosting;

    fn fit(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
    ) -> Result<FittedGradientBoosting, ModelError> {
        validate_training_data(x, y)?;
        self.validate()?;

        let n_samples = x.nrows();
        let init = y.mean().unwrap_or(0.0);
        let mut predictions = Array1::from_elem(n_samples, init);
        let tree = DecisionTreeRegressor::new()
            .with_criterion(SplitCriterion::FriedmanMse)
            .with_max_depth(self.max_depth)
            .with_min_samples_leaf(self.min_samples_leaf);

        let n_subsample =
            ((self.subsample * n_samples as f64).round() as usize).clamp(1, n_samples);
        let mut rng = StdRng::seed_from_u64(self.random_state);
        let mut estimators = Vec::with_capacity(self.n_estimators);

        for _ in 0..self.n_estimators {
            let residuals = &y - &predictions;
            let indices = if n_subsample < n_samples {
                rand::seq::index::sample(&mut rng, n_samples, n_subsample).into_vec()
            } else {
                (0..n_samples).collect()
            };

            let fitted = tree.fit_indices(x, residuals.view(), indices)?;
            for (pred, row) in predictions.iter_mut().zip(x.rows()) {
                *pred += self.learning_rate * fitted.predict_row(row);
            }
            estimators.push(fitted);
        }

        Ok(FittedGradientBoosting {
            init,
            learning_rate: self.learning_rate,
            estimators,
            n_features: x.ncols(),
        })
    }
}

/// Fitted gradient boosting ensemble.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FittedGradientBoosting {
    init: f64,
    learning_rate: f64,
    estimators: Vec<FittedDecisionTree>,
    n_features: usize,
}

impl FittedGradientBoosting {
    pub fn n_estimators(&self) -> usize {
        self.estimators.len()
    }

    pub fn init_prediction(&self) -> f64 {
        self.init
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if !self.init.is_finite() || !self.learning_rate.is_finite() {
            return Err(ModelError::InvalidState(
                "initial prediction and learning rate must be finite".to_string(),
            ));
        }
        self.estimators
            .iter()
            .try_for_each(|t| t.validate_member(self.n_features))
    }
}

impl InferenceModel for FittedGradientBoosting {
    fn n_features_in(&self) -> usize {
        self.n_features
    }

    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let boost: f64 = self.estimators.iter().map(|t| t.predict_row(row)).sum();
        self.init + self.learning_rate * boost
    }
}
