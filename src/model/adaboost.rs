//! AdaBoost.R2 with shallow regression trees.
//!
//! Each round draws a weighted bootstrap sample, fits a tree, and reweights
//! rows by their normalized linear loss. Prediction is the weighted median
//! of the ensemble.

use super::tree::{DecisionTreeRegressor, FittedDecisionTree};
use super::{validate_training_data, InferenceModel, ModelError, TrainableModel};
use ndarray::{ArrayView1, ArrayView2};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// AdaBoost.R2 hyperparameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaBoostRegressor {
    pub n_estimators: usize,
    pub learning_rate: f64,
    /// Depth of each weak learner.
    pub max_depth: usize,
    pub random_state: u64,
}

impl Default for AdaBoostRegressor {
    fn default() -> Self {
        Self {
            n_estimators: 50,
            learning_rate: 1.0,
            max_depth: 3,
            random_state: 0,
        }
    }
}

impl AdaBoostRegressor {
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

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }
}

impl TrainableModel for AdaBoostRegressor {
    type Output = FittedAdaBoost;

    fn fit(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
    ) -> Result<FittedAdaBoost, ModelError> {
        validate_training_data(x, y)?;
        if self.n_estimators == 0 {
            return Err(ModelError::InvalidParameter(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0) {
            return Err(ModelError::InvalidParameter(
                "learning_rate must be positive".to_string(),
            ));
        }

        let n_samples = x.nrows();
        let tree = DecisionTreeRegressor::new().with_max_depth(self.max_depth);
        let mut rng = StdRng::seed_from_u64(self.random_state);
        let mut sample_weights = vec![1.0 / n_samples as f64; n_samples];
        let mut estimators = Vec::with_capacity(self.n_estimators);
        let mut estimator_weights = Vec::with_capacity(self.n_estimators);

        for round in 0..self.n_estimators {
            let sampler = WeightedIndex::new(&sample_weights)
                .map_err(|e| ModelError::Numerical(format!("sample weights: {e}")))?;
            let indices: Vec<usize> = (0..n_samples).map(|_| sampler.sample(&mut rng)).collect();
            let fitted = tree.fit_indices(x, y, indices)?;

            let mut errors: Vec<f64> = x
                .rows()
                .into_iter()
                .zip(y.iter())
                .map(|(row, target)| (fitted.predict_row(row) - target).abs())
                .collect();
            let max_error = errors.iter().cloned().fold(0.0, f64::max);
            if max_error > 0.0 {
                errors.iter_mut().for_each(|e| *e /= max_error);
            }
            let estimator_error: f64 = errors
                .iter()
                .zip(&sample_weights)
                .map(|(e, w)| e * w)
                .sum();

            if estimator_error <= 0.0 {
                estimators.push(fitted);
                estimator_weights.push(1.0);
                debug!(round, "perfect fit, stopping early");
                break;
            }
            if estimator_error >= 0.5 {
                if estimators.is_empty() {
                    estimators.push(fitted);
                    estimator_weights.push(1.0);
                }
                debug!(round, estimator_error, "weak learner no better than chance");
                break;
            }

            let beta = estimator_error / (1.0 - estimator_error);
            estimators.push(fitted);
            estimator_weights.push(self.learning_rate * (1.0 / beta).ln());

            if round + 1 < self.n_estimators {
                for (w, e) in sample_weights.iter_mut().zip(&errors) {
                    *w *= beta.powf((1.0 - e) * self.learning_rate);
                }
                let total: f64 = sample_weights.iter().sum();
                if !(total > 0.0) {
                    break;
                }
                sample_weights.iter_mut().for_each(|w| *w /= total);
            }
        }

        Ok(FittedAdaBoost {
            estimators,
            estimator_weights,
            n_features: x.ncols(),
        })
    }
}

/// Fitted AdaBoost.R2 ensemble.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FittedAdaBoost {
    estimators: Vec<FittedDecisionTree>,
    estimator_weights: Vec<f64>,
    n_features: usize,
}

impl FittedAdaBoost {
    pub fn n_estimators(&self) -> usize {
        self.estimators.len()
    }

    pub fn estimator_weights(&self) -> &[f64] {
        &self.estimator_weights
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.estimators.is_empty() || self.estimators.len() != self.estimator_weights.len() {
            return Err(ModelError::InvalidState(format!(
                "{} estimators with {} weights",
                self.estimators.len(),
                self.estimator_weights.len()
            )));
        }
        if self.estimator_weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ModelError::InvalidState(
                "estimator weights must be finite and non-negative".to_string(),
            ));
        }
        self.estimators
            .iter()
            .try_for_each(|t| t.validate_member(self.n_features))
    }
}

impl InferenceModel for FittedAdaBoost {
    fn n_features_in(&self) -> usize {
        self.n_features
    }

    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let predictions: Vec<f64> = self.estimators.iter().map(|t| t.predict_row(row)).collect();
        weighted_median(&predictions, &self.estimator_weights)
    }
}

/// Smallest value whose cumulative weight reaches half the total.
fn weighted_median(values: &[f64], weights: &[f64]) -> f64 {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let half = weights.iter().sum::<f64>() / 2.0;
    let mut cumulative = 0.0;
    for &i in &order {
        cumulative += weights[i];
        if cumulative >= half {
            return values[i];
        }
    }
    order.last().map_or(0.0, |&i| values[i])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_data;
    use ndarray::{Array1, Array2};

    #[test]
    fn test_weighted_median() {
        assert_eq!(weighted_median(&[3.0, 1.0, 2.0], &[1.0, 1.0, 1.0]), 2.0);
        assert_eq!(weighted_median(&[1.0, 5.0, 9.0], &[0.1, 0.1, 5.0]), 9.0);
        assert_eq!(weighted_median(&[4.0], &[0.3]), 4.0);
    }

    #[test]
    fn test_fits_linear_target() {
        let (x, y) = test_data::linear(60);
        let model = AdaBoostRegressor::new()
            .with_n_estimators(30)
            .fit(x.view(), y.view())
            .unwrap();
        assert!(model.n_estimators() >= 1);
        assert_eq!(model.n_estimators(), model.estimator_weights().len());
        assert!(model.score(x.view(), y.view()).unwrap() > 0.8);
    }

    #[test]
    fn test_constant_target_stops_after_one_round() {
        let x = Array2::from_shape_fn((12, 2), |(i, j)| (i + j) as f64);
        let y = Array1::from_elem(12, 4.0);
        let model = AdaBoostRegressor::new().fit(x.view(), y.view()).unwrap();
        assert_eq!(model.n_estimators(), 1);
        assert_eq!(model.predict(x.row(3)).unwrap(), 4.0);
    }

    #[test]
    fn test_same_seed_same_predictions() {
        let (x, y) = test_data::linear(40);
        let config = AdaBoostRegressor::new().with_n_estimators(10).with_random_state(7);
        let a = config.fit(x.view(), y.view()).unwrap();
        let b = config.fit(x.view(), y.view()).unwrap();
        assert_eq!(
            a.predict_batch(x.view()).unwrap(),
            b.predict_batch(x.view()).unwrap()
        );
    }

    #[test]
    fn test_rejects_zero_learning_rate() {
        let (x, y) = test_data::linear(10);
        let result = AdaBoostRegressor::new()
            .with_learning_rate(0.0)
            .fit(x.view(), y.view());
        assert!(matches!(result, Err(ModelError::InvalidParameter(_))));
    }

    #[test]
    fn test_validate_catches_weight_count_mismatch() {
        let (x, y) = test_data::linear(40);
        let mut model = AdaBoostRegressor::new()
            .with_n_estimators(5)
            .fit(x.view(), y.view())
            .unwrap();
        model.validate().unwrap();

        model.estimator_weights.pop();
        assert!(matches!(model.validate(), Err(ModelError::InvalidState(_))));
    }
}
