//! Random forest regressor: bagged CART trees averaged at prediction time.

use super::tree::{DecisionTreeRegressor, FittedDecisionTree, SplitCriterion};
use super::{validate_training_data, InferenceModel, ModelError, TrainableModel};
use ndarray::{ArrayView1, ArrayView2};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Random forest hyperparameters.
///
/// Tree `i` draws its bootstrap sample from `random_state + i`, so a fixed
/// `random_state` gives an identical forest on every run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomForestRegressor {
    pub n_estimators: usize,
    pub criterion: SplitCriterion,
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
    pub bootstrap: bool,
    pub random_state: u64,
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            criterion: SplitCriterion::SquaredError,
            max_depth: None,
            min_samples_leaf: 1,
            bootstrap: true,
            random_state: 0,
        }
    }
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            n_estimators,
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    fn tree(&self) -> DecisionTreeRegressor {
        let mut tree = DecisionTreeRegressor::new()
            .with_criterion(self.criterion)
            .with_min_samples_leaf(self.min_samples_leaf);
        tree.max_depth = self.max_depth;
        tree
    }
}

/// Draw `n_samples` row indices with replacement.
pub(crate) fn bootstrap_sample(n_samples: usize, seed: u64) -> Vec<usize> {
    let dist = Uniform::from(0..n_samples);
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n_samples).map(|_| dist.sample(&mut rng)).collect()
}

impl TrainableModel for RandomForestRegressor {
    type Output = FittedRandomForest;

    fn fit(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
    ) -> Result<FittedRandomForest, ModelError> {
        validate_training_data(x, y)?;
        if self.n_estimators == 0 {
            return Err(ModelError::InvalidParameter(
                "n_estimators must be at least 1".to_string(),
            ));
        }

        let n_samples = x.nrows();
        let tree = self.tree();
        let trees = (0..self.n_estimators)
            .map(|i| {
                let indices = if self.bootstrap {
                    bootstrap_sample(n_samples, self.random_state.wrapping_add(i as u64))
                } else {
                    (0..n_samples).collect()
                };
                tree.fit_indices(x, y, indices)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FittedRandomForest {
            trees,
            n_features: x.ncols(),
        })
    }
}

/// Fitted random forest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FittedRandomForest {
    trees: Vec<FittedDecisionTree>,
    n_features: usize,
}

impl FittedRandomForest {
    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[FittedDecisionTree] {
        &self.trees
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::InvalidState("forest has no trees".to_string()));
        }
        self.trees
            .iter()
            .try_for_each(|t| t.validate_member(self.n_features))
    }
}

impl InferenceModel for FittedRandomForest {
    fn n_features_in(&self) -> usize {
        self.n_features
    }

    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
        sum / self.trees.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_data;

    #[test]
    fn test_bootstrap_sample_is_seeded() {
        let a = bootstrap_sample(20, 3);
        assert_eq!(a, bootstrap_sample(20, 3));
        assert_ne!(a, bootstrap_sample(20, 4));
        assert!(a.iter().all(|&i| i < 20));
    }

    #[test]
    fn test_forest_fits_and_is_reproducible() {
        let (x, y) = test_data::linear(60);
        let forest = RandomForestRegressor::new(10).with_random_state(42);
        let a = forest.fit(x.view(), y.view()).unwrap();
        let b = forest.fit(x.view(), y.view()).unwrap();
        assert_eq!(a.n_estimators(), 10);
        assert_eq!(
            a.predict_batch(x.view()).unwrap(),
            b.predict_batch(x.view()).unwrap()
        );
        assert!(a.score(x.view(), y.view()).unwrap() > 0.9);
    }

    #[test]
    fn test_without_bootstrap_matches_single_tree() {
        let (x, y) = test_data::steps(20);
        let forest = RandomForestRegressor::new(3)
            .with_bootstrap(false)
            .fit(x.view(), y.view())
            .unwrap();
        assert_eq!(forest.predict_batch(x.view()).unwrap(), y);
    }

    #[test]
    fn test_zero_estimators_rejected() {
        let (x, y) = test_data::steps(10);
        assert!(matches!(
            RandomForestRegressor::new(0).fit(x.view(), y.view()),
            Err(ModelError::InvalidParameter(_))
        ));
    }
}
