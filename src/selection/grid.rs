//! Typed hyperparameter grids, one per model family.
//!
//! A grid expands into concrete [`ModelConfig`]s by cartesian product of its
//! axes. The first axis varies slowest, so the expansion order is exactly the
//! declared order.

use crate::model::{
    AdaBoostRegressor, DecisionTreeRegressor, GradientBoostingRegressor, LinearRegression,
    ModelConfig, ModelFamily, RandomForestRegressor, SplitCriterion, XgbRegressor,
};
use serde::{Deserialize, Serialize};

/// Expansion of a grid into configurations.
pub trait ParamGrid {
    fn family(&self) -> ModelFamily;

    /// Number of configurations the grid expands to.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every configuration in declared order, stochastic ones seeded with `seed`.
    fn configs(&self, seed: u64) -> Vec<ModelConfig>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearGrid {
    pub fit_intercept: Vec<bool>,
}

impl Default for LinearGrid {
    fn default() -> Self {
        Self {
            fit_intercept: vec![true],
        }
    }
}

impl ParamGrid for LinearGrid {
    fn family(&self) -> ModelFamily {
        ModelFamily::LinearRegression
    }

    fn len(&self) -> usize {
        self.fit_intercept.len()
    }

    fn configs(&self, _seed: u64) -> Vec<ModelConfig> {
        self.fit_intercept
            .iter()
            .map(|&fit_intercept| {
                ModelConfig::LinearRegression(
                    LinearRegression::default().with_fit_intercept(fit_intercept),
                )
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeGrid {
    pub criterion: Vec<SplitCriterion>,
}

impl Default for TreeGrid {
    fn default() -> Self {
        Self {
            criterion: vec![
                SplitCriterion::SquaredError,
                SplitCriterion::FriedmanMse,
                SplitCriterion::AbsoluteError,
                SplitCriterion::Poisson,
            ],
        }
    }
}

impl ParamGrid for TreeGrid {
    fn family(&self) -> ModelFamily {
        ModelFamily::DecisionTree
    }

    fn len(&self) -> usize {
        self.criterion.len()
    }

    fn configs(&self, _seed: u64) -> Vec<ModelConfig> {
        self.criterion
            .iter()
            .map(|&criterion| {
                ModelConfig::DecisionTree(
                    DecisionTreeRegressor::default().with_criterion(criterion),
                )
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestGrid {
    pub n_estimators: Vec<usize>,
}

impl Default for ForestGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![50, 100, 150],
        }
    }
}

impl ParamGrid for ForestGrid {
    fn family(&self) -> ModelFamily {
        ModelFamily::RandomForest
    }

    fn len(&self) -> usize {
        self.n_estimators.len()
    }

    fn configs(&self, seed: u64) -> Vec<ModelConfig> {
        self.n_estimators
            .iter()
            .map(|&n| {
                ModelConfig::RandomForest(RandomForestRegressor::new(n).with_random_state(seed))
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingGrid {
    pub learning_rate: Vec<f64>,
    pub subsample: Vec<f64>,
    pub n_estimators: Vec<usize>,
}

impl Default for BoostingGrid {
    fn default() -> Self {
        Self {
            learning_rate: vec![0.1, 0.05],
            subsample: vec![0.8, 0.9],
            n_estimators: vec![100, 150],
        }
    }
}

impl ParamGrid for BoostingGrid {
    fn family(&self) -> ModelFamily {
        ModelFamily::GradientBoosting
    }

    fn len(&self) -> usize {
        self.learning_rate.len() * self.subsample.len() * self.n_estimators.len()
    }

    fn configs(&self, seed: u64) -> Vec<ModelConfig> {
        let mut configs = Vec::new();
        for &learning_rate in &self.learning_rate {
            for &subsample in &self.subsample {
                for &n_estimators in &self.n_estimators {
                    configs.push(ModelConfig::GradientBoosting(
                        GradientBoostingRegressor::new()
                            .with_learning_rate(learning_rate)
                            .with_subsample(subsample)
                            .with_n_estimators(n_estimators)
                            .with_random_state(seed),
                    ));
                }
            }
        }
        configs
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XgbGrid {
    pub learning_rate: Vec<f64>,
    pub n_estimators: Vec<usize>,
}

impl Default for XgbGrid {
    fn default() -> Self {
        Self {
            learning_rate: vec![0.1, 0.05],
            n_estimators: vec![100, 150],
        }
    }
}

impl ParamGrid for XgbGrid {
    fn family(&self) -> ModelFamily {
        ModelFamily::XGBoost
    }

    fn len(&self) -> usize {
        self.learning_rate.len() * self.n_estimators.len()
    }

    fn configs(&self, _seed: u64) -> Vec<ModelConfig> {
        let mut configs = Vec::new();
        for &learning_rate in &self.learning_rate {
            for &n_estimators in &self.n_estimators {
                configs.push(ModelConfig::XGBoost(
                    XgbRegressor::new()
                        .with_learning_rate(learning_rate)
                        .with_n_estimators(n_estimators),
                ));
            }
        }
        configs
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaBoostGrid {
    pub learning_rate: Vec<f64>,
    pub n_estimators: Vec<usize>,
}

impl Default for AdaBoostGrid {
    fn default() -> Self {
        Self {
            learning_rate: vec![0.1, 0.05],
            n_estimators: vec![50, 100],
        }
    }
}

impl ParamGrid for AdaBoostGrid {
    fn family(&self) -> ModelFamily {
        ModelFamily::AdaBoost
    }

    fn len(&self) -> usize {
        self.learning_rate.len() * self.n_estimators.len()
    }

    fn configs(&self, seed: u64) -> Vec<ModelConfig> {
        let mut configs = Vec::new();
        for &learning_rate in &self.learning_rate {
            for &n_estimators in &self.n_estimators {
                configs.push(ModelConfig::AdaBoost(
                    AdaBoostRegressor::new()
                        .with_learning_rate(learning_rate)
                        .with_n_estimators(n_estimators)
                        .with_random_state(seed),
                ));
            }
        }
        configs
    }
}

/// A grid for any family, tagged by `family` in config files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum FamilyGrid {
    LinearRegression(LinearGrid),
    DecisionTree(TreeGrid),
    RandomForest(ForestGrid),
    GradientBoosting(BoostingGrid),
    #[serde(rename = "xgboost")]
    XGBoost(XgbGrid),
    AdaBoost(AdaBoostGrid),
}

impl ParamGrid for FamilyGrid {
    fn family(&self) -> ModelFamily {
        match self {
            FamilyGrid::LinearRegression(g) => g.family(),
            FamilyGrid::DecisionTree(g) => g.family(),
            FamilyGrid::RandomForest(g) => g.family(),
            FamilyGrid::GradientBoosting(g) => g.family(),
            FamilyGrid::XGBoost(g) => g.family(),
            FamilyGrid::AdaBoost(g) => g.family(),
        }
    }

    fn len(&self) -> usize {
        match self {
            FamilyGrid::LinearRegression(g) => g.len(),
            FamilyGrid::DecisionTree(g) => g.len(),
            FamilyGrid::RandomForest(g) => g.len(),
            FamilyGrid::GradientBoosting(g) => g.len(),
            FamilyGrid::XGBoost(g) => g.len(),
            FamilyGrid::AdaBoost(g) => g.len(),
        }
    }

    fn configs(&self, seed: u64) -> Vec<ModelConfig> {
        match self {
            FamilyGrid::LinearRegression(g) => g.configs(seed),
            FamilyGrid::DecisionTree(g) => g.configs(seed),
            FamilyGrid::RandomForest(g) => g.configs(seed),
            FamilyGrid::GradientBoosting(g) => g.configs(seed),
            FamilyGrid::XGBoost(g) => g.configs(seed),
            FamilyGrid::AdaBoost(g) => g.configs(seed),
        }
    }
}

impl FamilyGrid {
    /// The default grid for `family`.
    pub fn default_for(family: ModelFamily) -> Self {
        match family {
            ModelFamily::LinearRegression => FamilyGrid::LinearRegression(LinearGrid::default()),
            ModelFamily::DecisionTree => FamilyGrid::DecisionTree(TreeGrid::default()),
            ModelFamily::RandomForest => FamilyGrid::RandomForest(ForestGrid::default()),
            ModelFamily::GradientBoosting => FamilyGrid::GradientBoosting(BoostingGrid::default()),
            ModelFamily::XGBoost => FamilyGrid::XGBoost(XgbGrid::default()),
            ModelFamily::AdaBoost => FamilyGrid::AdaBoost(AdaBoostGrid::default()),
        }
    }
}
