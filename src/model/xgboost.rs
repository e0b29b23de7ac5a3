//! Second-order ("extreme") gradient boosting with squared loss.
//!
//! Trees are grown on gradient statistics: for squared loss every row has
//! gradient `g = F(x) - y` and hessian `h = 1`. A split is scored as
//!
//! ```text
//! gain = ½ [G_L²/(H_L+λ) + G_R²/(H_R+λ) - G²/(H+λ)] - γ
//! ```
//!
//! and a leaf gets weight `-G/(H+λ)`, shrunk by the learning rate.

use super::tree::{traverse, validate_nodes, TreeNode};
use super::{validate_training_data, InferenceModel, ModelError, TrainableModel};
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

const MIN_GAIN: f64 = 1e-12;

/// Extreme gradient boosting hyperparameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XgbRegressor {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// L2 penalty on leaf weights.
    pub reg_lambda: f64,
    /// Minimum loss reduction to make a split.
    pub gamma: f64,
    /// Minimum hessian sum per child.
    pub min_child_weight: f64,
    /// Starting prediction; `None` uses the target mean.
    pub base_score: Option<f64>,
}

impl Default for XgbRegressor {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            reg_lambda: 1.0,
            gamma: 0.0,
            min_child_weight: 1.0,
            base_score: None,
        }
    }
}

impl XgbRegressor {
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

    pub fn with_reg_lambda(mut self, reg_lambda: f64) -> Self {
        self.reg_lambda = reg_lambda;
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }
}

impl TrainableModel for XgbRegressor {
    type Output = FittedXgb;

    fn fit(&self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<FittedXgb, ModelError> {
        validate_training_data(x, y)?;
        if self.n_estimators == 0 {
            return Err(ModelError::InvalidParameter(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0) || self.reg_lambda < 0.0 || self.gamma < 0.0 {
            return Err(ModelError::InvalidParameter(
                "learning_rate must be positive; reg_lambda and gamma non-negative".to_string(),
            ));
        }

        let n_samples = x.nrows();
        let base_score = self.base_score.unwrap_or_else(|| y.mean().unwrap_or(0.0));
        let mut predictions = Array1::from_elem(n_samples, base_score);
        let mut trees = Vec::with_capacity(self.n_estimators);

        for _ in 0..self.n_estimators {
            let gradients = &predictions - &y;
            let mut builder = XgbTreeBuilder {
                x: x.view(),
                gradients: gradients.view(),
                params: self,
                nodes: Vec::new(),
            };
            builder.grow((0..n_samples).collect(), 0);

            for (pred, row) in predictions.iter_mut().zip(x.rows()) {
                *pred += traverse(&builder.nodes, row);
            }
            trees.push(builder.nodes);
        }

        Ok(FittedXgb {
            base_score,
            trees,
            n_features: x.ncols(),
        })
    }
}

struct XgbTreeBuilder<'a> {
    x: ArrayView2<'a, f64>,
    gradients: ArrayView1<'a, f64>,
    params: &'a XgbRegressor,
    nodes: Vec<TreeNode>,
}

impl XgbTreeBuilder<'_> {
    /// Hessians are all 1 under squared loss, so `H` is the row count.
    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let lambda = self.params.reg_lambda;
        let g_sum: f64 = indices.iter().map(|&i| self.gradients[i]).sum();
        let h_sum = indices.len() as f64;

        let slot = self.nodes.len();
        self.nodes.push(TreeNode::Leaf {
            value: -g_sum / (h_sum + lambda) * self.params.learning_rate,
            n_samples: indices.len(),
        });

        if depth >= self.params.max_depth || indices.len() < 2 {
            return slot;
        }
        let Some((feature, threshold)) = self.best_split(&indices, g_sum, h_sum) else {
            return slot;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[[i, feature]] <= threshold);
        let left = self.grow(left_idx, depth + 1);
        let right = self.grow(right_idx, depth + 1);
        self.nodes[slot] = TreeNode::Split {
            feature,
            threshold,
            left,
            right,
        };
        slot
    }

    fn best_split(&self, indices: &[usize], g_sum: f64, h_sum: f64) -> Option<(usize, f64)> {
        let lambda = self.params.reg_lambda;
        let min_child = self.params.min_child_weight;
        let parent = g_sum * g_sum / (h_sum + lambda);
        let mut best: Option<(usize, f64, f64)> = None;
        let mut order = indices.to_vec();

        for feature in 0..self.x.ncols() {
            order.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));
            let mut g_left = 0.0;
            for k in 1..order.len() {
                g_left += self.gradients[order[k - 1]];
                let h_left = k as f64;
                let h_right = h_sum - h_left;
                if h_left < min_child || h_right < min_child {
                    continue;
                }
                let lo = self.x[[order[k - 1], feature]];
                let hi = self.x[[order[k], feature]];
                if lo >= hi {
                    continue;
                }
                let g_right = g_sum - g_left;
                let gain = 0.5
                    * (g_left * g_left / (h_left + lambda) + g_right * g_right / (h_right + lambda)
                        - parent)
                    - self.params.gamma;
                if gain > MIN_GAIN && best.map_or(true, |(_, _, b)| gain > b) {
                    let mid = lo + (hi - lo) / 2.0;
                    best = Some((feature, if mid < hi { mid } else { lo }, gain));
                }
            }
        }
        best.map(|(feature, threshold, _)| (feature, threshold))
    }
}

/// Fitted extreme gradient boosting ensemble.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FittedXgb {
    base_score: f64,
    trees: Vec<Vec<TreeNode>>,
    n_features: usize,
}

impl FittedXgb {
    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if !self.base_score.is_finite() {
            return Err(ModelError::InvalidState("base score must be finite".to_string()));
        }
        self.trees
            .iter()
            .try_for_each(|nodes| validate_nodes(nodes, self.n_features))
    }
}

impl InferenceModel for FittedXgb {
    fn n_features_in(&self) -> usize {
        self.n_features
    }

    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.base_score + self.trees.iter().map(|t| traverse(t, row)).sum::<f64>()
    }
}
