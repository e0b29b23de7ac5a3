//! CART decision tree regressor.
//!
//! Trees are stored as a flat node arena (root at index 0) so they serialize
//! without recursion. Splits are exact: every feature is sorted per node and
//! every boundary between distinct values is scored. Thresholds are midpoints;
//! samples with `x <= threshold` go left.

use super::{validate_training_data, InferenceModel, ModelError, TrainableModel};
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;

const MIN_IMPROVEMENT: f64 = 1e-12;

/// Function measuring the quality of a split.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitCriterion {
    /// Variance reduction; leaves predict the mean.
    #[default]
    SquaredError,
    /// Variance reduction with Friedman's improvement score.
    FriedmanMse,
    /// Mean absolute error reduction; leaves predict the median.
    AbsoluteError,
    /// Half Poisson deviance reduction. Targets must be non-negative.
    Poisson,
}

impl fmt::Display for SplitCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SplitCriterion::SquaredError => "squared_error",
            SplitCriterion::FriedmanMse => "friedman_mse",
            SplitCriterion::AbsoluteError => "absolute_error",
            SplitCriterion::Poisson => "poisson",
        })
    }
}

/// Decision tree hyperparameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionTreeRegressor {
    pub criterion: SplitCriterion,
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self {
            criterion: SplitCriterion::SquaredError,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

impl DecisionTreeRegressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Grow a tree on the rows listed in `indices` (repeats allowed).
    ///
    /// Callers validate `x` and `y` beforehand.
    pub(crate) fn fit_indices(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        indices: Vec<usize>,
    ) -> Result<FittedDecisionTree, ModelError> {
        if self.min_samples_leaf == 0 || self.min_samples_split < 2 {
            return Err(ModelError::InvalidParameter(
                "min_samples_leaf must be >= 1 and min_samples_split >= 2".to_string(),
            ));
        }
        if indices.is_empty() {
            return Err(ModelError::EmptyData);
        }
        if self.criterion == SplitCriterion::Poisson {
            if indices.iter().any(|&i| y[i] < 0.0) {
                return Err(ModelError::InvalidTarget(
                    "poisson criterion requires non-negative targets".to_string(),
                ));
            }
            if indices.iter().map(|&i| y[i]).sum::<f64>() <= 0.0 {
                return Err(ModelError::InvalidTarget(
                    "poisson criterion requires a positive target sum".to_string(),
                ));
            }
        }

        let mut builder = TreeBuilder {
            x: x.view(),
            y: y.view(),
            params: self,
            nodes: Vec::new(),
        };
        builder.grow(indices, 0);

        Ok(FittedDecisionTree {
            nodes: builder.nodes,
            n_features: x.ncols(),
        })
    }
}

impl TrainableModel for DecisionTreeRegressor {
    type Output = FittedDecisionTree;

    fn fit(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
    ) -> Result<FittedDecisionTree, ModelError> {
        validate_training_data(x, y)?;
        self.fit_indices(x, y, (0..x.nrows()).collect())
    }
}

/// A node in the flat tree arena.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Internal decision node; `left`/`right` index into the arena.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf { value: f64, n_samples: usize },
}

/// Walk the arena from the root and return the leaf value.
pub(crate) fn traverse(nodes: &[TreeNode], row: ArrayView1<'_, f64>) -> f64 {
    let mut idx = 0;
    loop {
        match &nodes[idx] {
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => idx = if row[*feature] <= *threshold { *left } else { *right },
            TreeNode::Leaf { value, .. } => return *value,
        }
    }
}

/// Check an arena for out-of-range indices and non-finite values.
///
/// Children always sit after their parent, which also rules out cycles.
pub(crate) fn validate_nodes(nodes: &[TreeNode], n_features: usize) -> Result<(), ModelError> {
    if nodes.is_empty() {
        return Err(ModelError::InvalidState("tree has no nodes".to_string()));
    }
    for (idx, node) in nodes.iter().enumerate() {
        match *node {
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if feature >= n_features {
                    return Err(ModelError::InvalidState(format!(
                        "node {idx} splits on feature {feature} of {n_features}"
                    )));
                }
                if !threshold.is_finite() {
                    return Err(ModelError::InvalidState(format!(
                        "node {idx} has a non-finite threshold"
                    )));
                }
                for child in [left, right] {
                    if child <= idx || child >= nodes.len() {
                        return Err(ModelError::InvalidState(format!(
                            "node {idx} points at node {child} of {}",
                            nodes.len()
                        )));
                    }
                }
            }
            TreeNode::Leaf { value, .. } => {
                if !value.is_finite() {
                    return Err(ModelError::InvalidState(format!(
                        "leaf {idx} has a non-finite value"
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Fitted decision tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FittedDecisionTree {
    nodes: Vec<TreeNode>,
    n_features: usize,
}

impl FittedDecisionTree {
    #[cfg(test)]
    pub(crate) fn from_nodes(nodes: Vec<TreeNode>, n_features: usize) -> Self {
        Self { nodes, n_features }
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        validate_nodes(&self.nodes, self.n_features)
    }

    /// Validate as a member of an ensemble over `n_features` columns.
    pub(crate) fn validate_member(&self, n_features: usize) -> Result<(), ModelError> {
        if self.n_features != n_features {
            return Err(ModelError::InvalidState(format!(
                "member tree expects {} features, ensemble {n_features}",
                self.n_features
            )));
        }
        self.validate()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    /// Depth of the deepest leaf; a single leaf has depth 0.
    pub fn depth(&self) -> usize {
        fn depth_of(nodes: &[TreeNode], idx: usize) -> usize {
            match &nodes[idx] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => {
                    1 + depth_of(nodes, *left).max(depth_of(nodes, *right))
                }
            }
        }
        depth_of(&self.nodes, 0)
    }
}

impl InferenceModel for FittedDecisionTree {
    fn n_features_in(&self) -> usize {
        self.n_features
    }

    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        traverse(&self.nodes, row)
    }
}

struct Split {
    feature: usize,
    threshold: f64,
    improvement: f64,
}

struct TreeBuilder<'a> {
    x: ArrayView2<'a, f64>,
    y: ArrayView1<'a, f64>,
    params: &'a DecisionTreeRegressor,
    nodes: Vec<TreeNode>,
}

impl TreeBuilder<'_> {
    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let slot = self.nodes.len();
        self.nodes.push(TreeNode::Leaf {
            value: self.leaf_value(&indices),
            n_samples: indices.len(),
        });

        if !self.can_split(&indices, depth) {
            return slot;
        }
        let Some(split) = self.best_split(&indices) else {
            return slot;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[[i, split.feature]] <= split.threshold);

        let left = self.grow(left_idx, depth + 1);
        let right = self.grow(right_idx, depth + 1);
        self.nodes[slot] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        slot
    }

    fn leaf_value(&self, indices: &[usize]) -> f64 {
        let mut values: Vec<f64> = indices.iter().map(|&i| self.y[i]).collect();
        match self.params.criterion {
            SplitCriterion::AbsoluteError => median(&mut values),
            _ => values.iter().sum::<f64>() / values.len() as f64,
        }
    }

    fn can_split(&self, indices: &[usize], depth: usize) -> bool {
        let n = indices.len();
        if n < self.params.min_samples_split || n < 2 * self.params.min_samples_leaf {
            return false;
        }
        if self.params.max_depth.is_some_and(|max| depth >= max) {
            return false;
        }
        let first = self.y[indices[0]];
        indices.iter().any(|&i| self.y[i] != first)
    }

    fn best_split(&self, indices: &[usize]) -> Option<Split> {
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf;
        let mut best: Option<Split> = None;
        let mut order = indices.to_vec();

        for feature in 0..self.x.ncols() {
            order.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));
            let ys: Vec<f64> = order.iter().map(|&i| self.y[i]).collect();
            let gains = split_gains(self.params.criterion, &ys);

            for k in min_leaf..=(n - min_leaf) {
                let lo = self.x[[order[k - 1], feature]];
                let hi = self.x[[order[k], feature]];
                if lo >= hi {
                    continue;
                }
                let Some(gain) = gains[k] else { continue };
                if gain > MIN_IMPROVEMENT && best.as_ref().map_or(true, |b| gain > b.improvement) {
                    let mid = lo + (hi - lo) / 2.0;
                    best = Some(Split {
                        feature,
                        threshold: if mid < hi { mid } else { lo },
                        improvement: gain,
                    });
                }
            }
        }
        best
    }
}

/// Improvement of splitting `ys` (already in feature order) before position `k`,
/// for every `k`. `None` marks a split the criterion cannot score.
fn split_gains(criterion: SplitCriterion, ys: &[f64]) -> Vec<Option<f64>> {
    let n = ys.len();
    let mut gains = vec![None; n + 1];
    match criterion {
        SplitCriterion::AbsoluteError => {
            let mut unique: Vec<f64> = ys.to_vec();
            unique.sort_by(|a, b| a.total_cmp(b));
            unique.dedup();
            let rank = |v: f64| unique.partition_point(|u| *u < v);

            let mut left = AbsDevTracker::new(&unique);
            let mut left_cost = vec![0.0; n + 1];
            for (k, &v) in ys.iter().enumerate() {
                left.insert(rank(v), v);
                left_cost[k + 1] = left.cost();
            }
            let mut right = AbsDevTracker::new(&unique);
            let mut right_cost = vec![0.0; n + 1];
            for k in (0..n).rev() {
                right.insert(rank(ys[k]), ys[k]);
                right_cost[k] = right.cost();
            }
            let parent = left_cost[n];
            for k in 1..n {
                gains[k] = Some(parent - (left_cost[k] + right_cost[k]));
            }
        }
        _ => {
            let total: f64 = ys.iter().sum();
            let nf = n as f64;
            let mut sum_left = 0.0;
            for k in 1..n {
                sum_left += ys[k - 1];
                let sum_right = total - sum_left;
                let (nl, nr) = (k as f64, (n - k) as f64);
                gains[k] = match criterion {
                    SplitCriterion::SquaredError => Some(
                        sum_left * sum_left / nl + sum_right * sum_right / nr - total * total / nf,
                    ),
                    SplitCriterion::FriedmanMse => {
                        let diff = sum_left / nl - sum_right / nr;
                        Some(nl * nr / nf * diff * diff)
                    }
                    SplitCriterion::Poisson if sum_left > 0.0 && sum_right > 0.0 => Some(
                        sum_left * (sum_left / nl).ln() + sum_right * (sum_right / nr).ln()
                            - total * (total / nf).ln(),
                    ),
                    _ => None,
                };
            }
        }
    }
    gains
}

/// Running sum of absolute deviations from the median, over a fixed value domain.
///
/// Fenwick trees over value ranks hold counts and sums, so inserting a value
/// and querying the cost are both logarithmic.
struct AbsDevTracker<'a> {
    values: &'a [f64],
    counts: Vec<usize>,
    sums: Vec<f64>,
    n: usize,
    total: f64,
}

impl<'a> AbsDevTracker<'a> {
    fn new(values: &'a [f64]) -> Self {
        Self {
            values,
            counts: vec![0; values.len() + 1],
            sums: vec![0.0; values.len() + 1],
            n: 0,
            total: 0.0,
        }
    }

    fn insert(&mut self, rank: usize, value: f64) {
        let mut i = rank + 1;
        while i < self.counts.len() {
            self.counts[i] += 1;
            self.sums[i] += value;
            i += i & i.wrapping_neg();
        }
        self.n += 1;
        self.total += value;
    }

    fn prefix(&self, rank: usize) -> (usize, f64) {
        let (mut count, mut sum) = (0, 0.0);
        let mut i = rank + 1;
        while i > 0 {
            count += self.counts[i];
            sum += self.sums[i];
            i -= i & i.wrapping_neg();
        }
        (count, sum)
    }

    /// Rank of the k-th smallest inserted value (1-based `k`).
    fn kth(&self, k: usize) -> usize {
        let mut pos = 0;
        let mut remaining = k;
        let mut step = self.counts.len().next_power_of_two();
        while step > 0 {
            let next = pos + step;
            if next < self.counts.len() && self.counts[next] < remaining {
                pos = next;
                remaining -= self.counts[next];
            }
            step >>= 1;
        }
        pos
    }

    fn cost(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        let rank = self.kth((self.n + 1) / 2);
        let median = self.values[rank];
        let (below, below_sum) = self.prefix(rank);
        let above = self.n - below;
        median * below as f64 - below_sum + (self.total - below_sum) - median * above as f64
    }
}

pub(crate) fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n == 0 {
        0.0
    } else if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    }
}
