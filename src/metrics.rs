//! Regression metrics used for scoring candidates.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Coefficient of determination.
///
/// R² = 1 - (SS_res / SS_tot). When the targets have zero variance the score
/// is 1.0 for a perfect prediction and 0.0 otherwise. Empty input scores 0.0.
pub fn r2_score(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> f64 {
    debug_assert_eq!(y_true.len(), y_pred.len());
    if y_true.is_empty() {
        return 0.0;
    }

    let mean_true = y_true.sum() / y_true.len() as f64;
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&t, &p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|&t| (t - mean_true).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }

    1.0 - ss_res / ss_tot
}

/// Mean squared error.
pub fn mse(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let sum: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&t, &p)| (t - p).powi(2))
        .sum();
    sum / y_true.len() as f64
}

/// Root mean squared error.
pub fn rmse(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> f64 {
    mse(y_true, y_pred).sqrt()
}

/// Mean absolute error.
pub fn mae(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let sum: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&t, &p)| (t - p).abs())
        .sum();
    sum / y_true.len() as f64
}

/// All regression metrics at once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r_squared: f64,
}

impl RegressionMetrics {
    pub fn calculate(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> Self {
        let mse = mse(y_true, y_pred);
        Self {
            mse,
            rmse: mse.sqrt(),
            mae: mae(y_true, y_pred),
            r_squared: r2_score(y_true, y_pred),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_r2_perfect() {
        let y = array![1.0, 2.0, 3.0, 4.0];
        assert!((r2_score(y.view(), y.view()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_r2_mean_predictor_is_zero() {
        let y_true = array![1.0, 2.0, 3.0, 4.0];
        let y_pred = array![2.5, 2.5, 2.5, 2.5];
        assert!(r2_score(y_true.view(), y_pred.view()).abs() < 1e-12);
    }

    #[test]
    fn test_r2_can_be_negative() {
        let y_true = array![1.0, 2.0, 3.0];
        let y_pred = array![3.0, 2.0, 1.0];
        assert!(r2_score(y_true.view(), y_pred.view()) < 0.0);
    }

    #[test]
    fn test_r2_constant_targets() {
        let y_true = array![2.0, 2.0, 2.0];
        assert_eq!(r2_score(y_true.view(), array![2.0, 2.0, 2.0].view()), 1.0);
        assert_eq!(r2_score(y_true.view(), array![2.0, 3.0, 2.0].view()), 0.0);
    }

    #[test]
    fn test_mse_and_mae() {
        let y_true = array![1.0, 2.0, 3.0, 4.0];
        let y_pred = array![2.0, 3.0, 4.0, 5.0];
        assert!((mse(y_true.view(), y_pred.view()) - 1.0).abs() < 1e-12);
        assert!((mae(y_true.view(), y_pred.view()) - 1.0).abs() < 1e-12);
        assert!((rmse(y_true.view(), y_pred.view()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_calculate_all() {
        let y = array![1.0, 2.0, 3.0];
        let metrics = RegressionMetrics::calculate(y.view(), y.view());
        assert_eq!(metrics.mse, 0.0);
        assert_eq!(metrics.mae, 0.0);
        assert!((metrics.r_squared - 1.0).abs() < 1e-12);
    }
}
