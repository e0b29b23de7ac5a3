//! Ordinary least squares linear regression.
//!
//! Solved in closed form through the normal equations `(XᵀX) w = Xᵀy` on
//! centered data with a Cholesky factorization. One-hot blocks make `XᵀX`
//! singular, so a small ridge term is added to the diagonal and increased
//! until the factorization succeeds.

use super::{validate_training_data, InferenceModel, ModelError, TrainableModel};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

const INITIAL_JITTER: f64 = 1e-10;
const MAX_JITTER_STEPS: usize = 8;

/// Linear regression hyperparameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearRegression {
    pub fit_intercept: bool,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self {
            fit_intercept: true,
        }
    }
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }
}

impl TrainableModel for LinearRegression {
    type Output = FittedLinearRegression;

    fn fit(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
    ) -> Result<FittedLinearRegression, ModelError> {
        validate_training_data(x, y)?;
        let n_features = x.ncols();

        let (x_mean, y_mean) = if self.fit_intercept {
            (
                x.mean_axis(Axis(0))
                    .unwrap_or_else(|| Array1::zeros(n_features)),
                y.mean().unwrap_or(0.0),
            )
        } else {
            (Array1::zeros(n_features), 0.0)
        };

        let xc = &x - &x_mean;
        let yc = &y - y_mean;

        let gram = xc.t().dot(&xc);
        let rhs = xc.t().dot(&yc);
        let weights = solve_spd(&gram, &rhs)?;
        let intercept = y_mean - x_mean.dot(&weights);

        if !intercept.is_finite() || weights.iter().any(|w| !w.is_finite()) {
            return Err(ModelError::Numerical(
                "least squares produced non-finite coefficients".to_string(),
            ));
        }

        Ok(FittedLinearRegression { weights, intercept })
    }
}

/// Solve `a w = b` for symmetric positive semi-definite `a`.
fn solve_spd(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, ModelError> {
    let n = a.nrows();
    if n == 0 {
        return Ok(Array1::zeros(0));
    }
    let scale = (a.diag().sum() / n as f64).max(1.0);
    let mut jitter = INITIAL_JITTER * scale;

    for _ in 0..MAX_JITTER_STEPS {
        let mut regularized = a.clone();
        regularized.diag_mut().mapv_inplace(|d| d + jitter);
        if let Some(l) = cholesky(&regularized) {
            return Ok(cholesky_solve(&l, b));
        }
        jitter *= 100.0;
    }
    Err(ModelError::Numerical(
        "normal equations are not positive definite".to_string(),
    ))
}

/// Lower-triangular `L` with `L Lᵀ = a`, or `None` if `a` is not positive definite.
fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let dot: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let d = a[[i, i]] - dot;
                if d <= 0.0 || !d.is_finite() {
                    return None;
                }
                l[[i, i]] = d.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - dot) / l[[j, j]];
            }
        }
    }
    Some(l)
}

fn cholesky_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();
    // forward: L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let dot: f64 = (0..i).map(|k| l[[i, k]] * z[k]).sum();
        z[i] = (b[i] - dot) / l[[i, i]];
    }
    // backward: Lᵀ w = z
    let mut w = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let dot: f64 = (i + 1..n).map(|k| l[[k, i]] * w[k]).sum();
        w[i] = (z[i] - dot) / l[[i, i]];
    }
    w
}

/// Fitted linear model: `y = x · weights + intercept`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FittedLinearRegression {
    weights: Array1<f64>,
    intercept: f64,
}

impl FittedLinearRegression {
    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if !self.intercept.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            return Err(ModelError::InvalidState(
                "linear coefficients must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

impl InferenceModel for FittedLinearRegression {
    fn n_features_in(&self) -> usize {
        self.weights.len()
    }

    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        row.dot(&self.weights) + self.intercept
    }

    fn predict_batch(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        if x.ncols() != self.weights.len() {
            return Err(ModelError::ShapeMismatch {
                expected: self.weights.len(),
                got: x.ncols(),
            });
        }
        Ok(x.dot(&self.weights) + self.intercept)
    }
}
