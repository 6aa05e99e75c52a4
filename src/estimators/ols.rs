//! Ordinary least squares with intercept.
//!
//! The normal equations `[1 X]^T [1 X] β = [1 X]^T y` are formed directly
//! (the Gram matrix is only `p+1` square, independent of the row count) and
//! solved through SVD. One-hot blocks plus an intercept are collinear, so the
//! solve uses a pseudo-inverse: singular values below a tolerance relative to
//! the largest one are treated as zero, which yields the minimum-norm solution.

use crate::error::{ForecastError, Result};
use crate::estimators::Regressor;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Least squares regressor `y ≈ b0 + X b`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrdinaryLeastSquares {
    intercept: f64,
    coefficients: Option<Vec<f64>>,
}

impl OrdinaryLeastSquares {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn coefficients(&self) -> Option<&[f64]> {
        self.coefficients.as_deref()
    }
}

/// Solve `g β = b` for a symmetric positive semi-definite `g`.
///
/// Returns `None` if no finite solution is found.
fn solve_normal_equations(g: DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = g.svd(true, true);
    let max_sv = svd.singular_values.max();
    if max_sv <= 0.0 {
        return Some(DVector::zeros(b.len()));
    }

    // Progressively looser relative tolerances.
    for &rel_tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(b, rel_tol * max_sv) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

impl Regressor for OrdinaryLeastSquares {
    fn fit(&mut self, x: &DMatrix<f64>, y: &[f64]) -> Result<()> {
        let (n, p) = x.shape();
        if n == 0 {
            return Err(ForecastError::EstimatorError(
                "least squares needs at least one observation".to_string(),
            ));
        }
        if y.len() != n {
            return Err(ForecastError::EstimatorError(format!(
                "least squares: {} rows in X, {} targets",
                n,
                y.len()
            )));
        }

        let yv = DVector::from_column_slice(y);
        let xtx = x.tr_mul(x);
        let xty = x.tr_mul(&yv);
        let col_sums = x.row_sum();

        let k = p + 1;
        let mut g = DMatrix::<f64>::zeros(k, k);
        let mut b = DVector::<f64>::zeros(k);
        g[(0, 0)] = n as f64;
        b[0] = yv.sum();
        for j in 0..p {
            g[(0, j + 1)] = col_sums[j];
            g[(j + 1, 0)] = col_sums[j];
            b[j + 1] = xty[j];
            for i in 0..p {
                g[(i + 1, j + 1)] = xtx[(i, j)];
            }
        }

        let beta = solve_normal_equations(g, &b).ok_or_else(|| {
            ForecastError::EstimatorError("least squares system is ill-conditioned".to_string())
        })?;

        self.intercept = beta[0];
        self.coefficients = Some(beta.iter().skip(1).copied().collect());
        Ok(())
    }

    fn predict(&self, x: &DMatrix<f64>) -> Result<Vec<f64>> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or_else(|| ForecastError::NotFitted(self.name().to_string()))?;
        if x.ncols() != coefficients.len() {
            return Err(ForecastError::EstimatorError(format!(
                "least squares fitted on {} features, got {}",
                coefficients.len(),
                x.ncols()
            )));
        }

        let beta = DVector::from_column_slice(coefficients);
        let fitted = x * beta;
        Ok(fitted.iter().map(|v| v + self.intercept).collect())
    }

    fn name(&self) -> &str {
        "OrdinaryLeastSquares"
    }
}
