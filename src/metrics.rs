//! Forecast evaluation

use crate::error::{ForecastError, Result};
use statrs::statistics::Statistics;

/// Root mean squared logarithmic error,
/// `sqrt(mean((ln(1 + pred) - ln(1 + true))^2))`.
///
/// Both inputs must be non-empty, equally long and non-negative.
pub fn evaluate_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(ForecastError::MetricError(format!(
            "{} true values, {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }
    if y_true.is_empty() {
        return Err(ForecastError::MetricError("no values to evaluate".to_string()));
    }
    if y_true.iter().chain(y_pred).any(|v| *v < 0.0 || v.is_nan()) {
        return Err(ForecastError::MetricError(
            "RMSLE is undefined for negative or NaN values".to_string(),
        ));
    }

    let squared: Vec<f64> = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (p.ln_1p() - t.ln_1p()).powi(2))
        .collect();
    Ok(squared.iter().mean().sqrt())
}
