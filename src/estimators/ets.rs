//! Exponential smoothing through augurs' automatic ETS selection.
//!
//! Error, trend and season components are picked by AICc. A seasonal model
//! is only tried when the series spans two full seasons; if it fails to fit
//! the non-seasonal search is used instead. augurs models are not
//! serializable, so the training history is kept and refitted on forecast.

use crate::error::{ForecastError, Result};
use crate::estimators::SeriesForecaster;
use crate::split::Series;
use augurs::ets::AutoETS;
use augurs::prelude::*;
use serde::{Deserialize, Serialize};

/// Settings from the `exponential-smoothing` config section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExponentialSmoothingConfig {
    /// Season length in days
    pub seasonal_periods: usize,
}

impl Default for ExponentialSmoothingConfig {
    fn default() -> Self {
        Self {
            seasonal_periods: 7,
        }
    }
}

const MIN_OBSERVATIONS: usize = 3;

/// Automatic ETS forecaster for one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExponentialSmoothing {
    config: ExponentialSmoothingConfig,
    history: Vec<f64>,
    fitted_values: Vec<f64>,
    seasonal: bool,
}

impl ExponentialSmoothing {
    pub fn new(config: ExponentialSmoothingConfig) -> Self {
        Self {
            config,
            history: Vec::new(),
            fitted_values: Vec::new(),
            seasonal: false,
        }
    }

    pub fn config(&self) -> &ExponentialSmoothingConfig {
        &self.config
    }

    /// Whether the last fit used a seasonal component
    pub fn is_seasonal(&self) -> bool {
        self.seasonal
    }

    /// Forecast `horizon` steps past the training data
    pub fn predict(&self, horizon: usize) -> Result<Vec<f64>> {
        if self.history.is_empty() {
            return Err(ForecastError::NotFitted(self.name().to_string()));
        }
        if horizon == 0 {
            return Ok(Vec::new());
        }
        if let Some(value) = constant_value(&self.history) {
            return Ok(vec![value; horizon]);
        }

        let (season, spec) = self.components();
        let fitted = auto_ets(season, spec)?
            .fit(&self.history)
            .map_err(|e| estimator_error("fit", e))?;
        let forecast = fitted
            .predict(horizon, None::<f64>)
            .map_err(|e| estimator_error("predict", e))?;
        Ok(forecast.point)
    }

    fn components(&self) -> (usize, &'static str) {
        if self.seasonal {
            (self.config.seasonal_periods, "ZZZ")
        } else {
            (1, "ZZN")
        }
    }

    fn can_be_seasonal(&self, n: usize) -> bool {
        let m = self.config.seasonal_periods;
        m > 1 && n >= 2 * m
    }
}

impl Default for ExponentialSmoothing {
    fn default() -> Self {
        Self::new(ExponentialSmoothingConfig::default())
    }
}

fn auto_ets(season: usize, spec: &str) -> Result<AutoETS> {
    AutoETS::new(season, spec).map_err(|e| estimator_error("init", e))
}

fn estimator_error(stage: &str, err: impl std::fmt::Display) -> ForecastError {
    ForecastError::EstimatorError(format!("ETS {}: {}", stage, err))
}

/// augurs rejects series with no variance
fn constant_value(values: &[f64]) -> Option<f64> {
    let first = *values.first()?;
    values.iter().all(|&v| v == first).then_some(first)
}

/// One-step-ahead fitted values for `values`
fn in_sample_fit(values: &[f64], season: usize, spec: &str) -> Result<Vec<f64>> {
    let fitted = auto_ets(season, spec)?
        .fit(values)
        .map_err(|e| estimator_error("fit", e))?;
    let in_sample = fitted
        .predict_in_sample(None::<f64>)
        .map_err(|e| estimator_error("in-sample", e))?;
    Ok(in_sample.point)
}

impl SeriesForecaster for ExponentialSmoothing {
    fn fit(&mut self, series: &Series) -> Result<()> {
        let values = series.target().ok_or_else(|| {
            ForecastError::EstimatorError(format!("series {} has no target", series.key()))
        })?;
        if values.len() < MIN_OBSERVATIONS {
            return Err(ForecastError::EstimatorError(format!(
                "series {} has {} observations, exponential smoothing needs {}",
                series.key(),
                values.len(),
                MIN_OBSERVATIONS
            )));
        }

        if let Some(value) = constant_value(values) {
            self.seasonal = false;
            self.fitted_values = vec![value; values.len()];
            self.history = values.to_vec();
            return Ok(());
        }

        let seasonal_fit = if self.can_be_seasonal(values.len()) {
            match in_sample_fit(values, self.config.seasonal_periods, "ZZZ") {
                Ok(fitted) => Some(fitted),
                Err(e) => {
                    log::warn!(
                        "Seasonal ETS failed on series {} ({}), fitting without seasonality",
                        series.key(),
                        e
                    );
                    None
                }
            }
        } else {
            log::debug!(
                "Series {} shorter than two seasons, fitting without seasonality",
                series.key()
            );
            None
        };

        self.seasonal = seasonal_fit.is_some();
        self.fitted_values = match seasonal_fit {
            Some(fitted) => fitted,
            None => in_sample_fit(values, 1, "ZZN")?,
        };
        self.history = values.to_vec();
        Ok(())
    }

    fn in_sample(&self) -> Result<Vec<f64>> {
        if self.history.is_empty() {
            return Err(ForecastError::NotFitted(self.name().to_string()));
        }
        Ok(self.fitted_values.clone())
    }

    fn forecast(&self, series: &Series) -> Result<Vec<f64>> {
        self.predict(series.len())
    }

    fn name(&self) -> &str {
        "ExponentialSmoothing"
    }
}
