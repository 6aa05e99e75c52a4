//! Boosted trees over lagged target values, forecast recursively.
//!
//! Feature row at time `t`: `[y_{t-1}, ..., y_{t-lags}, c_t...]` where `c_t`
//! are the series covariates at `t` (promotions, calendar dummies, oil
//! price). When forecasting, each prediction becomes the newest lag for the
//! next step and covariates come from the forecast window.

use crate::error::{ForecastError, Result};
use crate::estimators::{BoostingConfig, GradientBoostedTrees, Regressor, SeriesForecaster};
use crate::split::Series;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Settings from the `lightgbm` config section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaggedBoosterConfig {
    pub lags: usize,
    /// Append series covariates to the lag features
    pub use_covariates: bool,
    pub boosting: BoostingConfig,
}

impl Default for LaggedBoosterConfig {
    fn default() -> Self {
        Self {
            lags: 7,
            use_covariates: true,
            boosting: BoostingConfig {
                n_estimators: 50,
                max_depth: 3,
                min_samples_leaf: 5,
                ..BoostingConfig::default()
            },
        }
    }
}

/// Per-series lag regressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaggedBooster {
    config: LaggedBoosterConfig,
    booster: GradientBoostedTrees,
    /// Last `lags` training targets, oldest first
    history: Vec<f64>,
    /// One per training position; the first `lags` repeat the first fit
    fitted_values: Vec<f64>,
    covariate_names: Vec<String>,
    fitted: bool,
}

impl LaggedBooster {
    pub fn new(config: LaggedBoosterConfig) -> Self {
        let booster = GradientBoostedTrees::new(config.boosting.clone());
        Self {
            config,
            booster,
            history: Vec::new(),
            fitted_values: Vec::new(),
            covariate_names: Vec::new(),
            fitted: false,
        }
    }

    pub fn config(&self) -> &LaggedBoosterConfig {
        &self.config
    }

    fn feature_row(&self, lags: &[f64], series: &Series, t: usize) -> Vec<f64> {
        let mut row: Vec<f64> = lags.iter().rev().take(self.config.lags).copied().collect();
        if self.config.use_covariates {
            row.extend(series.covariate_row(t));
        }
        row
    }
}

impl Default for LaggedBooster {
    fn default() -> Self {
        Self::new(LaggedBoosterConfig::default())
    }
}

impl SeriesForecaster for LaggedBooster {
    fn fit(&mut self, series: &Series) -> Result<()> {
        let lags = self.config.lags;
        if lags == 0 {
            return Err(ForecastError::ConfigError("lags must be at least 1".to_string()));
        }
        let values = series.target().ok_or_else(|| {
            ForecastError::EstimatorError(format!("series {} has no target", series.key()))
        })?;
        if values.len() <= lags {
            return Err(ForecastError::EstimatorError(format!(
                "series {} has {} observations, {} lags need at least {}",
                series.key(),
                values.len(),
                lags,
                lags + 1
            )));
        }

        let rows: Vec<Vec<f64>> = (lags..values.len())
            .map(|t| self.feature_row(&values[t - lags..t], series, t))
            .collect();
        let n_features = rows[0].len();
        let x = DMatrix::from_fn(rows.len(), n_features, |r, c| rows[r][c]);

        self.booster.fit(&x, &values[lags..])?;
        let fitted = self.booster.predict(&x)?;
        self.fitted_values = std::iter::repeat(fitted[0])
            .take(lags)
            .chain(fitted)
            .collect();
        self.history = values[values.len() - lags..].to_vec();
        self.covariate_names = if self.config.use_covariates {
            series.covariate_names().to_vec()
        } else {
            Vec::new()
        };
        self.fitted = true;
        Ok(())
    }

    fn forecast(&self, series: &Series) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(ForecastError::NotFitted(self.name().to_string()));
        }
        let same_covariates = series.covariate_names() == self.covariate_names.as_slice();
        if self.config.use_covariates && !same_covariates {
            return Err(ForecastError::DataError(format!(
                "series {} covariates {:?} differ from training covariates {:?}",
                series.key(),
                series.covariate_names(),
                self.covariate_names
            )));
        }

        let predictor = self.booster.predictor()?;
        let mut history = self.history.clone();
        let mut forecast = Vec::with_capacity(series.len());
        for t in 0..series.len() {
            let row = self.feature_row(&history, series, t);
            let value = predictor.predict_rows(row, 1)?[0];
            history.push(value);
            forecast.push(value);
        }
        Ok(forecast)
    }

    fn in_sample(&self) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(ForecastError::NotFitted(self.name().to_string()));
        }
        Ok(self.fitted_values.clone())
    }

    fn name(&self) -> &str {
        "LaggedBooster"
    }
}
