//! Two-stage hybrid: a trend model on the time index, a second model on the
//! residuals.

use crate::error::{ForecastError, Result};
use crate::estimators::Regressor;
use crate::features::steps::TIME_COLUMN;
use crate::models::{clamp_non_negative, ForecastingModel, InputShape};
use crate::split::target_values;
use crate::table::{design_matrix, numeric_column_names};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// `trend` learns sales from `time` alone; `residual` learns what the trend
/// misses from every numeric feature. Forecast is the sum of both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedHybrid<T, R> {
    trend: T,
    residual: R,
    feature_names: Vec<String>,
    fitted: bool,
}

impl<T: Regressor, R: Regressor> BoostedHybrid<T, R> {
    pub fn new(trend: T, residual: R) -> Self {
        Self {
            trend,
            residual,
            feature_names: Vec::new(),
            fitted: false,
        }
    }

    pub fn trend(&self) -> &T {
        &self.trend
    }

    pub fn residual(&self) -> &R {
        &self.residual
    }

    fn time_matrix(x: &DataFrame) -> Result<nalgebra::DMatrix<f64>> {
        if x.column(TIME_COLUMN).is_err() {
            return Err(ForecastError::ConfigError(format!(
                "boosted hybrid needs the '{}' feature; enable the index step",
                TIME_COLUMN
            )));
        }
        design_matrix(x, &[TIME_COLUMN.to_string()])
    }
}

impl<T: Regressor, R: Regressor> ForecastingModel for BoostedHybrid<T, R> {
    fn fit_data(&mut self, x: &DataFrame, y: &DataFrame) -> Result<()> {
        let target = target_values(y)?;
        if target.len() != x.height() {
            return Err(ForecastError::DataError(format!(
                "X has {} rows, Y has {}",
                x.height(),
                target.len()
            )));
        }

        let time = Self::time_matrix(x)?;
        self.trend.fit(&time, &target)?;
        let trend = self.trend.predict(&time)?;
        let residuals: Vec<f64> = target.iter().zip(&trend).map(|(y, t)| y - t).collect();

        let names = numeric_column_names(x);
        let features = design_matrix(x, &names)?;
        self.residual.fit(&features, &residuals)?;

        log::info!(
            "Fitted boosted hybrid ({} + {}) on {} rows x {} features",
            self.trend.name(),
            self.residual.name(),
            x.height(),
            names.len()
        );
        self.feature_names = names;
        self.fitted = true;
        Ok(())
    }

    fn forecast_data(&self, x: &DataFrame) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(ForecastError::NotFitted(self.name().to_string()));
        }
        let trend = self.trend.predict(&Self::time_matrix(x)?)?;
        let residual = self
            .residual
            .predict(&design_matrix(x, &self.feature_names)?)?;
        Ok(clamp_non_negative(
            trend.iter().zip(&residual).map(|(t, r)| t + r).collect(),
        ))
    }

    fn input_shape(&self) -> InputShape {
        InputShape::Flat
    }

    fn name(&self) -> &str {
        "BoostedHybrid"
    }
}
