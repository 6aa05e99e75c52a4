//! Ordinary least squares over the flat feature table

use crate::error::{ForecastError, Result};
use crate::estimators::{OrdinaryLeastSquares, Regressor};
use crate::models::{clamp_non_negative, ForecastingModel, InputShape};
use crate::split::target_values;
use crate::table::{design_matrix, numeric_column_names};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Linear regression on every numeric column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearRegressor {
    /// Columns seen at fit time, in order
    feature_names: Vec<String>,
    ols: OrdinaryLeastSquares,
}

impl LinearRegressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn estimator(&self) -> &OrdinaryLeastSquares {
        &self.ols
    }
}

impl ForecastingModel for LinearRegressor {
    fn fit_data(&mut self, x: &DataFrame, y: &DataFrame) -> Result<()> {
        let names = numeric_column_names(x);
        let target = target_values(y)?;
        if target.len() != x.height() {
            return Err(ForecastError::DataError(format!(
                "X has {} rows, Y has {}",
                x.height(),
                target.len()
            )));
        }

        let matrix = design_matrix(x, &names)?;
        self.ols.fit(&matrix, &target)?;
        log::info!(
            "Fitted linear regression on {} rows x {} features",
            x.height(),
            names.len()
        );
        self.feature_names = names;
        Ok(())
    }

    fn forecast_data(&self, x: &DataFrame) -> Result<Vec<f64>> {
        let matrix = design_matrix(x, &self.feature_names)?;
        Ok(clamp_non_negative(self.ols.predict(&matrix)?))
    }

    fn input_shape(&self) -> InputShape {
        InputShape::Flat
    }

    fn name(&self) -> &str {
        "LinearRegressor"
    }
}
