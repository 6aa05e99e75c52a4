//! Forecasting model adapters
//!
//! Every adapter implements [`ForecastingModel`]: fit on a feature table and
//! a `sales` table, forecast one non-negative value per row. Flat adapters
//! fit one estimator over the whole table; split adapters fit one estimator
//! per store/family series through the [`Splitter`](crate::split::Splitter).

pub mod hybrid;
pub mod linear;
pub mod split_model;

pub use hybrid::BoostedHybrid;
pub use linear::LinearRegressor;
pub use split_model::{ExponentialSmoothingModel, LightGbmModel, SplitModel};

use crate::config::ModelConfig;
use crate::error::Result;
use crate::estimators::{
    ExponentialSmoothing, GradientBoostedTrees, LaggedBooster, OrdinaryLeastSquares,
};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Table layout a model expects from the feature generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputShape {
    /// Encoded features only; family and store become dummy columns
    Flat,
    /// Raw `date`, `store_nbr` and `family` kept for partitioning
    SplitBySeries,
}

/// Uniform fit/forecast contract
pub trait ForecastingModel: Send + Sync {
    /// Train in place on `x` and the `sales` table `y`
    fn fit_data(&mut self, x: &DataFrame, y: &DataFrame) -> Result<()>;

    /// One forecast per row of `x`, in row order, never negative
    fn forecast_data(&self, x: &DataFrame) -> Result<Vec<f64>>;

    /// Layout the model needs its features in
    fn input_shape(&self) -> InputShape;

    /// Model name for logs
    fn name(&self) -> &str;
}

/// Model named by `forecasting-model` in `model_configs.json`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastingModelKind {
    LinearRegression,
    BoostedHybrid,
    ExponentialSmoothing,
    LightGbm,
}

const FORECASTING_MODEL_TABLE: &[(&str, ForecastingModelKind)] = &[
    ("linear regression", ForecastingModelKind::LinearRegression),
    ("linear-regression", ForecastingModelKind::LinearRegression),
    ("boosted hybrid", ForecastingModelKind::BoostedHybrid),
    ("boosted-hybrid", ForecastingModelKind::BoostedHybrid),
    ("exponential smoothing", ForecastingModelKind::ExponentialSmoothing),
    ("exponential-smoothing", ForecastingModelKind::ExponentialSmoothing),
    ("lightgbm", ForecastingModelKind::LightGbm),
];

impl ForecastingModelKind {
    /// Used when the configured value is missing or unknown
    pub const DEFAULT: ForecastingModelKind = ForecastingModelKind::LinearRegression;

    /// Look up a configuration value, case-insensitively.
    pub fn lookup(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        FORECASTING_MODEL_TABLE
            .iter()
            .find(|(name, _)| *name == value)
            .map(|(_, kind)| *kind)
    }

    /// Resolve a configuration value, falling back to [`Self::DEFAULT`].
    pub fn from_config(value: &str) -> Self {
        Self::lookup(value).unwrap_or_else(|| {
            log::warn!(
                "Unknown forecasting-model '{}', using {}",
                value,
                Self::DEFAULT
            );
            Self::DEFAULT
        })
    }

    pub fn input_shape(&self) -> InputShape {
        match self {
            ForecastingModelKind::LinearRegression | ForecastingModelKind::BoostedHybrid => {
                InputShape::Flat
            }
            ForecastingModelKind::ExponentialSmoothing | ForecastingModelKind::LightGbm => {
                InputShape::SplitBySeries
            }
        }
    }

    /// Unfitted model with the settings from `config`
    pub fn build(&self, config: &ModelConfig) -> SalesModel {
        match self {
            ForecastingModelKind::LinearRegression => {
                SalesModel::LinearRegression(LinearRegressor::new())
            }
            ForecastingModelKind::BoostedHybrid => SalesModel::BoostedHybrid(BoostedHybrid::new(
                OrdinaryLeastSquares::new(),
                GradientBoostedTrees::new(config.boosted_hybrid.clone()),
            )),
            ForecastingModelKind::ExponentialSmoothing => SalesModel::ExponentialSmoothing(
                SplitModel::new(ExponentialSmoothing::new(config.exponential_smoothing.clone())),
            ),
            ForecastingModelKind::LightGbm => SalesModel::LightGbm(SplitModel::new(
                LaggedBooster::new(config.lightgbm.clone()),
            )),
        }
    }
}

impl fmt::Display for ForecastingModelKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ForecastingModelKind::LinearRegression => "Linear Regression",
            ForecastingModelKind::BoostedHybrid => "Boosted Hybrid",
            ForecastingModelKind::ExponentialSmoothing => "Exponential Smoothing",
            ForecastingModelKind::LightGbm => "LightGBM",
        };
        write!(f, "{}", name)
    }
}

/// Any adapter, in a form that can be written to and read from disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "model")]
pub enum SalesModel {
    LinearRegression(LinearRegressor),
    BoostedHybrid(BoostedHybrid<OrdinaryLeastSquares, GradientBoostedTrees>),
    ExponentialSmoothing(ExponentialSmoothingModel),
    LightGbm(LightGbmModel),
}

impl SalesModel {
    pub fn kind(&self) -> ForecastingModelKind {
        match self {
            SalesModel::LinearRegression(_) => ForecastingModelKind::LinearRegression,
            SalesModel::BoostedHybrid(_) => ForecastingModelKind::BoostedHybrid,
            SalesModel::ExponentialSmoothing(_) => ForecastingModelKind::ExponentialSmoothing,
            SalesModel::LightGbm(_) => ForecastingModelKind::LightGbm,
        }
    }

    fn inner(&self) -> &dyn ForecastingModel {
        match self {
            SalesModel::LinearRegression(m) => m,
            SalesModel::BoostedHybrid(m) => m,
            SalesModel::ExponentialSmoothing(m) => m,
            SalesModel::LightGbm(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ForecastingModel {
        match self {
            SalesModel::LinearRegression(m) => m,
            SalesModel::BoostedHybrid(m) => m,
            SalesModel::ExponentialSmoothing(m) => m,
            SalesModel::LightGbm(m) => m,
        }
    }

    /// Write the model as JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(self)?;
        fs::write(path, json)?;
        log::info!("Saved {} model to {}", self.kind(), path.display());
        Ok(())
    }

    /// Read a model written by [`SalesModel::save`]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(crate::error::ForecastError::MissingInput {
                path: path.to_path_buf(),
            });
        }
        let json = fs::read_to_string(path)?;
        let model: SalesModel = serde_json::from_str(&json)?;
        log::info!("Loaded {} model from {}", model.kind(), path.display());
        Ok(model)
    }
}

impl ForecastingModel for SalesModel {
    fn fit_data(&mut self, x: &DataFrame, y: &DataFrame) -> Result<()> {
        self.inner_mut().fit_data(x, y)
    }

    fn forecast_data(&self, x: &DataFrame) -> Result<Vec<f64>> {
        self.inner().forecast_data(x)
    }

    fn input_shape(&self) -> InputShape {
        self.kind().input_shape()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }
}

/// Replace negative forecasts with 0; sales cannot be negative.
pub fn clamp_non_negative(mut values: Vec<f64>) -> Vec<f64> {
    for v in values.iter_mut() {
        if *v < 0.0 {
            *v = 0.0;
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_lookup_table() {
        assert_eq!(
            ForecastingModelKind::from_config("Boosted Hybrid"),
            ForecastingModelKind::BoostedHybrid
        );
        assert_eq!(
            ForecastingModelKind::from_config("Exponential-Smoothing"),
            ForecastingModelKind::ExponentialSmoothing
        );
        assert_eq!(
            ForecastingModelKind::from_config("lightGBM"),
            ForecastingModelKind::LightGbm
        );
        assert_eq!(
            ForecastingModelKind::from_config("unknown-value"),
            ForecastingModelKind::LinearRegression
        );
    }

    #[test]
    fn test_split_models_need_raw_keys() {
        assert_eq!(
            ForecastingModelKind::LightGbm.input_shape(),
            InputShape::SplitBySeries
        );
        assert_eq!(
            ForecastingModelKind::BoostedHybrid.input_shape(),
            InputShape::Flat
        );
    }

    #[test]
    fn test_build_follows_kind() {
        let config = ModelConfig::default();
        for kind in [
            ForecastingModelKind::LinearRegression,
            ForecastingModelKind::BoostedHybrid,
            ForecastingModelKind::ExponentialSmoothing,
            ForecastingModelKind::LightGbm,
        ] {
            let model = kind.build(&config);
            assert_eq!(model.kind(), kind);
            assert_eq!(model.input_shape(), kind.input_shape());
        }
    }

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(clamp_non_negative(vec![-1.5, 0.0, 2.0]), vec![0.0, 0.0, 2.0]);
    }
}
