//! Statistical estimators behind the model adapters
//!
//! Two capability traits sit at this seam:
//!
//! - [`Regressor`]: cross-sectional fit on a design matrix (OLS, boosted trees)
//! - [`SeriesForecaster`]: fit on one daily [`Series`] and forecast as many
//!   steps as the series to forecast has rows (ETS, lagged trees)

pub mod ets;
pub mod gbdt;
pub mod lagged;
pub mod ols;

pub use ets::{ExponentialSmoothing, ExponentialSmoothingConfig};
pub use gbdt::{BoostingConfig, GradientBoostedTrees, Predictor};
pub use lagged::{LaggedBooster, LaggedBoosterConfig};
pub use ols::OrdinaryLeastSquares;

use crate::error::Result;
use crate::split::Series;
use nalgebra::DMatrix;

/// Estimator fitted on a design matrix and a target vector
pub trait Regressor: Send + Sync {
    /// Fit on `x` (rows are observations) and `y`
    fn fit(&mut self, x: &DMatrix<f64>, y: &[f64]) -> Result<()>;

    /// Predict one value per row of `x`
    fn predict(&self, x: &DMatrix<f64>) -> Result<Vec<f64>>;

    /// Estimator name for logs
    fn name(&self) -> &str;
}

/// Estimator fitted on a single daily series
pub trait SeriesForecaster: Send + Sync {
    /// Fit on the series target (and covariates, if the estimator uses them)
    fn fit(&mut self, series: &Series) -> Result<()>;

    /// Forecast `series.len()` steps past the end of the training series.
    ///
    /// `series` carries the covariates of the forecast window; its target,
    /// if any, is ignored.
    fn forecast(&self, series: &Series) -> Result<Vec<f64>>;

    /// Fitted value for every position of the training series
    fn in_sample(&self) -> Result<Vec<f64>>;

    /// Estimator name for logs
    fn name(&self) -> &str;
}
