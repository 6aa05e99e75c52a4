//! # sales_forecast
//!
//! Store sales forecasting: raw sales, oil price and holiday tables go
//! through a configurable feature pipeline into one of four forecasting
//! models, flat (linear regression, boosted hybrid) or fitted per
//! store/family series (exponential smoothing, lagged boosted trees).
//!
//! ## Example
//!
//! ```rust,no_run
//! use sales_forecast::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let config = PipelineConfig::load(PathConfig::default())?;
//!     generate_features(&config)?;
//!     train_model(&config)?;
//!     forecast_data(&config)?;
//!     println!("RMSLE: {:.3}", evaluate_model(&config)?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod estimators;
pub mod features;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod split;
pub mod table;
pub mod types;

pub mod prelude {
    //! Commonly used types and traits
    pub use crate::config::{
        CustomFeatureFlags, DataConfig, FeatureGeneratorKind, ModelConfig, PathConfig,
    };
    pub use crate::data::DataLoader;
    pub use crate::error::{ForecastError, Result};
    pub use crate::estimators::{Regressor, SeriesForecaster};
    pub use crate::features::{FeatureStep, FeatureVariant, FeaturesGenerator};
    pub use crate::metrics::evaluate_error;
    pub use crate::models::{
        BoostedHybrid, ExponentialSmoothingModel, ForecastingModel, ForecastingModelKind,
        InputShape, LightGbmModel, LinearRegressor, SalesModel,
    };
    pub use crate::pipeline::{
        evaluate_model, forecast_data, generate_features, train_model, PipelineConfig,
    };
    pub use crate::split::{FittedSeries, Series, SplitData, Splitter};
    pub use crate::table::{read_processed_csv, write_csv};
    pub use crate::types::*;
}
