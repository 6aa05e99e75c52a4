//! Batch pipeline stages
//!
//! Each stage reads what the previous one wrote:
//!
//! 1. [`generate_features`]: raw CSVs to `processed/{train_X,train_Y,test_X}.csv`
//! 2. [`train_model`]: processed train data to `{model_dir}/{model-name}.json`
//! 3. [`forecast_data`]: test_X and the stored model to `final/test_Y.csv`
//! 4. [`evaluate_model`]: training RMSLE of the stored model

use crate::config::{DataConfig, ModelConfig, PathConfig};
use crate::data::DataLoader;
use crate::error::Result;
use crate::features::FeaturesGenerator;
use crate::metrics::evaluate_error;
use crate::models::{ForecastingModel, SalesModel};
use crate::split::target_values;
use crate::table::{read_processed_csv, write_csv, ID_COLUMN, TARGET_COLUMN};
use polars::prelude::{Column, DataFrame};

/// Everything a stage needs to run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    pub paths: PathConfig,
    pub data: DataConfig,
    pub model: ModelConfig,
}

impl PipelineConfig {
    pub fn new(paths: PathConfig, data: DataConfig, model: ModelConfig) -> Self {
        Self { paths, data, model }
    }

    /// Read both JSON configs from `paths.config_dir`
    pub fn load(paths: PathConfig) -> Result<Self> {
        let data = DataConfig::load(&paths.data_config())?;
        let model = ModelConfig::load(&paths.model_config())?;
        Ok(Self { paths, data, model })
    }

    fn model_path(&self) -> std::path::PathBuf {
        self.paths.model_artifact(&self.model.model_name)
    }
}

/// Build the design matrices and write them to the processed directory.
pub fn generate_features(config: &PipelineConfig) -> Result<()> {
    config.paths.ensure_output_dirs()?;

    let kind = config.model.model_kind();
    let loader = DataLoader::new(config.paths.clone());
    let mut generator = FeaturesGenerator::from_config(&config.data, kind.input_shape(), loader);
    log::info!(
        "Generating {:?} features for {} ({:?} input)",
        generator.variant(),
        kind,
        generator.input_shape()
    );

    generator.preprocess_data()?;
    let (train_x, train_y) = generator.get_train_data()?;
    let (mut train_x, mut train_y) = (train_x.clone(), train_y.clone());
    let mut test_x = generator.get_test_data()?.clone();

    write_csv(&mut train_x, &config.paths.train_x())?;
    write_csv(&mut train_y, &config.paths.train_y())?;
    write_csv(&mut test_x, &config.paths.test_x())?;
    Ok(())
}

/// Fit the configured model on the processed training data and store it.
pub fn train_model(config: &PipelineConfig) -> Result<SalesModel> {
    let train_x = read_processed_csv(&config.paths.train_x())?;
    let train_y = read_processed_csv(&config.paths.train_y())?;

    let kind = config.model.model_kind();
    let mut model = kind.build(&config.model);
    log::info!("Training {} on {} rows", kind, train_x.height());
    model.fit_data(&train_x, &train_y)?;

    model.save(&config.model_path())?;
    Ok(model)
}

/// Forecast the test rows with the stored model and write the submission.
pub fn forecast_data(config: &PipelineConfig) -> Result<DataFrame> {
    let test_x = read_processed_csv(&config.paths.test_x())?;
    let ids = test_x.column(ID_COLUMN)?.clone();
    let x = test_x.drop(ID_COLUMN)?;

    let model = SalesModel::load(&config.model_path())?;
    let forecast = model.forecast_data(&x)?;

    let mut submission =
        DataFrame::new(vec![ids, Column::new(TARGET_COLUMN.into(), forecast)])?;
    write_csv(&mut submission, &config.paths.submission())?;
    Ok(submission)
}

/// Training RMSLE of the stored model.
pub fn evaluate_model(config: &PipelineConfig) -> Result<f64> {
    let train_x = read_processed_csv(&config.paths.train_x())?;
    let train_y = read_processed_csv(&config.paths.train_y())?;
    let model = SalesModel::load(&config.model_path())?;

    let forecast = model.forecast_data(&train_x)?;
    let error = evaluate_error(&target_values(&train_y)?, &forecast)?;
    log::info!("Training root mean square log error is: {:.2}", error);
    Ok(error)
}
