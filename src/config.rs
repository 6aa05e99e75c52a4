//! Pipeline configuration: file locations, feature selection and model selection
//!
//! Paths are passed into every component explicitly through [`PathConfig`].
//! Feature and model choices come from two JSON documents in the config
//! directory (`data_configs.json` and `model_configs.json`). Unknown enum
//! values never fail a run: they fall back to the documented default with a
//! warning.

use crate::error::Result;
use crate::estimators::{BoostingConfig, ExponentialSmoothingConfig, LaggedBoosterConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File locations used by the pipeline stages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathConfig {
    /// Root holding `original/`, `processed/` and `final/`
    pub data_dir: PathBuf,
    /// Directory holding `data_configs.json` and `model_configs.json`
    pub config_dir: PathBuf,
    /// Directory for fitted model artifacts
    pub model_dir: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            config_dir: PathBuf::from("./config"),
            model_dir: PathBuf::from("./src/models"),
        }
    }
}

impl PathConfig {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        config_dir: impl Into<PathBuf>,
        model_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            config_dir: config_dir.into(),
            model_dir: model_dir.into(),
        }
    }

    fn original(&self, file: &str) -> PathBuf {
        self.data_dir.join("original").join(file)
    }

    pub fn train_csv(&self) -> PathBuf {
        self.original("train.csv")
    }

    pub fn test_csv(&self) -> PathBuf {
        self.original("test.csv")
    }

    pub fn oil_csv(&self) -> PathBuf {
        self.original("oil.csv")
    }

    pub fn holidays_csv(&self) -> PathBuf {
        self.original("holidays_events.csv")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.data_dir.join("processed")
    }

    pub fn train_x(&self) -> PathBuf {
        self.processed_dir().join("train_X.csv")
    }

    pub fn train_y(&self) -> PathBuf {
        self.processed_dir().join("train_Y.csv")
    }

    pub fn test_x(&self) -> PathBuf {
        self.processed_dir().join("test_X.csv")
    }

    pub fn final_dir(&self) -> PathBuf {
        self.data_dir.join("final")
    }

    /// Submission file with one `id,sales` row per test observation
    pub fn submission(&self) -> PathBuf {
        self.final_dir().join("test_Y.csv")
    }

    pub fn data_config(&self) -> PathBuf {
        self.config_dir.join("data_configs.json")
    }

    pub fn model_config(&self) -> PathBuf {
        self.config_dir.join("model_configs.json")
    }

    /// Location of the serialized model named `model_name`
    pub fn model_artifact(&self, model_name: &str) -> PathBuf {
        self.model_dir.join(format!("{}.json", model_name))
    }

    /// Create the output directories the stages write into
    pub fn ensure_output_dirs(&self) -> Result<()> {
        fs::create_dir_all(self.processed_dir())?;
        fs::create_dir_all(self.final_dir())?;
        fs::create_dir_all(&self.model_dir)?;
        Ok(())
    }
}

/// Feature generator variant named in `data_configs.json`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureGeneratorKind {
    /// Time index plus family and store dummies
    Simple,
    /// Every feature step
    All,
    /// Steps switched individually by [`CustomFeatureFlags`]
    Custom,
}

const FEATURE_GENERATOR_TABLE: &[(&str, FeatureGeneratorKind)] = &[
    ("base", FeatureGeneratorKind::Simple),
    ("simple", FeatureGeneratorKind::Simple),
    ("all", FeatureGeneratorKind::All),
    ("custom", FeatureGeneratorKind::Custom),
];

impl FeatureGeneratorKind {
    /// Used when the configured value is missing or unknown
    pub const DEFAULT: FeatureGeneratorKind = FeatureGeneratorKind::Simple;

    /// Look up a configuration value, case-insensitively.
    pub fn lookup(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        FEATURE_GENERATOR_TABLE
            .iter()
            .find(|(name, _)| *name == value)
            .map(|(_, kind)| *kind)
    }

    /// Resolve a configuration value, falling back to [`Self::DEFAULT`].
    pub fn from_config(value: &str) -> Self {
        Self::lookup(value).unwrap_or_else(|| {
            log::warn!(
                "Unknown feature-generator '{}', using {:?}",
                value,
                Self::DEFAULT
            );
            Self::DEFAULT
        })
    }
}

/// Per-step switches for the custom feature generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CustomFeatureFlags {
    pub index: bool,
    pub family: bool,
    pub store_number: bool,
    pub oil_price: bool,
    pub holidays_and_events: bool,
    pub day_of_week: bool,
    pub day_of_month: bool,
    pub earthquake: bool,
}

impl CustomFeatureFlags {
    /// Flags equivalent to the simple generator
    pub fn simple() -> Self {
        Self {
            index: true,
            family: true,
            store_number: true,
            ..Self::none()
        }
    }

    /// Every step enabled
    pub fn all() -> Self {
        Self {
            index: true,
            family: true,
            store_number: true,
            oil_price: true,
            holidays_and_events: true,
            day_of_week: true,
            day_of_month: true,
            earthquake: true,
        }
    }

    /// Every step disabled; only the raw-column drop runs
    pub fn none() -> Self {
        Self {
            index: false,
            family: false,
            store_number: false,
            oil_price: false,
            holidays_and_events: false,
            day_of_week: false,
            day_of_month: false,
            earthquake: false,
        }
    }
}

impl Default for CustomFeatureFlags {
    fn default() -> Self {
        Self::all()
    }
}

/// Contents of `data_configs.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(rename = "feature-generator", default = "default_feature_generator")]
    pub feature_generator: String,
    #[serde(rename = "custom-feature-generator", default)]
    pub custom_feature_generator: CustomFeatureFlags,
}

fn default_feature_generator() -> String {
    "Base".to_string()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            feature_generator: default_feature_generator(),
            custom_feature_generator: CustomFeatureFlags::default(),
        }
    }
}

impl DataConfig {
    pub fn load(path: &Path) -> Result<Self> {
        load_json_or_default(path)
    }

    pub fn generator_kind(&self) -> FeatureGeneratorKind {
        FeatureGeneratorKind::from_config(&self.feature_generator)
    }
}

/// Contents of `model_configs.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(rename = "forecasting-model", default = "default_forecasting_model")]
    pub forecasting_model: String,
    #[serde(rename = "model-name", default = "default_model_name")]
    pub model_name: String,
    #[serde(rename = "exponential-smoothing", default)]
    pub exponential_smoothing: ExponentialSmoothingConfig,
    #[serde(rename = "lightgbm", default)]
    pub lightgbm: LaggedBoosterConfig,
    #[serde(rename = "boosted-hybrid", default)]
    pub boosted_hybrid: BoostingConfig,
}

fn default_forecasting_model() -> String {
    "Linear Regression".to_string()
}

fn default_model_name() -> String {
    "model".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            forecasting_model: default_forecasting_model(),
            model_name: default_model_name(),
            exponential_smoothing: ExponentialSmoothingConfig::default(),
            lightgbm: LaggedBoosterConfig::default(),
            boosted_hybrid: BoostingConfig::default(),
        }
    }
}

impl ModelConfig {
    pub fn load(path: &Path) -> Result<Self> {
        load_json_or_default(path)
    }

    pub fn model_kind(&self) -> crate::models::ForecastingModelKind {
        crate::models::ForecastingModelKind::from_config(&self.forecasting_model)
    }
}

fn load_json_or_default<T>(path: &Path) -> Result<T>
where
    T: Default + for<'de> Deserialize<'de>,
{
    if !path.exists() {
        log::warn!("Config {} not found, using defaults", path.display());
        return Ok(T::default());
    }

    let contents = fs::read_to_string(path)?;
    let config = serde_json::from_str(&contents)?;
    log::debug!("Loaded config from {}", path.display());
    Ok(config)
}
