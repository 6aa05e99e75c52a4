//! Gradient boosted regression trees (squared error).
//!
//! The default backend boosts smartcore regression trees on the residuals:
//! every round fits one tree and adds `learning_rate` times its prediction.
//! With the `lightgbm` feature the ensemble is trained by LightGBM instead
//! and kept as its text model.

use crate::error::{ForecastError, Result};
use crate::estimators::Regressor;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};
use std::sync::Arc;

#[cfg(feature = "lightgbm")]
use lightgbm3::{Booster as LGBMBooster, Dataset as LGBMDataset};

type Tree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Boosting hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Histogram bins per feature, LightGBM backend only
    pub max_bins: usize,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 4,
            min_samples_leaf: 10,
            max_bins: 255,
        }
    }
}

impl BoostingConfig {
    fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(ForecastError::ConfigError(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(ForecastError::ConfigError(format!(
                "learning_rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if self.max_depth == 0 || self.max_depth > u16::MAX as usize {
            return Err(ForecastError::ConfigError(format!(
                "max_depth must be in [1, {}], got {}",
                u16::MAX,
                self.max_depth
            )));
        }
        if self.min_samples_leaf == 0 {
            return Err(ForecastError::ConfigError(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if self.max_bins < 2 {
            return Err(ForecastError::ConfigError(format!(
                "max_bins must be at least 2, got {}",
                self.max_bins
            )));
        }
        Ok(())
    }

    #[cfg(not(feature = "lightgbm"))]
    fn tree_parameters(&self) -> DecisionTreeRegressorParameters {
        DecisionTreeRegressorParameters::default()
            .with_max_depth(self.max_depth as u16)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_min_samples_split(2 * self.min_samples_leaf)
    }

    #[cfg(feature = "lightgbm")]
    fn lightgbm_parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "objective": "regression",
            "num_iterations": self.n_estimators,
            "learning_rate": self.learning_rate,
            "max_depth": self.max_depth,
            "num_leaves": 1usize << self.max_depth.min(17),
            "min_data_in_leaf": self.min_samples_leaf,
            "max_bin": self.max_bins,
            "verbosity": -1,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Ensemble {
    Trees {
        base_score: f64,
        trees: Vec<Arc<Tree>>,
    },
    #[cfg(feature = "lightgbm")]
    LightGbm { model: String },
}

/// Gradient boosted tree ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    config: BoostingConfig,
    n_features: Option<usize>,
    ensemble: Option<Ensemble>,
}

impl Default for GradientBoostedTrees {
    fn default() -> Self {
        Self::new(BoostingConfig::default())
    }
}

fn backend_error(stage: &str, err: impl std::fmt::Display) -> ForecastError {
    ForecastError::EstimatorError(format!("boosted trees {}: {}", stage, err))
}

/// Row-major dense copy of `x`
fn row_major(x: &DMatrix<f64>) -> Vec<f64> {
    x.row_iter().flat_map(|r| r.iter().copied().collect::<Vec<_>>()).collect()
}

impl GradientBoostedTrees {
    pub fn new(config: BoostingConfig) -> Self {
        Self {
            config,
            n_features: None,
            ensemble: None,
        }
    }

    pub fn config(&self) -> &BoostingConfig {
        &self.config
    }

    /// Number of boosting rounds kept (native backend)
    pub fn n_trees(&self) -> usize {
        match &self.ensemble {
            Some(Ensemble::Trees { trees, .. }) => trees.len(),
            _ => 0,
        }
    }

    /// Ready-to-use predictor, for callers predicting one row at a time
    pub fn predictor(&self) -> Result<Predictor<'_>> {
        let ensemble = self
            .ensemble
            .as_ref()
            .ok_or_else(|| ForecastError::NotFitted(self.name().to_string()))?;
        let n_features = self.n_features.unwrap_or(0);
        let backend = match ensemble {
            Ensemble::Trees { base_score, trees } => Backend::Trees {
                base_score: *base_score,
                trees,
            },
            #[cfg(feature = "lightgbm")]
            Ensemble::LightGbm { model } => Backend::LightGbm(
                LGBMBooster::from_string(model).map_err(|e| backend_error("load", e))?,
            ),
        };
        Ok(Predictor {
            n_features,
            learning_rate: self.config.learning_rate,
            backend,
        })
    }

    /// Predict a single feature row
    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        let values = self.predictor()?.predict_rows(row.to_vec(), 1)?;
        Ok(values[0])
    }

    #[cfg(not(feature = "lightgbm"))]
    fn fit_trees(&self, x: &DMatrix<f64>, y: &[f64]) -> Result<Ensemble> {
        let n = x.nrows();
        let matrix = DenseMatrix::new(n, x.ncols(), x.as_slice().to_vec(), true)
            .map_err(|e| backend_error("input", e))?;
        let base_score = y.iter().sum::<f64>() / n as f64;

        let mut predictions = vec![base_score; n];
        let mut trees = Vec::with_capacity(self.config.n_estimators);
        for _ in 0..self.config.n_estimators {
            let residuals: Vec<f64> = y.iter().zip(&predictions).map(|(t, p)| t - p).collect();
            let tree = Tree::fit(&matrix, &residuals, self.config.tree_parameters())
                .map_err(|e| backend_error("fit", e))?;
            let step = tree.predict(&matrix).map_err(|e| backend_error("predict", e))?;
            for (pred, s) in predictions.iter_mut().zip(step) {
                *pred += self.config.learning_rate * s;
            }
            trees.push(Arc::new(tree));
        }

        Ok(Ensemble::Trees { base_score, trees })
    }

    #[cfg(feature = "lightgbm")]
    fn fit_lightgbm(&self, x: &DMatrix<f64>, y: &[f64]) -> Result<Ensemble> {
        let rows: Vec<Vec<f64>> = x
            .row_iter()
            .map(|r| r.iter().copied().collect())
            .collect();
        let labels: Vec<f32> = y.iter().map(|&v| v as f32).collect();
        let dataset = LGBMDataset::from_vec_of_vec(rows, labels, true)
            .map_err(|e| backend_error("dataset", e))?;
        let booster = LGBMBooster::train(dataset, &self.config.lightgbm_parameters())
            .map_err(|e| backend_error("train", e))?;
        let model = booster
            .save_string()
            .map_err(|e| backend_error("save", e))?;
        Ok(Ensemble::LightGbm { model })
    }
}

impl Regressor for GradientBoostedTrees {
    fn fit(&mut self, x: &DMatrix<f64>, y: &[f64]) -> Result<()> {
        self.config.validate()?;
        let n = x.nrows();
        if n == 0 {
            return Err(ForecastError::EstimatorError(
                "boosted trees need at least one observation".to_string(),
            ));
        }
        if y.len() != n {
            return Err(ForecastError::EstimatorError(format!(
                "boosted trees: {} rows in X, {} targets",
                n,
                y.len()
            )));
        }

        #[cfg(feature = "lightgbm")]
        let ensemble = self.fit_lightgbm(x, y)?;
        #[cfg(not(feature = "lightgbm"))]
        let ensemble = self.fit_trees(x, y)?;

        self.ensemble = Some(ensemble);
        self.n_features = Some(x.ncols());
        log::debug!(
            "Fitted {} boosting rounds on {} rows x {} features",
            self.config.n_estimators,
            n,
            x.ncols()
        );
        Ok(())
    }

    fn predict(&self, x: &DMatrix<f64>) -> Result<Vec<f64>> {
        self.predictor()?.predict_rows(row_major(x), x.nrows())
    }

    fn name(&self) -> &str {
        "GradientBoostedTrees"
    }
}

enum Backend<'a> {
    Trees {
        base_score: f64,
        trees: &'a [Arc<Tree>],
    },
    #[cfg(feature = "lightgbm")]
    LightGbm(LGBMBooster),
}

/// A fitted ensemble loaded for prediction
pub struct Predictor<'a> {
    n_features: usize,
    learning_rate: f64,
    backend: Backend<'a>,
}

impl Predictor<'_> {
    /// Predict `n_rows` rows given as one row-major buffer
    pub fn predict_rows(&self, flat: Vec<f64>, n_rows: usize) -> Result<Vec<f64>> {
        if flat.len() != n_rows * self.n_features {
            return Err(ForecastError::EstimatorError(format!(
                "boosted trees fitted on {} features, got {} values for {} rows",
                self.n_features,
                flat.len(),
                n_rows
            )));
        }
        if n_rows == 0 {
            return Ok(Vec::new());
        }

        match &self.backend {
            Backend::Trees { base_score, trees } => {
                let matrix = DenseMatrix::new(n_rows, self.n_features, flat, false)
                    .map_err(|e| backend_error("input", e))?;
                let mut out = vec![*base_score; n_rows];
                for tree in trees.iter() {
                    let step = tree
                        .predict(&matrix)
                        .map_err(|e| backend_error("predict", e))?;
                    for (o, s) in out.iter_mut().zip(step) {
                        *o += self.learning_rate * s;
                    }
                }
                Ok(out)
            }
            #[cfg(feature = "lightgbm")]
            Backend::LightGbm(booster) => {
                let rows: Vec<Vec<f64>> = flat
                    .chunks(self.n_features)
                    .map(|r| r.to_vec())
                    .collect();
                booster
                    .predict_from_vec_of_vec(rows, true)
                    .map(|out| out.into_iter().flatten().collect())
                    .map_err(|e| backend_error("predict", e))
            }
        }
    }
}
