//! Error types for the sales forecasting pipeline

use chrono::NaiveDate;
use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the forecasting pipeline
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Missing input file: {}", path.display())]
    MissingInput { path: PathBuf },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Join on {table} is not many-to-one: date {date} matches more than one row")]
    JoinCardinality { table: String, date: NaiveDate },

    #[error("No fitted model for series {0}")]
    MissingSeries(String),

    #[error("Estimator error: {0}")]
    EstimatorError(String),

    #[error("Model {0} has not been fitted")]
    NotFitted(String),

    #[error("Features have not been generated; call preprocess_data first")]
    NotPreprocessed,

    #[error("Metric error: {0}")]
    MetricError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Result type alias for forecasting operations
pub type Result<T> = std::result::Result<T, ForecastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_cardinality_message() {
        let err = ForecastError::JoinCardinality {
            table: "oil".to_string(),
            date: NaiveDate::from_ymd_opt(2016, 4, 16).unwrap(),
        };

        let msg = err.to_string();
        assert!(msg.contains("oil"));
        assert!(msg.contains("2016-04-16"));
    }

    #[test]
    fn test_missing_input_message() {
        let err = ForecastError::MissingInput {
            path: PathBuf::from("./data/original/train.csv"),
        };
        assert!(err.to_string().contains("train.csv"));
    }
}
