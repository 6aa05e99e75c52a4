//! Adapters that fit one sub-model per store/family series

use crate::error::{ForecastError, Result};
use crate::estimators::{ExponentialSmoothing, LaggedBooster, SeriesForecaster};
use crate::models::{clamp_non_negative, ForecastingModel, InputShape};
use crate::split::{FittedSeries, SeriesKey, Splitter};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Automatic ETS per series
pub type ExponentialSmoothingModel = SplitModel<ExponentialSmoothing>;

/// Lagged boosted trees per series
pub type LightGbmModel = SplitModel<LaggedBooster>;

/// One fitted copy of `template` per series key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitModel<M> {
    template: M,
    splitter: Splitter,
    models: BTreeMap<SeriesKey, FittedSeries<M>>,
}

impl<M> SplitModel<M>
where
    M: SeriesForecaster + Clone,
{
    pub fn new(template: M) -> Self {
        Self::with_splitter(template, Splitter::default())
    }

    pub fn with_splitter(template: M, splitter: Splitter) -> Self {
        Self {
            template,
            splitter,
            models: BTreeMap::new(),
        }
    }

    /// Fitted sub-models by series key
    pub fn models(&self) -> &BTreeMap<SeriesKey, FittedSeries<M>> {
        &self.models
    }
}

impl<M> ForecastingModel for SplitModel<M>
where
    M: SeriesForecaster + Clone,
{
    fn fit_data(&mut self, x: &DataFrame, y: &DataFrame) -> Result<()> {
        let split = self.splitter.split_data(x, Some(y))?;
        self.models = self.splitter.fit_split_data(&self.template, &split)?;
        log::info!(
            "Fitted {} per-series {} models",
            self.models.len(),
            self.template.name()
        );
        Ok(())
    }

    /// Rows dated inside a series' training range get its in-sample fit,
    /// later rows get the forecast from the end of training.
    fn forecast_data(&self, x: &DataFrame) -> Result<Vec<f64>> {
        if self.models.is_empty() {
            return Err(ForecastError::NotFitted(self.name().to_string()));
        }
        let split = self.splitter.split_data(x, None)?;
        let forecast = self.splitter.forecast_split_data(&self.models, &split)?;
        Ok(clamp_non_negative(forecast))
    }

    fn input_shape(&self) -> InputShape {
        InputShape::SplitBySeries
    }

    fn name(&self) -> &str {
        self.template.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::ExponentialSmoothingConfig;
    use crate::metrics::evaluate_error;
    use chrono::{Duration, NaiveDate};
    use polars::df;

    fn table(start: NaiveDate, days: usize, stores: &[i64]) -> DataFrame {
        let mut dates = Vec::new();
        let mut store_col = Vec::new();
        for &store in stores {
            for d in 0..days {
                dates.push(start + Duration::days(d as i64));
                store_col.push(store);
            }
        }
        let n = dates.len();
        df!(
            "date" => &dates,
            "store_nbr" => &store_col,
            "family" => &vec!["A"; n]
        )
        .unwrap()
    }

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2013, 1, 1).unwrap()
    }

    #[test]
    fn test_exponential_smoothing_forecasts_every_row() {
        let x = table(start(), 21, &[1, 2]);
        // store 2 trends down hard so its forecast would go negative
        let sales: Vec<f64> = (0..21)
            .map(|d| 5.0 + d as f64)
            .chain((0..21).map(|d| 40.0 - 2.0 * d as f64))
            .collect();
        let y = df!("sales" => &sales).unwrap();

        let mut model = ExponentialSmoothingModel::new(ExponentialSmoothing::new(
            ExponentialSmoothingConfig {
                seasonal_periods: 1,
            },
        ));
        model.fit_data(&x, &y).unwrap();
        assert_eq!(model.models().len(), 2);

        let test = table(start() + Duration::days(21), 30, &[2, 1]);
        let forecast = model.forecast_data(&test).unwrap();
        assert_eq!(forecast.len(), 60);
        assert!(forecast.iter().all(|v| *v >= 0.0));
        // rows 0..30 belong to store 2, which keeps falling
        assert!(forecast[29] < forecast[0]);
        assert!(forecast[30] > 20.0);
    }

    #[test]
    fn test_training_table_gets_in_sample_fit() {
        let x = table(start(), 60, &[1]);
        let sales: Vec<f64> = (0..60).map(|d| 10.0 + d as f64).collect();
        let y = df!("sales" => &sales).unwrap();

        let mut model = ExponentialSmoothingModel::new(ExponentialSmoothing::default());
        model.fit_data(&x, &y).unwrap();

        let forecast = model.forecast_data(&x).unwrap();
        let error = evaluate_error(&sales, &forecast).unwrap();
        assert!(error < 0.2, "rmsle {}", error);
    }

    #[test]
    fn test_late_start_skips_lead_in() {
        let x = table(start(), 30, &[1]);
        let sales: Vec<f64> = (0..30).map(|d| 10.0 + d as f64).collect();
        let y = df!("sales" => &sales).unwrap();

        let mut model = ExponentialSmoothingModel::new(ExponentialSmoothing::default());
        model.fit_data(&x, &y).unwrap();

        // a gap of 5 days between training and the forecast window
        let later = table(start() + Duration::days(35), 3, &[1]);
        let adjacent = table(start() + Duration::days(30), 8, &[1]);
        let late = model.forecast_data(&later).unwrap();
        let full = model.forecast_data(&adjacent).unwrap();
        assert_eq!(late, full[5..].to_vec());
    }

    #[test]
    fn test_rows_before_training_rejected() {
        let x = table(start(), 10, &[1]);
        let y = df!("sales" => &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]).unwrap();

        let mut model = ExponentialSmoothingModel::new(ExponentialSmoothing::default());
        model.fit_data(&x, &y).unwrap();

        let early = table(start() - Duration::days(1), 3, &[1]);
        assert!(matches!(
            model.forecast_data(&early),
            Err(ForecastError::DataError(_))
        ));
    }

    #[test]
    fn test_unknown_series_at_forecast() {
        let x = table(start(), 10, &[1]);
        let y = df!("sales" => &[1.0; 10]).unwrap();

        let mut model = ExponentialSmoothingModel::new(ExponentialSmoothing::default());
        model.fit_data(&x, &y).unwrap();

        let test = table(start(), 3, &[9]);
        assert!(matches!(
            model.forecast_data(&test),
            Err(ForecastError::MissingSeries(key)) if key == "A-9"
        ));
    }
}
