//! Per-series split, fit and reassembly

use chrono::{Duration, NaiveDate};
use polars::df;
use polars::prelude::DataFrame;
use proptest::prelude::*;
use sales_forecast::error::{ForecastError, Result};
use sales_forecast::estimators::{ExponentialSmoothing, SeriesForecaster};
use sales_forecast::split::{Series, Splitter};
use sales_forecast::table::float_column;

/// Predicts the series' own promotion covariate back
#[derive(Debug, Clone, Default)]
struct EchoPromotion {
    training: Vec<f64>,
}

fn promotions(series: &Series) -> Vec<f64> {
    (0..series.len()).map(|t| series.covariate_row(t)[0]).collect()
}

impl SeriesForecaster for EchoPromotion {
    fn fit(&mut self, series: &Series) -> Result<()> {
        self.training = promotions(series);
        Ok(())
    }

    fn forecast(&self, series: &Series) -> Result<Vec<f64>> {
        Ok(promotions(series))
    }

    fn in_sample(&self) -> Result<Vec<f64>> {
        Ok(self.training.clone())
    }

    fn name(&self) -> &str {
        "EchoPromotion"
    }
}

const FAMILIES: [&str; 2] = ["GROCERY I", "PRODUCE"];

/// Rows are `(family index, store, day)`; promotion is the row number
fn build(rows: &[(usize, i64, i64)]) -> (DataFrame, DataFrame) {
    let start = NaiveDate::from_ymd_opt(2017, 1, 1).unwrap();
    let n = rows.len();
    let dates: Vec<NaiveDate> = rows.iter().map(|r| start + Duration::days(r.2)).collect();
    let stores: Vec<i64> = rows.iter().map(|r| r.1).collect();
    let families: Vec<&str> = rows.iter().map(|r| FAMILIES[r.0]).collect();
    let promotion: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let x = df!(
        "date" => &dates,
        "store_nbr" => &stores,
        "family" => &families,
        "onpromotion" => &promotion
    )
    .unwrap();
    let y = df!("sales" => &vec![1.0; n]).unwrap();
    (x, y)
}

proptest! {
    #[test]
    fn prop_forecast_lines_up_with_input_rows(
        rows in prop::collection::btree_set((0usize..2, 1i64..3, 0i64..20), 1..60)
            .prop_map(|s| s.into_iter().collect::<Vec<_>>())
            .prop_shuffle()
    ) {
        let (x, y) = build(&rows);
        let splitter = Splitter::default();

        let split = splitter.split_data(&x, Some(&y)).unwrap();
        prop_assert_eq!(split.n_rows(), rows.len());
        let models = splitter.fit_split_data(&EchoPromotion::default(), &split).unwrap();
        prop_assert_eq!(models.len(), split.len());

        let forecast = splitter
            .forecast_split_data(&models, &splitter.split_data(&x, None).unwrap())
            .unwrap();
        prop_assert_eq!(forecast, float_column(&x, "onpromotion").unwrap());
    }
}

#[test]
fn test_overlap_and_gap_align_by_date() {
    // trained on days 0..5; forecast rows on days 3, 4 (in-sample), 5 and 8
    let (train_x, train_y) = build(&[(0, 1, 0), (0, 1, 1), (0, 1, 2), (0, 1, 3), (0, 1, 4)]);
    let splitter = Splitter::default();
    let models = splitter
        .fit_split_data(
            &EchoPromotion::default(),
            &splitter.split_data(&train_x, Some(&train_y)).unwrap(),
        )
        .unwrap();
    let fitted = &models["GROCERY I-1"];
    assert_eq!((fitted.end - fitted.start).num_days(), 4);

    let (test_x, _) = build(&[(0, 1, 8), (0, 1, 3), (0, 1, 5), (0, 1, 4)]);
    let forecast = splitter
        .forecast_split_data(&models, &splitter.split_data(&test_x, None).unwrap())
        .unwrap();

    // days 3 and 4 carry training promotions 3 and 4; days 5 and 8 echo
    // their own rows 2 and 0
    assert_eq!(forecast, vec![0.0, 3.0, 2.0, 4.0]);
}

#[test]
fn test_keys_follow_family_and_store() {
    let (x, _) = build(&[(1, 2, 0), (0, 1, 0), (0, 1, 1)]);
    let split = Splitter::default().split_data(&x, None).unwrap();
    let keys: Vec<&String> = split.keys().collect();
    assert_eq!(keys, vec!["GROCERY I-1", "PRODUCE-2"]);
    assert!(split.get("GROCERY I-1").unwrap().target().is_none());
}

#[test]
fn test_missing_series_fails_forecast() {
    let (train_x, train_y) = build(&[(0, 1, 0), (0, 1, 1), (0, 1, 2)]);
    let splitter = Splitter::default();
    let models = splitter
        .fit_split_data(
            &ExponentialSmoothing::default(),
            &splitter.split_data(&train_x, Some(&train_y)).unwrap(),
        )
        .unwrap();

    let (test_x, _) = build(&[(0, 1, 3), (1, 2, 3)]);
    let err = splitter
        .forecast_split_data(&models, &splitter.split_data(&test_x, None).unwrap())
        .unwrap_err();
    assert!(matches!(err, ForecastError::MissingSeries(ref key) if key == "PRODUCE-2"));
}

#[test]
fn test_failed_series_fails_fit() {
    // a one-day series cannot be smoothed
    let (x, y) = build(&[(0, 1, 0), (0, 1, 1), (1, 1, 0)]);
    let splitter = Splitter::default();
    let split = splitter.split_data(&x, Some(&y)).unwrap();
    assert!(matches!(
        splitter.fit_split_data(&ExponentialSmoothing::default(), &split),
        Err(ForecastError::EstimatorError(_))
    ));
}
