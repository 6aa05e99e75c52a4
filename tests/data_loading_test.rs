//! Raw input loading against CSV files on disk

mod common;

use common::*;
use sales_forecast::data::DataLoader;
use sales_forecast::error::ForecastError;
use sales_forecast::table::{date_column, float_column, int_column, text_column};
use sales_forecast::types::HolidayType;
use std::collections::HashSet;

#[test]
fn test_train_and_test_tables() {
    let fixture = write_fixture();
    let loader = DataLoader::new(fixture.paths.clone());

    let train = loader.load_train_df().unwrap();
    assert_eq!(
        train.get_column_names_str(),
        vec!["id", "date", "store_nbr", "family", "sales", "onpromotion"]
    );
    assert_eq!(train.height(), fixture.n_train_rows());
    assert_eq!(date_column(&train, "date").unwrap()[0], train_start());

    let test = loader.load_test_df().unwrap();
    assert_eq!(
        test.get_column_names_str(),
        vec!["id", "date", "store_nbr", "family", "onpromotion"]
    );
    assert_eq!(test.height(), fixture.n_test_rows());
    assert_eq!(int_column(&test, "id").unwrap()[0], fixture.n_train_rows() as i64);
}

#[test]
fn test_oil_gaps_become_zero() {
    let fixture = write_fixture();
    let oil = DataLoader::new(fixture.paths.clone()).load_oil_df().unwrap();

    assert_eq!(oil.height(), (TRAIN_DAYS + TEST_DAYS) as usize);
    let prices = float_column(&oil, "dcoilwtico").unwrap();
    assert_eq!(prices[0], 0.0);
    assert_eq!(prices[1], 40.25);
}

#[test]
fn test_holiday_filtering() {
    let fixture = write_fixture();
    let events = DataLoader::new(fixture.paths.clone()).load_events_df().unwrap();

    let dates = date_column(&events, "date").unwrap();
    let types: Vec<HolidayType> = text_column(&events, "type")
        .unwrap()
        .iter()
        .map(|t| t.parse().unwrap())
        .collect();
    let kept: Vec<_> = dates.iter().copied().zip(types.iter().copied()).collect();
    assert_eq!(
        kept,
        vec![
            (ymd(2016, 4, 10), HolidayType::Holiday),
            (ymd(2016, 4, 16), HolidayType::Bridge),
            (ymd(2016, 4, 20), HolidayType::Holiday),
            (ymd(2016, 5, 1), HolidayType::Holiday),
        ]
    );

    let unique: HashSet<_> = dates.iter().collect();
    assert_eq!(unique.len(), events.height());
    assert!(types.iter().all(HolidayType::is_relevant));
}

#[test]
fn test_missing_file_is_reported() {
    let fixture = write_fixture();
    std::fs::remove_file(fixture.paths.oil_csv()).unwrap();

    let err = DataLoader::new(fixture.paths.clone()).load_oil_df().unwrap_err();
    match err {
        ForecastError::MissingInput { path } => assert!(path.ends_with("oil.csv")),
        other => panic!("unexpected error: {}", other),
    }
}
