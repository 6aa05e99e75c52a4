//! Shared fixtures: a small raw dataset written to a temporary directory

#![allow(dead_code)]

use chrono::{Datelike, Duration, NaiveDate};
use sales_forecast::config::{DataConfig, ModelConfig, PathConfig};
use sales_forecast::pipeline::PipelineConfig;
use std::fmt::Write as _;
use std::fs;
use tempfile::TempDir;

pub const FAMILIES: [&str; 2] = ["AUTOMOTIVE", "BEAUTY"];
pub const STORES: [u32; 2] = [1, 2];
pub const TRAIN_DAYS: i64 = 30;
pub const TEST_DAYS: i64 = 14;

pub fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn train_start() -> NaiveDate {
    ymd(2016, 4, 1)
}

pub fn test_start() -> NaiveDate {
    train_start() + Duration::days(TRAIN_DAYS)
}

pub fn promotion(day: i64, store: u32) -> u32 {
    u32::from((day + store as i64) % 5 == 0) * 3
}

/// Weekly pattern plus a store/family level and a promotion bump
pub fn sales_value(date: NaiveDate, store: u32, family: usize, promo: u32) -> f64 {
    let weekday = date.weekday().num_days_from_monday() as f64;
    10.0 * store as f64 + 5.0 * family as f64 + 2.0 * weekday + 1.5 * promo as f64
}

pub struct Fixture {
    pub dir: TempDir,
    pub paths: PathConfig,
}

impl Fixture {
    pub fn n_train_rows(&self) -> usize {
        (TRAIN_DAYS as usize) * STORES.len() * FAMILIES.len()
    }

    pub fn n_test_rows(&self) -> usize {
        (TEST_DAYS as usize) * STORES.len() * FAMILIES.len()
    }

    pub fn pipeline_config(&self, data: DataConfig, forecasting_model: &str) -> PipelineConfig {
        let model = ModelConfig {
            forecasting_model: forecasting_model.to_string(),
            ..ModelConfig::default()
        };
        PipelineConfig::new(self.paths.clone(), data, model)
    }
}

fn sales_csv(start: NaiveDate, days: i64, first_id: u64, with_sales: bool) -> String {
    let mut out = String::from(if with_sales {
        "id,date,store_nbr,family,sales,onpromotion\n"
    } else {
        "id,date,store_nbr,family,onpromotion\n"
    });
    let mut id = first_id;
    for day in 0..days {
        let date = start + Duration::days(day);
        for &store in &STORES {
            for (f, family) in FAMILIES.iter().enumerate() {
                let promo = promotion(day, store);
                if with_sales {
                    let sales = sales_value(date, store, f, promo);
                    writeln!(out, "{},{},{},{},{},{}", id, date, store, family, sales, promo)
                        .unwrap();
                } else {
                    writeln!(out, "{},{},{},{},{}", id, date, store, family, promo).unwrap();
                }
                id += 1;
            }
        }
    }
    out
}

fn oil_csv() -> String {
    let mut out = String::from("date,dcoilwtico\n");
    for day in 0..TRAIN_DAYS + TEST_DAYS {
        let date = train_start() + Duration::days(day);
        if day % 5 == 0 {
            writeln!(out, "{},", date).unwrap();
        } else {
            writeln!(out, "{},{:.2}", date, 40.0 + day as f64 * 0.25).unwrap();
        }
    }
    out
}

const HOLIDAYS_CSV: &str = "\
date,type,locale,locale_name,description,transferred
2016-04-10,Holiday,National,Ecuador,Fiesta,False
2016-04-10,Event,National,Ecuador,Evento,False
2016-04-12,Holiday,Local,Quito,Fundacion,False
2016-04-14,Transfer,National,Ecuador,Traslado,False
2016-04-16,Bridge,National,Ecuador,Puente,False
2016-04-16,Additional,National,Ecuador,Adicional,False
2016-04-20,Holiday,Regional,Cotopaxi,Provincial,False
2016-04-22,Holiday,National,Ecuador,Trasladado,True
2016-05-01,Holiday,National,Ecuador,Dia del Trabajo,False
2016-05-05,Work Day,National,Ecuador,Recupero,False
";

/// Write the four raw CSVs under `{tmp}/data/original`
pub fn write_fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let paths = PathConfig::new(
        dir.path().join("data"),
        dir.path().join("config"),
        dir.path().join("models"),
    );
    let original = paths.data_dir.join("original");
    fs::create_dir_all(&original).unwrap();

    let n_train = (TRAIN_DAYS as u64) * (STORES.len() * FAMILIES.len()) as u64;
    fs::write(paths.train_csv(), sales_csv(train_start(), TRAIN_DAYS, 0, true)).unwrap();
    fs::write(paths.test_csv(), sales_csv(test_start(), TEST_DAYS, n_train, false)).unwrap();
    fs::write(paths.oil_csv(), oil_csv()).unwrap();
    fs::write(paths.holidays_csv(), HOLIDAYS_CSV).unwrap();

    Fixture { dir, paths }
}
