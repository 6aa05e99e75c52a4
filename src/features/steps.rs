//! Feature steps
//!
//! Each step takes a table and returns it with columns added or removed.
//! Rows are never added, removed or reordered.

use crate::data::{HOLIDAY_TYPE_COLUMN, OIL_COLUMN};
use crate::error::{ForecastError, Result};
use crate::split::PARTITION_COLUMNS;
use crate::table::{
    date_column, ensure_unique_dates, int_column, DATE_COLUMN, FAMILY_COLUMN, STORE_COLUMN,
};
use crate::types::HolidayType;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

pub const TIME_COLUMN: &str = "time";
pub const BEFORE_EQ_COLUMN: &str = "before_EQ";
pub const AFTER_EQ_COLUMN: &str = "after_EQ";

/// Table to table transform composed into a feature pipeline
pub trait FeatureStep: Send + Sync {
    /// Apply the step to `df`
    fn apply(&self, df: DataFrame) -> Result<DataFrame>;

    /// Step name for logs
    fn name(&self) -> &str;
}

/// Indicator columns for `values`, named `{series name}_{value}`.
///
/// Nulls get no indicator.
fn dummies(values: &Series) -> Result<Vec<Column>> {
    let null_column = format!("{}_null", values.name());
    Ok(values
        .to_dummies(None, false)?
        .take_columns()
        .into_iter()
        .filter(|c| c.name().as_str() != null_column)
        .collect())
}

/// Left join on `date` where every left row matches at most one right row
fn left_join_on_date(df: &DataFrame, right: &DataFrame) -> Result<DataFrame> {
    let mut args = JoinArgs::new(JoinType::Left);
    args.validation = JoinValidation::ManyToOne;
    args.maintain_order = MaintainOrderJoin::Left;
    Ok(df.join(right, [DATE_COLUMN], [DATE_COLUMN], args, None)?)
}

/// `time`: days since the earliest date in the table
#[derive(Debug, Clone, Default)]
pub struct TimeIndex;

impl FeatureStep for TimeIndex {
    fn apply(&self, mut df: DataFrame) -> Result<DataFrame> {
        let dates = date_column(&df, DATE_COLUMN)?;
        let time: Vec<i64> = match dates.iter().min() {
            Some(&start) => dates.iter().map(|d| (*d - start).num_days()).collect(),
            None => Vec::new(),
        };
        df.with_column(Column::new(TIME_COLUMN.into(), time))?;
        Ok(df)
    }

    fn name(&self) -> &str {
        "time"
    }
}

/// One indicator per product family, named by the family
#[derive(Debug, Clone, Default)]
pub struct FamilyOneHot;

impl FeatureStep for FamilyOneHot {
    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        let prefix = format!("{}_", FAMILY_COLUMN);
        let families = df.column(FAMILY_COLUMN)?.as_materialized_series().clone();
        let columns: Vec<Column> = dummies(&families)?
            .into_iter()
            .map(|c| {
                let family = c.name().trim_start_matches(prefix.as_str()).to_string();
                c.with_name(family.into())
            })
            .collect();
        Ok(df.hstack(&columns)?)
    }

    fn name(&self) -> &str {
        "family"
    }
}

/// `s_nbr_{n}` indicator per store
#[derive(Debug, Clone, Default)]
pub struct StoreOneHot;

impl FeatureStep for StoreOneHot {
    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        let stores = Series::new("s_nbr".into(), int_column(&df, STORE_COLUMN)?);
        Ok(df.hstack(&dummies(&stores)?)?)
    }

    fn name(&self) -> &str {
        "store-number"
    }
}

/// Many-to-one join of the daily oil price; unmatched dates get 0.0
#[derive(Debug, Clone)]
pub struct OilPriceJoin {
    prices: DataFrame,
}

impl OilPriceJoin {
    /// `oil` holds `date` and `dcoilwtico`. Two prices for one date is an error.
    pub fn new(oil: DataFrame) -> Result<Self> {
        ensure_unique_dates("oil", &oil)?;
        Ok(Self {
            prices: oil.select([DATE_COLUMN, OIL_COLUMN])?,
        })
    }
}

impl FeatureStep for OilPriceJoin {
    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        let mut joined = left_join_on_date(&df, &self.prices)?;
        let price: Vec<f64> = joined
            .column(OIL_COLUMN)?
            .f64()?
            .into_iter()
            .map(|p| p.unwrap_or(0.0))
            .collect();
        joined.with_column(Column::new(OIL_COLUMN.into(), price))?;
        Ok(joined)
    }

    fn name(&self) -> &str {
        "oil-price"
    }
}

/// Many-to-one join of the holiday calendar, one indicator per holiday
/// type present in the table
#[derive(Debug, Clone)]
pub struct HolidayJoin {
    events: DataFrame,
}

impl HolidayJoin {
    /// `events` holds `date` and `type`. Two entries for one date is an error.
    pub fn new(events: DataFrame) -> Result<Self> {
        ensure_unique_dates("holidays_events", &events)?;
        Ok(Self {
            events: events.select([DATE_COLUMN, HOLIDAY_TYPE_COLUMN])?,
        })
    }
}

impl FeatureStep for HolidayJoin {
    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        let joined = left_join_on_date(&df, &self.events)?;
        let matched = joined
            .column(HOLIDAY_TYPE_COLUMN)?
            .as_materialized_series()
            .clone();

        let prefix = format!("{}_", HOLIDAY_TYPE_COLUMN);
        let columns = dummies(&matched)?
            .into_iter()
            .map(|c| {
                let kind: HolidayType = c.name().trim_start_matches(prefix.as_str()).parse()?;
                Ok(c.with_name(kind.as_str().into()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(joined.drop(HOLIDAY_TYPE_COLUMN)?.hstack(&columns)?)
    }

    fn name(&self) -> &str {
        "holidays-and-events"
    }
}

/// `DoW_0` (Monday) through `DoW_6`, always all seven
#[derive(Debug, Clone, Default)]
pub struct DayOfWeekOneHot;

impl FeatureStep for DayOfWeekOneHot {
    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        let weekdays: Vec<i32> = date_column(&df, DATE_COLUMN)?
            .iter()
            .map(|d| d.weekday().num_days_from_monday() as i32)
            .collect();
        let present = dummies(&Series::new("DoW".into(), weekdays))?;

        let columns: Vec<Column> = (0..7)
            .map(|d| {
                let name = format!("DoW_{}", d);
                present
                    .iter()
                    .find(|c| c.name().as_str() == name)
                    .cloned()
                    .unwrap_or_else(|| Column::new(name.into(), vec![0i32; df.height()]))
            })
            .collect();
        Ok(df.hstack(&columns)?)
    }

    fn name(&self) -> &str {
        "day-of-week"
    }
}

/// `DoM_{d}` for each day of month present in the table
#[derive(Debug, Clone, Default)]
pub struct DayOfMonthOneHot;

impl FeatureStep for DayOfMonthOneHot {
    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        let days: Vec<i32> = date_column(&df, DATE_COLUMN)?
            .iter()
            .map(|d| d.day() as i32)
            .collect();
        Ok(df.hstack(&dummies(&Series::new("DoM".into(), days))?)?)
    }

    fn name(&self) -> &str {
        "day-of-month"
    }
}

/// Indicators for the weeks around the April 2016 earthquake
#[derive(Debug, Clone)]
pub struct EarthquakeRelevancy {
    before: (NaiveDate, NaiveDate),
    after: (NaiveDate, NaiveDate),
}

impl Default for EarthquakeRelevancy {
    fn default() -> Self {
        Self {
            before: (ymd(2016, 4, 12), ymd(2016, 4, 15)),
            after: (ymd(2016, 4, 16), ymd(2016, 4, 26)),
        }
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

impl FeatureStep for EarthquakeRelevancy {
    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        let dates = date_column(&df, DATE_COLUMN)?;
        let within = |name: &str, (start, end): (NaiveDate, NaiveDate)| {
            let flags: Vec<i32> = dates
                .iter()
                .map(|d| i32::from(start <= *d && *d <= end))
                .collect();
            Column::new(name.into(), flags)
        };
        let columns = [
            within(BEFORE_EQ_COLUMN, self.before),
            within(AFTER_EQ_COLUMN, self.after),
        ];
        Ok(df.hstack(&columns)?)
    }

    fn name(&self) -> &str {
        "earthquake"
    }
}

/// Remove `date`, `store_nbr` and `family` once encoded.
///
/// Split models partition on these columns, so they are kept for them.
#[derive(Debug, Clone, Default)]
pub struct DropRawColumns {
    pub keep_partition_keys: bool,
}

impl FeatureStep for DropRawColumns {
    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        if self.keep_partition_keys {
            return Ok(df);
        }
        for name in PARTITION_COLUMNS {
            if df.column(name).is_err() {
                return Err(ForecastError::DataError(format!(
                    "cannot drop missing column '{}'",
                    name
                )));
            }
        }
        Ok(df.drop_many(PARTITION_COLUMNS))
    }

    fn name(&self) -> &str {
        "drop-raw-columns"
    }
}
