//! Raw input loading for the sales, oil price and holiday tables

use crate::config::PathConfig;
use crate::error::{ForecastError, Result};
use crate::table::{read_csv, DATE_COLUMN, FAMILY_COLUMN, ID_COLUMN, STORE_COLUMN, TARGET_COLUMN};
use crate::types::{HolidayType, Locale};
use hashbrown::HashSet;
use polars::prelude::*;

pub const OIL_COLUMN: &str = "dcoilwtico";
pub const HOLIDAY_TYPE_COLUMN: &str = "type";
const LOCALE_COLUMN: &str = "locale";
const TRANSFERRED_COLUMN: &str = "transferred";

/// Loads the four raw CSV inputs from `{data_dir}/original/`
#[derive(Debug, Clone)]
pub struct DataLoader {
    paths: PathConfig,
}

impl DataLoader {
    pub fn new(paths: PathConfig) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &PathConfig {
        &self.paths
    }

    /// Training table: `id, date, store_nbr, family, sales, onpromotion`
    pub fn load_train_df(&self) -> Result<DataFrame> {
        let path = self.paths.train_csv();
        let df = read_csv(&path, sales_schema(true))?;
        let missing = df.column(TARGET_COLUMN)?.null_count();
        if missing > 0 {
            return Err(ForecastError::DataError(format!(
                "{}: {} rows have no sales value",
                path.display(),
                missing
            )));
        }
        Ok(df)
    }

    /// Test table: `id, date, store_nbr, family, onpromotion`
    pub fn load_test_df(&self) -> Result<DataFrame> {
        read_csv(&self.paths.test_csv(), sales_schema(false))
    }

    /// Daily oil prices with gaps filled by 0.0
    pub fn load_oil_df(&self) -> Result<DataFrame> {
        let schema = Schema::from_iter([
            Field::new(DATE_COLUMN.into(), DataType::Date),
            Field::new(OIL_COLUMN.into(), DataType::Float64),
        ]);
        fill_oil_prices(read_csv(&self.paths.oil_csv(), schema)?)
    }

    /// National, non-transferred day-off entries, one per date
    pub fn load_events_df(&self) -> Result<DataFrame> {
        let schema = Schema::from_iter([
            Field::new(DATE_COLUMN.into(), DataType::Date),
            Field::new(HOLIDAY_TYPE_COLUMN.into(), DataType::String),
            Field::new(LOCALE_COLUMN.into(), DataType::String),
            Field::new("locale_name".into(), DataType::String),
            Field::new("description".into(), DataType::String),
            Field::new(TRANSFERRED_COLUMN.into(), DataType::Boolean),
        ]);
        let events = filter_events(read_csv(&self.paths.holidays_csv(), schema)?)?;
        log::info!("Kept {} holiday dates after filtering", events.height());
        Ok(events)
    }
}

fn sales_schema(with_sales: bool) -> Schema {
    let mut fields = vec![
        Field::new(ID_COLUMN.into(), DataType::Int64),
        Field::new(DATE_COLUMN.into(), DataType::Date),
        Field::new(STORE_COLUMN.into(), DataType::Int64),
        Field::new(FAMILY_COLUMN.into(), DataType::String),
    ];
    if with_sales {
        fields.push(Field::new(TARGET_COLUMN.into(), DataType::Float64));
    }
    fields.push(Field::new("onpromotion".into(), DataType::Int64));
    Schema::from_iter(fields)
}

/// Replace missing oil prices with 0.0
pub(crate) fn fill_oil_prices(mut oil: DataFrame) -> Result<DataFrame> {
    let prices: Vec<f64> = oil
        .column(OIL_COLUMN)?
        .f64()?
        .into_iter()
        .map(|price| price.unwrap_or(0.0))
        .collect();
    oil.with_column(Column::new(OIL_COLUMN.into(), prices))?;
    Ok(oil)
}

/// Keep non-transferred, non-local Holiday/Additional/Bridge entries,
/// first occurrence per date. Returns `date` and `type`.
pub(crate) fn filter_events(events: DataFrame) -> Result<DataFrame> {
    let relevant = HolidayType::RELEVANT
        .iter()
        .fold(lit(false), |any, kind| {
            any.or(col(HOLIDAY_TYPE_COLUMN).eq(lit(kind.as_str())))
        });

    let kept = events
        .lazy()
        .filter(
            col(TRANSFERRED_COLUMN)
                .eq(lit(false))
                .and(col(LOCALE_COLUMN).neq(lit(Locale::Local.as_str())))
                .and(relevant),
        )
        .select([col(DATE_COLUMN), col(HOLIDAY_TYPE_COLUMN)])
        .collect()?;

    let mut seen = HashSet::with_capacity(kept.height());
    let first: Vec<bool> = kept
        .column(DATE_COLUMN)?
        .date()?
        .as_date_iter()
        .map(|date| seen.insert(date))
        .collect();
    Ok(kept.filter(&BooleanChunked::new("first".into(), first))?)
}
