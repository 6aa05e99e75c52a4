//! Polars helpers shared by the loaders, feature steps and model adapters

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use nalgebra::DMatrix;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

pub const ID_COLUMN: &str = "id";
pub const DATE_COLUMN: &str = "date";
pub const FAMILY_COLUMN: &str = "family";
pub const STORE_COLUMN: &str = "store_nbr";
pub const TARGET_COLUMN: &str = "sales";

/// Read a CSV with a fixed schema; nothing is inferred.
pub fn read_csv(path: &Path, schema: Schema) -> Result<DataFrame> {
    if !path.exists() {
        return Err(ForecastError::MissingInput {
            path: path.to_path_buf(),
        });
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_schema(Some(Arc::new(schema)))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    log::info!(
        "Loaded {} rows x {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(df)
}

/// Read a table written by [`write_csv`].
///
/// `date` is a date, `id` and `store_nbr` are integers, `family` is text and
/// every other column is Float64.
pub fn read_processed_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(ForecastError::MissingInput {
            path: path.to_path_buf(),
        });
    }

    // family dummy names can hold commas, so the header goes through a real CSV parser
    let mut rdr = csv::Reader::from_path(path)?;
    let schema = Schema::from_iter(
        rdr.headers()?
            .iter()
            .map(|name| Field::new(name.into(), processed_dtype(name))),
    );
    read_csv(path, schema)
}

fn processed_dtype(name: &str) -> DataType {
    match name {
        DATE_COLUMN => DataType::Date,
        ID_COLUMN | STORE_COLUMN => DataType::Int64,
        FAMILY_COLUMN => DataType::String,
        _ => DataType::Float64,
    }
}

/// Write `df` with a header row, creating parent directories.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    log::info!(
        "Wrote {} rows x {} columns to {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(())
}

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name).map_err(|_| {
        ForecastError::DataError(format!(
            "missing column '{}' (have {:?})",
            name,
            df.get_column_names_str()
        ))
    })
}

fn missing_values(name: &str) -> ForecastError {
    ForecastError::DataError(format!("column '{}' has missing values", name))
}

/// Numeric column as f64, whatever its physical type
pub fn float_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let cast = column(df, name)?.cast(&DataType::Float64)?;
    let values: Option<Vec<f64>> = cast.f64()?.into_iter().collect();
    values.ok_or_else(|| missing_values(name))
}

pub fn int_column(df: &DataFrame, name: &str) -> Result<Vec<i64>> {
    let cast = column(df, name)?.cast(&DataType::Int64)?;
    let values: Option<Vec<i64>> = cast.i64()?.into_iter().collect();
    values.ok_or_else(|| missing_values(name))
}

pub fn date_column(df: &DataFrame, name: &str) -> Result<Vec<NaiveDate>> {
    let values: Option<Vec<NaiveDate>> = column(df, name)?.date()?.as_date_iter().collect();
    values.ok_or_else(|| missing_values(name))
}

pub fn text_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let values: Option<Vec<String>> = column(df, name)?
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    values.ok_or_else(|| missing_values(name))
}

/// Names of the numeric columns, in table order
pub fn numeric_column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| c.dtype().is_primitive_numeric())
        .map(|c| c.name().to_string())
        .collect()
}

/// Rows are observations, columns follow `names`.
pub fn design_matrix(df: &DataFrame, names: &[String]) -> Result<DMatrix<f64>> {
    let columns = names
        .iter()
        .map(|name| float_column(df, name))
        .collect::<Result<Vec<_>>>()?;
    Ok(DMatrix::from_iterator(
        df.height(),
        names.len(),
        columns.into_iter().flatten(),
    ))
}

/// Dates of `df` joined against a `date`-keyed table must be unique there.
pub fn ensure_unique_dates(table: &str, df: &DataFrame) -> Result<()> {
    let mut seen = hashbrown::HashSet::with_capacity(df.height());
    for date in date_column(df, DATE_COLUMN)? {
        if !seen.insert(date) {
            return Err(ForecastError::JoinCardinality {
                table: table.to_string(),
                date,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;
    use tempfile::TempDir;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_processed_round_trip_keeps_floats() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed").join("train_X.csv");
        let mut df = df!(
            "date" => &[ymd(2013, 1, 1), ymd(2013, 1, 2)],
            "store_nbr" => &[1i64, 2],
            "family" => &["LIQUOR,WINE,BEER", "BEAUTY"],
            "sales" => &[2.0, 3.0],
            "LIQUOR,WINE,BEER" => &[1i32, 0]
        )
        .unwrap();

        write_csv(&mut df, &path).unwrap();
        let back = read_processed_csv(&path).unwrap();

        assert_eq!(back.get_column_names_str(), df.get_column_names_str());
        assert_eq!(back.column("sales").unwrap().dtype(), &DataType::Float64);
        assert_eq!(back.column("date").unwrap().dtype(), &DataType::Date);
        assert_eq!(back.column("store_nbr").unwrap().dtype(), &DataType::Int64);
        assert_eq!(float_column(&back, "sales").unwrap(), vec![2.0, 3.0]);
        assert_eq!(date_column(&back, "date").unwrap()[1], ymd(2013, 1, 2));
        assert_eq!(text_column(&back, "family").unwrap()[0], "LIQUOR,WINE,BEER");
    }

    #[test]
    fn test_design_matrix_is_row_major_view() {
        let df = df!("a" => &[1.0, 2.0, 3.0], "b" => &[10i64, 20, 30]).unwrap();
        let names = numeric_column_names(&df);
        let m = design_matrix(&df, &names).unwrap();
        assert_eq!(m.shape(), (3, 2));
        assert_eq!(m[(1, 0)], 2.0);
        assert_eq!(m[(2, 1)], 30.0);
    }

    #[test]
    fn test_missing_column_is_data_error() {
        let df = df!("a" => &[1.0]).unwrap();
        assert!(matches!(
            float_column(&df, "b"),
            Err(ForecastError::DataError(_))
        ));
    }

    #[test]
    fn test_duplicate_dates_detected() {
        let df = df!("date" => &[ymd(2013, 1, 1), ymd(2013, 1, 1)]).unwrap();
        assert!(matches!(
            ensure_unique_dates("oil", &df),
            Err(ForecastError::JoinCardinality { table, .. }) if table == "oil"
        ));
    }
}
