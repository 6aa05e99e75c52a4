//! Feature generator variants and the train/test design matrices

use crate::config::{CustomFeatureFlags, DataConfig, FeatureGeneratorKind};
use crate::data::DataLoader;
use crate::error::{ForecastError, Result};
use crate::features::steps::{
    DayOfMonthOneHot, DayOfWeekOneHot, DropRawColumns, EarthquakeRelevancy, FamilyOneHot,
    FeatureStep, HolidayJoin, OilPriceJoin, StoreOneHot, TimeIndex,
};
use crate::models::InputShape;
use crate::table::{ID_COLUMN, TARGET_COLUMN};
use polars::prelude::*;

/// Which feature steps run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureVariant {
    /// Time index plus family and store dummies
    Simple,
    /// Every step
    All,
    /// Steps switched by configuration
    Custom(CustomFeatureFlags),
}

impl FeatureVariant {
    pub fn from_config(config: &DataConfig) -> Self {
        match config.generator_kind() {
            FeatureGeneratorKind::Simple => FeatureVariant::Simple,
            FeatureGeneratorKind::All => FeatureVariant::All,
            FeatureGeneratorKind::Custom => FeatureVariant::Custom(config.custom_feature_generator),
        }
    }

    /// Step switches equivalent to this variant
    pub fn flags(&self) -> CustomFeatureFlags {
        match self {
            FeatureVariant::Simple => CustomFeatureFlags::simple(),
            FeatureVariant::All => CustomFeatureFlags::all(),
            FeatureVariant::Custom(flags) => *flags,
        }
    }
}

#[derive(Debug, Clone)]
struct Processed {
    train_x: DataFrame,
    train_y: DataFrame,
    test_x: DataFrame,
}

/// Runs a feature pipeline over the raw train and test tables
pub struct FeaturesGenerator {
    variant: FeatureVariant,
    input_shape: InputShape,
    loader: DataLoader,
    processed: Option<Processed>,
}

impl FeaturesGenerator {
    /// `input_shape` comes from the forecasting model that will consume the
    /// features; split models get no family/store dummies.
    pub fn new(variant: FeatureVariant, input_shape: InputShape, loader: DataLoader) -> Self {
        Self {
            variant,
            input_shape,
            loader,
            processed: None,
        }
    }

    pub fn from_config(config: &DataConfig, input_shape: InputShape, loader: DataLoader) -> Self {
        Self::new(FeatureVariant::from_config(config), input_shape, loader)
    }

    pub fn variant(&self) -> FeatureVariant {
        self.variant
    }

    pub fn input_shape(&self) -> InputShape {
        self.input_shape
    }

    /// Ordered steps for this variant. Oil and holiday tables are only
    /// loaded when their step is enabled.
    pub fn build_pipeline(&self) -> Result<Vec<Box<dyn FeatureStep>>> {
        let flags = self.variant.flags();
        let splitting = self.input_shape == InputShape::SplitBySeries;
        let mut steps: Vec<Box<dyn FeatureStep>> = Vec::new();

        if flags.index {
            steps.push(Box::new(TimeIndex));
        }
        if flags.family && !splitting {
            steps.push(Box::new(FamilyOneHot));
        }
        if flags.store_number && !splitting {
            steps.push(Box::new(StoreOneHot));
        }
        if flags.oil_price {
            steps.push(Box::new(OilPriceJoin::new(self.loader.load_oil_df()?)?));
        }
        if flags.holidays_and_events {
            steps.push(Box::new(HolidayJoin::new(self.loader.load_events_df()?)?));
        }
        if flags.day_of_week {
            steps.push(Box::new(DayOfWeekOneHot));
        }
        if flags.day_of_month {
            steps.push(Box::new(DayOfMonthOneHot));
        }
        if flags.earthquake {
            steps.push(Box::new(EarthquakeRelevancy::default()));
        }
        steps.push(Box::new(DropRawColumns {
            keep_partition_keys: splitting,
        }));

        log::info!(
            "Feature pipeline: {}",
            steps.iter().map(|s| s.name()).collect::<Vec<_>>().join(" -> ")
        );
        Ok(steps)
    }

    /// Load the raw train and test files and build the design matrices.
    pub fn preprocess_data(&mut self) -> Result<()> {
        let train = self.loader.load_train_df()?;
        let test = self.loader.load_test_df()?;
        self.preprocess_tables(train, test)
    }

    /// Build the design matrices from already loaded train and test tables.
    pub fn preprocess_tables(&mut self, train: DataFrame, test: DataFrame) -> Result<()> {
        let steps = self.build_pipeline()?;
        let train = run_pipeline(&steps, train)?;
        let test = run_pipeline(&steps, test)?;

        let (train_x, train_y) = split_training(train)?;
        let test_x = align_test(&train_x, test)?;
        log::info!(
            "Generated {} features: train {} rows, test {} rows",
            train_x.width(),
            train_x.height(),
            test_x.height()
        );

        self.processed = Some(Processed {
            train_x,
            train_y,
            test_x,
        });
        Ok(())
    }

    /// `(X, Y)` for training
    pub fn get_train_data(&self) -> Result<(&DataFrame, &DataFrame)> {
        let processed = self.processed.as_ref().ok_or(ForecastError::NotPreprocessed)?;
        Ok((&processed.train_x, &processed.train_y))
    }

    /// Test design matrix, `id` first
    pub fn get_test_data(&self) -> Result<&DataFrame> {
        let processed = self.processed.as_ref().ok_or(ForecastError::NotPreprocessed)?;
        Ok(&processed.test_x)
    }
}

/// Apply `steps` in order, checking that no step changes the row count.
pub fn run_pipeline(steps: &[Box<dyn FeatureStep>], mut df: DataFrame) -> Result<DataFrame> {
    let n_rows = df.height();
    for step in steps {
        df = step.apply(df)?;
        if df.height() != n_rows {
            return Err(ForecastError::DataError(format!(
                "feature step {} changed row count from {} to {}",
                step.name(),
                n_rows,
                df.height()
            )));
        }
        log::debug!("{}: {} columns", step.name(), df.width());
    }
    Ok(df)
}

/// X is everything but `id` and `sales`; Y is `sales` alone.
fn split_training(train: DataFrame) -> Result<(DataFrame, DataFrame)> {
    let y = train.select([TARGET_COLUMN])?;
    let x = train.drop_many([ID_COLUMN, TARGET_COLUMN]);
    Ok((x, y))
}

/// Lay the test table out like the training X, with `id` in front.
///
/// Dummy columns only seen in training are added as zeros; dummy columns
/// only seen in test are dropped.
fn align_test(train_x: &DataFrame, test: DataFrame) -> Result<DataFrame> {
    let mut columns = vec![test.column(ID_COLUMN)?.clone()];

    let mut filled = Vec::new();
    for name in train_x.get_column_names_str() {
        match test.column(name) {
            Ok(column) => columns.push(column.clone()),
            Err(_) => {
                filled.push(name.to_string());
                columns.push(Column::new(name.into(), vec![0i32; test.height()]));
            }
        }
    }

    let dropped: Vec<&str> = test
        .get_column_names_str()
        .into_iter()
        .filter(|name| *name != ID_COLUMN && train_x.column(name).is_err())
        .collect();
    if !filled.is_empty() || !dropped.is_empty() {
        log::info!(
            "Aligned test features: {} zero-filled {:?}, {} dropped {:?}",
            filled.len(),
            filled,
            dropped.len(),
            dropped
        );
    }
    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathConfig;
    use crate::table::float_column;
    use chrono::NaiveDate;

    fn sales(dates: &[(i32, u32, u32)], stores: &[i64], with_sales: bool) -> DataFrame {
        let n = dates.len();
        let dates: Vec<NaiveDate> = dates
            .iter()
            .map(|&(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
            .collect();
        let mut columns = vec![
            Column::new("id".into(), (0..n as i64).collect::<Vec<_>>()),
            Column::new("date".into(), dates),
            Column::new("store_nbr".into(), stores.to_vec()),
            Column::new("family".into(), vec!["A"; n]),
        ];
        if with_sales {
            columns.push(Column::new("sales".into(), vec![1.0; n]));
        }
        columns.push(Column::new("onpromotion".into(), vec![0i64; n]));
        DataFrame::new(columns).unwrap()
    }

    fn loader() -> DataLoader {
        DataLoader::new(PathConfig::new("/nonexistent", "/nonexistent", "/nonexistent"))
    }

    #[test]
    fn test_simple_flat_layout() {
        let mut generator =
            FeaturesGenerator::new(FeatureVariant::Simple, InputShape::Flat, loader());
        generator
            .preprocess_tables(
                sales(&[(2013, 1, 1), (2013, 1, 2)], &[1, 2], true),
                sales(&[(2017, 8, 16)], &[3], false),
            )
            .unwrap();

        let (x, y) = generator.get_train_data().unwrap();
        assert_eq!(
            x.get_column_names_str(),
            vec!["onpromotion", "time", "A", "s_nbr_1", "s_nbr_2"]
        );
        assert_eq!(y.get_column_names_str(), vec!["sales"]);

        let test = generator.get_test_data().unwrap();
        assert_eq!(
            test.get_column_names_str(),
            vec!["id", "onpromotion", "time", "A", "s_nbr_1", "s_nbr_2"]
        );
        assert_eq!(float_column(test, "s_nbr_1").unwrap(), vec![0.0]);
    }

    #[test]
    fn test_split_shape_keeps_partition_keys() {
        let mut generator =
            FeaturesGenerator::new(FeatureVariant::Simple, InputShape::SplitBySeries, loader());
        generator
            .preprocess_tables(
                sales(&[(2013, 1, 1)], &[1], true),
                sales(&[(2013, 1, 2)], &[1], false),
            )
            .unwrap();

        let (x, _) = generator.get_train_data().unwrap();
        assert_eq!(
            x.get_column_names_str(),
            vec!["date", "store_nbr", "family", "onpromotion", "time"]
        );
    }

    #[test]
    fn test_custom_without_joins_never_loads_files() {
        let flags = CustomFeatureFlags {
            day_of_week: true,
            ..CustomFeatureFlags::none()
        };
        let generator =
            FeaturesGenerator::new(FeatureVariant::Custom(flags), InputShape::Flat, loader());
        let steps = generator.build_pipeline().unwrap();
        let names: Vec<&str> = steps.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["day-of-week", "drop-raw-columns"]);
    }

    #[test]
    fn test_all_variant_needs_oil_file() {
        let generator = FeaturesGenerator::new(FeatureVariant::All, InputShape::Flat, loader());
        assert!(matches!(
            generator.build_pipeline(),
            Err(ForecastError::MissingInput { .. })
        ));
    }

    #[test]
    fn test_data_before_preprocessing() {
        let generator = FeaturesGenerator::new(FeatureVariant::Simple, InputShape::Flat, loader());
        assert!(matches!(
            generator.get_train_data(),
            Err(ForecastError::NotPreprocessed)
        ));
        assert!(matches!(
            generator.get_test_data(),
            Err(ForecastError::NotPreprocessed)
        ));
    }
}
