//! Per-series partitioning of a flat feature table
//!
//! The [`Splitter`] cuts a table into one daily [`Series`] per
//! `(family, store_nbr)` pair, fits one copy of a [`SeriesForecaster`] per
//! series and stitches the per-series predictions back into the row order
//! of the flat table, by date.

use crate::error::{ForecastError, Result};
use crate::estimators::SeriesForecaster;
use crate::features::steps::TIME_COLUMN;
use crate::table::{
    date_column, float_column, int_column, numeric_column_names, text_column, DATE_COLUMN,
    FAMILY_COLUMN, ID_COLUMN, STORE_COLUMN, TARGET_COLUMN,
};
use chrono::{Duration, NaiveDate};
use polars::prelude::{Column, DataFrame};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Series key, `"{family}-{store}"`
pub type SeriesKey = String;

/// Columns that identify a row rather than describe it
pub const PARTITION_COLUMNS: [&str; 3] = [DATE_COLUMN, STORE_COLUMN, FAMILY_COLUMN];

const ROW_COLUMN: &str = "row";

/// How calendar gaps are filled after reindexing to daily frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GapFill {
    /// Straight line between the neighbouring observations
    #[default]
    Linear,
    /// Value of the closer neighbour (earlier one on ties)
    Nearest,
}

/// One store/family daily history
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    key: SeriesKey,
    dates: Vec<NaiveDate>,
    target: Option<Vec<f64>>,
    covariate_names: Vec<String>,
    /// One vector per covariate, aligned with `dates`
    covariates: Vec<Vec<f64>>,
    /// Flat-table row of each position, `None` for filled gaps
    source_rows: Vec<Option<usize>>,
}

impl Series {
    /// Series with a target only, on consecutive days from 1970-01-01.
    pub fn from_target(key: impl Into<SeriesKey>, values: &[f64]) -> Self {
        let start = NaiveDate::default();
        Self {
            key: key.into(),
            dates: (0..values.len())
                .map(|i| start + Duration::days(i as i64))
                .collect(),
            target: Some(values.to_vec()),
            covariate_names: Vec::new(),
            covariates: Vec::new(),
            source_rows: (0..values.len()).map(Some).collect(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn target(&self) -> Option<&[f64]> {
        self.target.as_deref()
    }

    pub fn covariate_names(&self) -> &[String] {
        &self.covariate_names
    }

    /// Covariate values at position `t`
    pub fn covariate_row(&self, t: usize) -> Vec<f64> {
        self.covariates.iter().map(|c| c[t]).collect()
    }

    pub fn source_rows(&self) -> &[Option<usize>] {
        &self.source_rows
    }

    /// Number of positions filled by interpolation
    pub fn n_filled(&self) -> usize {
        self.source_rows.iter().filter(|r| r.is_none()).count()
    }

    /// The same series running from `start` to its last date, without target.
    ///
    /// Days before the first date are prepended with the first day's
    /// covariates; days before `start` are cut off.
    pub fn rebase(&self, start: NaiveDate) -> Series {
        let (Some(first), Some(last)) = (self.first_date(), self.last_date()) else {
            return self.clone();
        };
        let len = (last - start).num_days().max(0) as usize + 1;
        let lead = (first - start).num_days();

        let source = |pos: usize| -> Option<usize> {
            let t = pos as i64 - lead;
            (t >= 0).then_some(t as usize)
        };

        Series {
            key: self.key.clone(),
            dates: (0..len).map(|i| start + Duration::days(i as i64)).collect(),
            target: None,
            covariate_names: self.covariate_names.clone(),
            covariates: self
                .covariates
                .iter()
                .map(|values| {
                    (0..len)
                        .map(|pos| values[source(pos).unwrap_or(0)])
                        .collect()
                })
                .collect(),
            source_rows: (0..len)
                .map(|pos| source(pos).and_then(|t| self.source_rows[t]))
                .collect(),
        }
    }
}

/// Output of [`Splitter::split_data`]
#[derive(Debug, Clone, PartialEq)]
pub struct SplitData {
    series: BTreeMap<SeriesKey, Series>,
    n_rows: usize,
}

impl SplitData {
    /// Rows in the flat table this was split from
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &SeriesKey> {
        self.series.keys()
    }

    pub fn get(&self, key: &str) -> Option<&Series> {
        self.series.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SeriesKey, &Series)> {
        self.series.iter()
    }
}

/// A sub-model with the date range it was trained on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedSeries<M> {
    pub model: M,
    /// First training date
    pub start: NaiveDate,
    /// Last training date
    pub end: NaiveDate,
}

/// Splits tables into series and drives per-series fit/forecast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Splitter {
    gap_fill: GapFill,
}

impl Splitter {
    pub fn new(gap_fill: GapFill) -> Self {
        Self { gap_fill }
    }

    pub fn gap_fill(&self) -> GapFill {
        self.gap_fill
    }

    /// Partition `x` (and the aligned target `y`, if given) by series key.
    ///
    /// Every numeric column of `x` other than `store_nbr`, `id` and `time`
    /// becomes a covariate; a series' position already carries its time.
    /// Each series is reindexed to daily frequency between its first and
    /// last date.
    pub fn split_data(&self, x: &DataFrame, y: Option<&DataFrame>) -> Result<SplitData> {
        let mut indexed = x.with_row_index(ROW_COLUMN.into(), None)?;
        if let Some(y) = y {
            let values = target_values(y)?;
            if values.len() != x.height() {
                return Err(ForecastError::DataError(format!(
                    "X has {} rows, Y has {}",
                    x.height(),
                    values.len()
                )));
            }
            indexed.with_column(Column::new(TARGET_COLUMN.into(), values))?;
        }

        let covariate_names: Vec<String> = numeric_column_names(x)
            .into_iter()
            .filter(|name| {
                ![STORE_COLUMN, ID_COLUMN, TIME_COLUMN, TARGET_COLUMN].contains(&name.as_str())
            })
            .collect();

        let mut series = BTreeMap::new();
        let parts = if indexed.height() == 0 {
            Vec::new()
        } else {
            indexed.partition_by_stable([FAMILY_COLUMN, STORE_COLUMN], true)?
        };
        for part in parts {
            let family = text_column(&part, FAMILY_COLUMN)?;
            let store = int_column(&part, STORE_COLUMN)?;
            let key = format!("{}-{}", family[0], store[0]);
            let built = self.build_series(key.clone(), &part, y.is_some(), &covariate_names)?;
            series.insert(key, built);
        }

        let filled: usize = series.values().map(Series::n_filled).sum();
        log::info!(
            "Split {} rows into {} series ({} gap days filled)",
            x.height(),
            series.len(),
            filled
        );

        Ok(SplitData {
            series,
            n_rows: x.height(),
        })
    }

    fn build_series(
        &self,
        key: SeriesKey,
        part: &DataFrame,
        with_target: bool,
        covariate_names: &[String],
    ) -> Result<Series> {
        let dates = date_column(part, DATE_COLUMN)?;
        let rows = int_column(part, ROW_COLUMN)?;

        let mut order: Vec<usize> = (0..dates.len()).collect();
        order.sort_by_key(|&i| dates[i]);
        for pair in order.windows(2) {
            if dates[pair[0]] == dates[pair[1]] {
                return Err(ForecastError::DataError(format!(
                    "series {} has two rows for {}",
                    key, dates[pair[0]]
                )));
            }
        }

        let first = dates[order[0]];
        let last = dates[order[order.len() - 1]];
        let len = (last - first).num_days() as usize + 1;

        // (grid position, partition row) of every observation, by date
        let known: Vec<(usize, usize)> = order
            .iter()
            .map(|&i| ((dates[i] - first).num_days() as usize, i))
            .collect();
        let mut source_rows = vec![None; len];
        for &(pos, i) in &known {
            source_rows[pos] = Some(rows[i] as usize);
        }

        let fill = |name: &str| -> Result<Vec<f64>> {
            Ok(self.fill_gaps(&known, &float_column(part, name)?, len))
        };

        Ok(Series {
            dates: (0..len).map(|i| first + Duration::days(i as i64)).collect(),
            target: if with_target {
                Some(fill(TARGET_COLUMN)?)
            } else {
                None
            },
            covariate_names: covariate_names.to_vec(),
            covariates: covariate_names
                .iter()
                .map(|name| fill(name))
                .collect::<Result<Vec<_>>>()?,
            source_rows,
            key,
        })
    }

    /// Lay observed `values` onto a daily grid of `len` days and fill gaps.
    fn fill_gaps(&self, known: &[(usize, usize)], values: &[f64], len: usize) -> Vec<f64> {
        let mut out = vec![0.0; len];
        for pair in known.windows(2) {
            let (p0, v0) = (pair[0].0, values[pair[0].1]);
            let (p1, v1) = (pair[1].0, values[pair[1].1]);
            for pos in p0..p1 {
                out[pos] = match self.gap_fill {
                    GapFill::Linear => v0 + (v1 - v0) * (pos - p0) as f64 / (p1 - p0) as f64,
                    GapFill::Nearest => {
                        if pos - p0 <= p1 - pos {
                            v0
                        } else {
                            v1
                        }
                    }
                };
            }
        }
        // the grid always ends on an observation
        if let Some(&(pos, i)) = known.last() {
            out[pos] = values[i];
        }
        out
    }

    /// Fit one copy of `template` per series.
    ///
    /// Fits run in parallel; the result is ordered by key.
    pub fn fit_split_data<M>(
        &self,
        template: &M,
        data: &SplitData,
    ) -> Result<BTreeMap<SeriesKey, FittedSeries<M>>>
    where
        M: SeriesForecaster + Clone,
    {
        log::info!("Fitting {} on {} series", template.name(), data.len());

        let fitted = data
            .series
            .par_iter()
            .map(|(key, series)| -> Result<(SeriesKey, FittedSeries<M>)> {
                let (Some(start), Some(end)) = (series.first_date(), series.last_date()) else {
                    return Err(ForecastError::DataError(format!("series {} is empty", key)));
                };
                let mut model = template.clone();
                model.fit(series)?;
                Ok((key.clone(), FittedSeries { model, start, end }))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(fitted.into_iter().collect())
    }

    /// Predict every series and reassemble one value per flat-table row.
    ///
    /// Dates inside a series' training range take the in-sample fit; later
    /// dates take the forecast that starts the day after training ended.
    /// Values at filled gap positions are dropped. A series without a fitted
    /// model, or starting before its training range, is an error.
    pub fn forecast_split_data<M>(
        &self,
        models: &BTreeMap<SeriesKey, FittedSeries<M>>,
        data: &SplitData,
    ) -> Result<Vec<f64>>
    where
        M: SeriesForecaster,
    {
        let per_series = data
            .series
            .par_iter()
            .map(|(key, series)| -> Result<(Vec<Option<usize>>, Vec<f64>)> {
                let fitted = models
                    .get(key)
                    .ok_or_else(|| ForecastError::MissingSeries(key.clone()))?;
                let values = predict_series(fitted, series)?;
                Ok((series.source_rows.clone(), values))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut out = vec![0.0; data.n_rows];
        for (source_rows, values) in per_series {
            for (row, value) in source_rows.into_iter().zip(values) {
                if let Some(r) = row {
                    out[r] = value;
                }
            }
        }
        Ok(out)
    }
}

/// One value per position of `series`, aligned on the calendar.
fn predict_series<M>(fitted: &FittedSeries<M>, series: &Series) -> Result<Vec<f64>>
where
    M: SeriesForecaster,
{
    let model = &fitted.model;
    let (Some(first), Some(last)) = (series.first_date(), series.last_date()) else {
        return Ok(Vec::new());
    };
    if first < fitted.start {
        return Err(ForecastError::DataError(format!(
            "series {} starts on {}, before its training start {}",
            series.key(),
            first,
            fitted.start
        )));
    }

    let in_sample = if first <= fitted.end {
        model.in_sample()?
    } else {
        Vec::new()
    };

    let horizon_start = fitted.end + Duration::days(1);
    let forecast = if last > fitted.end {
        let window = series.rebase(horizon_start);
        let forecast = model.forecast(&window)?;
        if forecast.len() != window.len() {
            return Err(ForecastError::EstimatorError(format!(
                "{} returned {} values for series {} of length {}",
                model.name(),
                forecast.len(),
                series.key(),
                window.len()
            )));
        }
        forecast
    } else {
        Vec::new()
    };

    series
        .dates()
        .iter()
        .map(|date| {
            let (values, step) = if *date <= fitted.end {
                (&in_sample, (*date - fitted.start).num_days() as usize)
            } else {
                (&forecast, (*date - horizon_start).num_days() as usize)
            };
            values.get(step).copied().ok_or_else(|| {
                ForecastError::EstimatorError(format!(
                    "{} has no value for series {} on {}",
                    model.name(),
                    series.key(),
                    date
                ))
            })
        })
        .collect()
}

/// Target vector from a `sales` column, or from a single-column table
pub fn target_values(y: &DataFrame) -> Result<Vec<f64>> {
    if y.column(TARGET_COLUMN).is_ok() {
        return float_column(y, TARGET_COLUMN);
    }
    match y.get_column_names_str().as_slice() {
        [only] => float_column(y, only),
        names => Err(ForecastError::DataError(format!(
            "target table needs a 'sales' column, found {:?}",
            names
        ))),
    }
}
