//! Feature engineering
//!
//! A feature pipeline is an ordered list of [`FeatureStep`]s chosen by a
//! [`FeatureVariant`]. The [`FeaturesGenerator`] runs it over the raw train
//! and test tables and separates design matrices from the target.

pub mod generator;
pub mod steps;

pub use generator::{run_pipeline, FeatureVariant, FeaturesGenerator};
pub use steps::{
    DayOfMonthOneHot, DayOfWeekOneHot, DropRawColumns, EarthquakeRelevancy, FamilyOneHot,
    FeatureStep, HolidayJoin, OilPriceJoin, StoreOneHot, TimeIndex,
};
