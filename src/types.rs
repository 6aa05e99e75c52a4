//! Holiday calendar vocabulary

use crate::error::ForecastError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of entry in the holidays and events calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HolidayType {
    Holiday,
    Additional,
    Bridge,
    Transfer,
    Event,
    WorkDay,
}

impl HolidayType {
    /// Types that count as a day off for the holiday features
    pub const RELEVANT: [HolidayType; 3] =
        [HolidayType::Holiday, HolidayType::Additional, HolidayType::Bridge];

    pub fn as_str(&self) -> &'static str {
        match self {
            HolidayType::Holiday => "Holiday",
            HolidayType::Additional => "Additional",
            HolidayType::Bridge => "Bridge",
            HolidayType::Transfer => "Transfer",
            HolidayType::Event => "Event",
            HolidayType::WorkDay => "Work Day",
        }
    }

    pub fn is_relevant(&self) -> bool {
        Self::RELEVANT.contains(self)
    }
}

impl fmt::Display for HolidayType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HolidayType {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Holiday" => Ok(HolidayType::Holiday),
            "Additional" => Ok(HolidayType::Additional),
            "Bridge" => Ok(HolidayType::Bridge),
            "Transfer" => Ok(HolidayType::Transfer),
            "Event" => Ok(HolidayType::Event),
            "Work Day" => Ok(HolidayType::WorkDay),
            other => Err(ForecastError::ParseError(format!(
                "unknown holiday type '{}'",
                other
            ))),
        }
    }
}

/// Scope of a holiday entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    Local,
    Regional,
    National,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Local => "Local",
            Locale::Regional => "Regional",
            Locale::National => "National",
        }
    }
}
