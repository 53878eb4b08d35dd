use std::fmt;
use std::str::FromStr;

use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Sampling granularity of a time series period as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "PT15M")]
    Quarter15m,
    #[serde(rename = "PT1H")]
    Hour,
    #[serde(rename = "PT1D")]
    Day,
    #[serde(rename = "P1M")]
    Month,
    #[serde(rename = "PT1Y")]
    Year,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Quarter15m => "PT15M",
            Resolution::Hour => "PT1H",
            Resolution::Day => "PT1D",
            Resolution::Month => "P1M",
            Resolution::Year => "PT1Y",
        }
    }

    /// Constant length of one point, `None` for calendar based resolutions
    /// where the length depends on the month or year the point falls in.
    pub fn fixed_duration(&self) -> Option<ChronoDuration> {
        match self {
            Resolution::Quarter15m => Some(ChronoDuration::minutes(15)),
            Resolution::Hour => Some(ChronoDuration::hours(1)),
            Resolution::Day => Some(ChronoDuration::hours(24)),
            Resolution::Month | Resolution::Year => None,
        }
    }

    pub fn is_calendar_variable(&self) -> bool {
        self.fixed_duration().is_none()
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PT15M" => Ok(Resolution::Quarter15m),
            "PT1H" => Ok(Resolution::Hour),
            "PT1D" => Ok(Resolution::Day),
            "P1M" => Ok(Resolution::Month),
            "PT1Y" => Ok(Resolution::Year),
            _ => Err(Error::InvalidResolution(s.to_string())),
        }
    }
}

/// Aggregation level requested from the time series endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aggregation {
    Actual,
    Quarter,
    Hour,
    Day,
    Month,
    Year,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Actual => "Actual",
            Aggregation::Quarter => "Quarter",
            Aggregation::Hour => "Hour",
            Aggregation::Day => "Day",
            Aggregation::Month => "Month",
            Aggregation::Year => "Year",
        }
    }

    /// Resolution the platform answers with for this aggregation. `Actual`
    /// returns whatever the meter records, so it has no fixed answer.
    pub fn resolution(&self) -> Option<Resolution> {
        match self {
            Aggregation::Actual => None,
            Aggregation::Quarter => Some(Resolution::Quarter15m),
            Aggregation::Hour => Some(Resolution::Hour),
            Aggregation::Day => Some(Resolution::Day),
            Aggregation::Month => Some(Resolution::Month),
            Aggregation::Year => Some(Resolution::Year),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Aggregation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "actual" => Ok(Aggregation::Actual),
            "quarter" => Ok(Aggregation::Quarter),
            "hour" => Ok(Aggregation::Hour),
            "day" => Ok(Aggregation::Day),
            "month" => Ok(Aggregation::Month),
            "year" => Ok(Aggregation::Year),
            _ => Err(Error::InvalidAggregation(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_durations() {
        assert_eq!(Resolution::Quarter15m.fixed_duration(), Some(ChronoDuration::minutes(15)));
        assert_eq!(Resolution::Hour.fixed_duration(), Some(ChronoDuration::hours(1)));
        assert_eq!(Resolution::Day.fixed_duration(), Some(ChronoDuration::hours(24)));
        assert!(Resolution::Month.is_calendar_variable());
        assert!(Resolution::Year.is_calendar_variable());
        assert!(!Resolution::Day.is_calendar_variable());
    }

    #[test]
    fn test_resolution_wire_names() {
        let parsed: Vec<Resolution> =
            serde_json::from_str(r#"["PT15M", "PT1H", "PT1D", "P1M", "PT1Y"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![
                Resolution::Quarter15m,
                Resolution::Hour,
                Resolution::Day,
                Resolution::Month,
                Resolution::Year
            ]
        );
        assert_eq!("P1M".parse::<Resolution>().unwrap(), Resolution::Month);
        assert!(matches!("P1Y".parse::<Resolution>(), Err(Error::InvalidResolution(_))));
        assert!(serde_json::from_str::<Resolution>(r#""PT30M""#).is_err());
    }

    #[test]
    fn test_aggregation_parsing() {
        assert_eq!("hour".parse::<Aggregation>().unwrap(), Aggregation::Hour);
        assert_eq!("Quarter".parse::<Aggregation>().unwrap(), Aggregation::Quarter);
        assert_eq!(Aggregation::Month.to_string(), "Month");
        assert_eq!(Aggregation::Quarter.resolution(), Some(Resolution::Quarter15m));
        assert_eq!(Aggregation::Actual.resolution(), None);
        assert!(matches!("weekly".parse::<Aggregation>(), Err(Error::InvalidAggregation(_))));
    }
}
