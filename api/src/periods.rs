use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::config::{Config, DEFAULT_TIMEZONE};
use crate::errors::{Error, Result};

/// Named relative ranges understood by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodName {
    Yesterday,
    ThisWeek,
    LastWeek,
    ThisMonth,
    LastMonth,
    ThisYear,
    LastYear,
}

impl PeriodName {
    pub const ALL: [PeriodName; 7] = [
        PeriodName::Yesterday,
        PeriodName::ThisWeek,
        PeriodName::LastWeek,
        PeriodName::ThisMonth,
        PeriodName::LastMonth,
        PeriodName::ThisYear,
        PeriodName::LastYear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodName::Yesterday => "yesterday",
            PeriodName::ThisWeek => "this_week",
            PeriodName::LastWeek => "last_week",
            PeriodName::ThisMonth => "this_month",
            PeriodName::LastMonth => "last_month",
            PeriodName::ThisYear => "this_year",
            PeriodName::LastYear => "last_year",
        }
    }
}

impl fmt::Display for PeriodName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        PeriodName::ALL
            .into_iter()
            .find(|period| period.as_str() == name)
            .ok_or_else(|| Error::InvalidPeriodName(s.to_string()))
    }
}

/// Absolute bounds produced by the resolver. Ranges ending at a boundary
/// report the last nanosecond before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl DateRange {
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        DateRange { start, end }
    }

    /// Number of whole local calendar days between the dates of both bounds.
    pub fn days(&self) -> i64 {
        (self.end.date_naive() - self.start.date_naive()).num_days()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PeriodResolver {
    timezone: Tz,
}

impl Default for PeriodResolver {
    fn default() -> Self {
        PeriodResolver::new(DEFAULT_TIMEZONE)
    }
}

impl From<&Config> for PeriodResolver {
    fn from(config: &Config) -> Self {
        PeriodResolver::new(config.timezone)
    }
}

impl PeriodResolver {
    pub fn new(timezone: Tz) -> Self {
        PeriodResolver { timezone }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn resolve_str(&self, name: &str, now: DateTime<Utc>) -> Result<DateRange> {
        Ok(self.resolve(name.parse()?, now))
    }

    pub fn resolve_now(&self, name: PeriodName) -> DateRange {
        self.resolve(name, Utc::now())
    }

    pub fn resolve(&self, name: PeriodName, now: DateTime<Utc>) -> DateRange {
        let now = now.with_timezone(&self.timezone);
        let today = now.date_naive();

        match name {
            PeriodName::Yesterday => {
                let start = today - ChronoDuration::days(1);
                self.closed(start, today)
            }
            PeriodName::ThisWeek => DateRange::new(self.midnight(week_start(today)), now),
            PeriodName::LastWeek => {
                let end = week_start(today);
                self.closed(end - ChronoDuration::days(7), end)
            }
            PeriodName::ThisMonth => DateRange::new(self.midnight(month_start(today)), now),
            PeriodName::LastMonth => {
                let end = month_start(today);
                self.closed(month_start(end - ChronoDuration::days(1)), end)
            }
            PeriodName::ThisYear => DateRange::new(self.midnight(year_start(today)), now),
            PeriodName::LastYear => {
                let end = year_start(today);
                self.closed(year_start(end - ChronoDuration::days(1)), end)
            }
        }
    }

    /// Local midnight of `start` up to one nanosecond before local midnight
    /// of `next`.
    fn closed(&self, start: NaiveDate, next: NaiveDate) -> DateRange {
        DateRange::new(
            self.midnight(start),
            self.midnight(next) - ChronoDuration::nanoseconds(1),
        )
    }

    fn midnight(&self, date: NaiveDate) -> DateTime<Tz> {
        local_midnight(self.timezone, date)
    }
}

/// First instant of `date` in `timezone`. A midnight skipped by a clock
/// change resolves to the first existing instant after it.
pub fn local_midnight(timezone: Tz, date: NaiveDate) -> DateTime<Tz> {
    let naive = date.and_time(NaiveTime::MIN);
    timezone
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            timezone
                .from_local_datetime(&(naive + ChronoDuration::hours(1)))
                .earliest()
        })
        .unwrap_or_else(|| timezone.from_utc_datetime(&naive))
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - ChronoDuration::days(date.weekday().num_days_from_sunday() as i64)
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date - ChronoDuration::days(date.day0() as i64)
}

fn year_start(date: NaiveDate) -> NaiveDate {
    date - ChronoDuration::days(date.ordinal0() as i64)
}
