use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

use crate::config::{Config, DEFAULT_TIMEZONE};
use crate::errors::{Error, InputField, Result};
use crate::models::{Period, Point, TimeSeries, TimeSeriesEntry};
use crate::resolution::Resolution;

/// A single sample with absolute bounds, detached from its document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatRecord {
    pub metering_point_id: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub measurement: f64,
    pub quality: String,
    pub unit: String,
    pub curve_type: String,
    pub business_type: String,
    pub resolution: Resolution,
}

/// Turns nested period/point documents into absolute-time records.
///
/// Bounds are expressed in the configured civil timezone. Fixed resolutions
/// step from the period start by `(position - 1) * duration`, which keeps
/// daylight saving days at their real number of hours. Monthly and yearly
/// periods collapse into a single record spanning the period.
#[derive(Debug, Clone, Copy)]
pub struct Flattener {
    timezone: Tz,
}

impl Default for Flattener {
    fn default() -> Self {
        Flattener::new(DEFAULT_TIMEZONE)
    }
}

impl From<&Config> for Flattener {
    fn from(config: &Config) -> Self {
        Flattener::new(config.timezone)
    }
}

impl Flattener {
    pub fn new(timezone: Tz) -> Self {
        Flattener { timezone }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Flattens every entry of the document in document order. Any malformed
    /// number fails the whole document.
    pub fn flatten(&self, document: &TimeSeries) -> Result<Vec<FlatRecord>> {
        let mut records = Vec::new();

        for (entry_index, entry) in document.market_document.time_series.iter().enumerate() {
            for (period_index, period) in entry.periods.iter().enumerate() {
                let location = Location {
                    entry: entry_index,
                    period: period_index,
                };
                self.flatten_period(entry, period, location, &mut records)?;
            }
        }

        Ok(records)
    }

    /// Flattens a batch of documents, keeping them apart.
    pub fn flatten_all(&self, documents: &[TimeSeries]) -> Result<Vec<Vec<FlatRecord>>> {
        documents.iter().map(|document| self.flatten(document)).collect()
    }

    fn flatten_period(
        &self,
        entry: &TimeSeriesEntry,
        period: &Period,
        location: Location,
        records: &mut Vec<FlatRecord>,
    ) -> Result<()> {
        let period_start = period.time_interval.start.with_timezone(&self.timezone);
        let period_end = period.time_interval.end.with_timezone(&self.timezone);

        let step = match period.resolution.fixed_duration() {
            Some(step) => step,
            None => {
                let mut measurements = Vec::with_capacity(period.points.len());
                for (point_index, point) in period.points.iter().enumerate() {
                    measurements.push(parse_quantity(point, location.at(point_index))?);
                }

                if let (Some(point), Some(measurement)) = (period.points.first(), measurements.first()) {
                    if period.points.len() > 1 {
                        warn!(
                            "Period {} of {} has {} points at resolution {}, keeping the first",
                            location.period,
                            entry.mrid,
                            period.points.len(),
                            period.resolution
                        );
                    }
                    records.push(self.record(entry, period, point, *measurement, period_start, period_end));
                }
                return Ok(());
            }
        };

        for (point_index, point) in period.points.iter().enumerate() {
            let at = location.at(point_index);
            let position = parse_position(point, at)?;
            let measurement = parse_quantity(point, at)?;

            let (start, end) = step
                .checked_mul(position - 1)
                .and_then(|offset| period_start.checked_add_signed(offset))
                .and_then(|start| Some((start, start.checked_add_signed(step)?)))
                .ok_or_else(|| at.malformed(InputField::Position, &point.position))?;

            records.push(self.record(entry, period, point, measurement, start, end));
        }

        Ok(())
    }

    fn record(
        &self,
        entry: &TimeSeriesEntry,
        period: &Period,
        point: &Point,
        measurement: f64,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> FlatRecord {
        FlatRecord {
            metering_point_id: entry.mrid.clone(),
            start,
            end,
            measurement,
            quality: point.quality.clone(),
            unit: entry.measurement_unit_name.clone(),
            curve_type: entry.curve_type.clone(),
            business_type: entry.business_type.clone(),
            resolution: period.resolution,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Location {
    entry: usize,
    period: usize,
}

impl Location {
    fn at(self, point: usize) -> PointLocation {
        PointLocation {
            entry: self.entry,
            period: self.period,
            point,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PointLocation {
    entry: usize,
    period: usize,
    point: usize,
}

impl PointLocation {
    fn malformed(self, field: InputField, value: &str) -> Error {
        Error::MalformedInput {
            field,
            entry: self.entry,
            period: self.period,
            point: self.point,
            value: value.to_string(),
        }
    }
}

fn parse_position(point: &Point, at: PointLocation) -> Result<i32> {
    match point.position.parse::<i32>() {
        Ok(position) if position >= 1 => Ok(position),
        _ => Err(at.malformed(InputField::Position, &point.position)),
    }
}

fn parse_quantity(point: &Point, at: PointLocation) -> Result<f64> {
    match point.quantity.parse::<f64>() {
        Ok(quantity) if quantity.is_finite() => Ok(quantity),
        _ => Err(at.malformed(InputField::Quantity, &point.quantity)),
    }
}
