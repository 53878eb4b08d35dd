use chrono_tz::Tz;
use eloverblik::{parse_timezone, Aggregation, Mode};
use serde::{Deserialize, Serialize};

/// Most metering points accepted in one request.
pub const MAX_METERING_POINTS: usize = 10;

const METERING_POINT_ID_LENGTH: usize = 18;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SettingsConfig {
    pub mode: Option<String>,
    pub timezone: Option<String>,
    pub aggregation: Option<String>,
    #[serde(default)]
    pub metering_points: Vec<String>,
}

impl SettingsConfig {
    pub fn get_mode(&self) -> Option<Mode> {
        self.mode.as_deref().and_then(|mode| mode.parse().ok())
    }

    pub fn get_timezone(&self) -> Option<Tz> {
        self.timezone.as_deref().and_then(|timezone| parse_timezone(timezone).ok())
    }

    pub fn get_aggregation(&self) -> Option<Aggregation> {
        self.aggregation
            .as_deref()
            .and_then(|aggregation| aggregation.parse().ok())
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.mode.is_some() && self.get_mode().is_none() {
            return Err("mode must be one of prod, production, release, test, preprod or preproduction");
        }

        if self.timezone.is_some() && self.get_timezone().is_none() {
            return Err("timezone is not a known IANA timezone");
        }

        if self.aggregation.is_some() && self.get_aggregation().is_none() {
            return Err("aggregation must be one of Actual, Quarter, Hour, Day, Month or Year");
        }

        if self.metering_points.len() > MAX_METERING_POINTS {
            return Err("at most 10 metering points can be configured");
        }

        for id in &self.metering_points {
            validate_metering_point_id(id)?;
        }

        Ok(())
    }
}

pub fn validate_metering_point_id(id: &str) -> Result<(), &'static str> {
    if id.len() != METERING_POINT_ID_LENGTH || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err("metering point ids are 18 digits long");
    }

    Ok(())
}
