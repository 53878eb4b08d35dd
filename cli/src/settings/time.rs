use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use chrono_tz::Tz;
use eloverblik::local_midnight;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid date format: '{0}'. Use YYYY-MM-DD, now, or now-N[d|w|m|y]")]
pub struct DateError(pub String);

/// Parses a date argument relative to `now`.
///
/// `YYYY-MM-DD` is local midnight of that date. `now` is the current instant
/// and `now-N[d|w|m|y]` steps back in the local calendar.
pub fn parse_date(input: &str, timezone: Tz, now: DateTime<Utc>) -> Result<DateTime<Tz>, DateError> {
    let input = input.trim();
    let invalid = || DateError(input.to_string());
    let now = now.with_timezone(&timezone);

    if input.eq_ignore_ascii_case("now") {
        return Ok(now);
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(local_midnight(timezone, date));
    }

    let relative = input.to_ascii_lowercase();
    let offset = relative.strip_prefix("now-").ok_or_else(invalid)?;
    if offset.len() < 2 || !offset.is_ascii() {
        return Err(invalid());
    }

    let (value, unit) = offset.split_at(offset.len() - 1);
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let value: u32 = value.parse().map_err(|_| invalid())?;

    let shifted = match unit {
        "d" => now.checked_sub_days(Days::new(value as u64)),
        "w" => now.checked_sub_days(Days::new(value as u64 * 7)),
        "m" => now.checked_sub_months(Months::new(value)),
        "y" => value
            .checked_mul(12)
            .and_then(|months| now.checked_sub_months(Months::new(months))),
        _ => None,
    };

    shifted.ok_or_else(invalid)
}

/// Local midnight of today.
pub fn today(timezone: Tz, now: DateTime<Utc>) -> DateTime<Tz> {
    local_midnight(timezone, now.with_timezone(&timezone).date_naive())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike};
    use chrono_tz::Europe::Copenhagen;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 31, 10, 15, 0).unwrap()
    }

    #[test]
    fn test_parse_absolute_date() {
        let date = parse_date("2024-01-15", Copenhagen, now()).unwrap();
        assert_eq!(date, Copenhagen.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_now() {
        assert_eq!(parse_date("now", Copenhagen, now()).unwrap(), now());
        assert_eq!(parse_date("NOW", Copenhagen, now()).unwrap(), now());
    }

    #[test]
    fn test_parse_relative_dates() {
        let local_now = now().with_timezone(&Copenhagen);

        let days = parse_date("now-30d", Copenhagen, now()).unwrap();
        assert_eq!(days.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        // Same wall clock time across the clock change
        assert_eq!(days.hour(), local_now.hour());

        let weeks = parse_date("now-2w", Copenhagen, now()).unwrap();
        assert_eq!(weeks.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 17).unwrap());

        let months = parse_date("now-1m", Copenhagen, now()).unwrap();
        assert_eq!(months.date_naive(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let years = parse_date("now-1Y", Copenhagen, now()).unwrap();
        assert_eq!(years.date_naive(), NaiveDate::from_ymd_opt(2023, 3, 31).unwrap());
    }

    #[test]
    fn test_parse_invalid_dates() {
        let inputs = [
            "",
            "yesterday",
            "2024-13-01",
            "now-",
            "now-d",
            "now-5x",
            "now+5d",
            "now--5d",
            "15-01-2024",
            "now-5é",
            "now-é",
        ];
        for input in inputs {
            let err = parse_date(input, Copenhagen, now()).unwrap_err();
            assert_eq!(err, DateError(input.to_string()), "input {:?}", input);
        }
    }

    #[test]
    fn test_today() {
        let late = Utc.with_ymd_and_hms(2024, 3, 30, 23, 30, 0).unwrap();
        assert_eq!(today(Copenhagen, late), Copenhagen.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap());
    }
}
