use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use eloverblik::{
    parse_timezone, Aggregation, AuthorizationScope, Client, ClientKind, Config, FlatRecord, PeriodResolver,
};
use serde::Serialize;

use crate::cli::{Cli, Command, TimeSeriesArgs};
use crate::settings::config_model::{validate_metering_point_id, SettingsConfig, MAX_METERING_POINTS};
use crate::settings::time::{parse_date, today};

const DEFAULT_AGGREGATION: Aggregation = Aggregation::Hour;

/// Command line flags win over the settings file, which wins over the
/// environment.
pub fn build_config(cli: &Cli, kind: ClientKind, settings: &SettingsConfig) -> anyhow::Result<Config> {
    let mut config = Config::from_env()?.with_kind(kind);

    if let Some(mode) = settings.get_mode() {
        config = config.with_mode(mode);
    }
    if let Some(timezone) = settings.get_timezone() {
        config = config.with_timezone(timezone);
    }

    if let Some(mode) = &cli.mode {
        config = config.with_mode(mode.parse()?);
    }
    if let Some(timezone) = &cli.timezone {
        config = config.with_timezone(parse_timezone(timezone)?);
    }

    Ok(config)
}

/// Falls back to the configured metering points when none are given.
pub fn resolve_ids(ids: Vec<String>, settings: &SettingsConfig) -> anyhow::Result<Vec<String>> {
    let ids = if ids.is_empty() {
        settings.metering_points.clone()
    } else {
        ids
    };

    if ids.is_empty() {
        bail!("no metering point ids given and none configured in the settings file");
    }
    if ids.len() > MAX_METERING_POINTS {
        bail!("at most {} metering point ids can be requested at once, got {}", MAX_METERING_POINTS, ids.len());
    }

    for (i, id) in ids.iter().enumerate() {
        validate_metering_point_id(id)
            .map_err(|err| anyhow!("provided metering id (number {}) looks like an invalid id: {} ({})", i, id, err))?;
    }

    Ok(ids)
}

/// Absolute bounds for a time series request.
pub fn resolve_range(
    args: &TimeSeriesArgs,
    timezone: Tz,
    now: DateTime<Utc>,
) -> anyhow::Result<(DateTime<Tz>, DateTime<Tz>)> {
    if let Some(period) = &args.period {
        let range = PeriodResolver::new(timezone).resolve_str(period, now)?;
        return Ok((range.start, range.end));
    }

    let from = args
        .from
        .as_deref()
        .ok_or_else(|| anyhow!("either --period or --from is required"))?;
    let from = parse_date(from, timezone, now)?;

    let to = match args.to.as_deref() {
        Some(to) => parse_date(to, timezone, now)?,
        None => today(timezone, now),
    };

    Ok((from, to))
}

pub fn resolve_aggregation(args: &TimeSeriesArgs, settings: &SettingsConfig) -> anyhow::Result<Aggregation> {
    match &args.aggregation {
        Some(aggregation) => Ok(aggregation.parse()?),
        None => Ok(settings.get_aggregation().unwrap_or(DEFAULT_AGGREGATION)),
    }
}

/// Groups flattened records by metering point, keeping their order.
pub fn group_records(records: Vec<Vec<FlatRecord>>) -> BTreeMap<String, Vec<FlatRecord>> {
    let mut grouped: BTreeMap<String, Vec<FlatRecord>> = BTreeMap::new();

    for record in records.into_iter().flatten() {
        grouped
            .entry(record.metering_point_id.clone())
            .or_default()
            .push(record);
    }

    grouped
}

pub async fn run(client: &Client, settings: &SettingsConfig, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Alive => print_json(&client.is_alive().await?),
        Command::Installations { include_all } => {
            print_json(&client.get_metering_points(include_all).await?)
        }
        Command::Details(args) => {
            let ids = resolve_ids(args.ids, settings)?;
            print_json(&client.get_metering_point_details(&ids).await?)
        }
        Command::Charges(args) => {
            let ids = resolve_ids(args.ids, settings)?;
            print_json(&client.get_charges(&ids).await?)
        }
        Command::Timeseries(args) => {
            let (ids, from, to, aggregation) = time_series_request(client, settings, args.ids.clone(), &args)?;
            info!(
                "Fetching {} time series for {} metering points between {} and {}",
                aggregation,
                ids.len(),
                from,
                to
            );

            let documents = client.get_time_series(&ids, &from, &to, aggregation).await?;

            if args.flatten {
                let records = client
                    .flattener()
                    .flatten_all(&documents)
                    .context("Failed to flatten time series")?;
                print_json(&group_records(records))
            } else {
                print_json(&documents)
            }
        }
        Command::ExportTimeseries(args) => {
            let (ids, from, to, aggregation) = time_series_request(client, settings, args.ids.clone(), &args)?;
            print_raw(&client.export_time_series(&ids, &from, &to, aggregation).await?);
            Ok(())
        }
        Command::ExportMasterdata(args) => {
            let ids = resolve_ids(args.ids, settings)?;
            print_raw(&client.export_masterdata(&ids).await?);
            Ok(())
        }
        Command::ExportCharges(args) => {
            let ids = resolve_ids(args.ids, settings)?;
            print_raw(&client.export_charges(&ids).await?);
            Ok(())
        }
        Command::AddRelation(args) => {
            let ids = resolve_ids(args.ids, settings)?;
            print_json(&client.add_relation_by_id(&ids).await?)
        }
        Command::AddRelationByCode { id, code } => {
            validate_metering_point_id(&id).map_err(|err| anyhow!("{}: {}", id, err))?;
            print_json(&client.add_relation_by_web_access_code(&id, &code).await?)
        }
        Command::DeleteRelation { id } => {
            validate_metering_point_id(&id).map_err(|err| anyhow!("{}: {}", id, err))?;
            print_json(&client.delete_relation(&id).await?)
        }
        Command::Authorizations => print_json(&client.get_authorizations().await?),
        Command::ScopeMeteringPoints { scope, id } => {
            let scope: AuthorizationScope = scope.parse()?;
            print_json(&client.get_metering_points_for_scope(scope, &id).await?)
        }
        Command::ScopeMeteringPointIds { scope, id } => {
            let scope: AuthorizationScope = scope.parse()?;
            print_json(&client.get_metering_point_ids_for_scope(scope, &id).await?)
        }
    }
}

type TimeSeriesRequest = (Vec<String>, DateTime<Tz>, DateTime<Tz>, Aggregation);

fn time_series_request(
    client: &Client,
    settings: &SettingsConfig,
    ids: Vec<String>,
    args: &TimeSeriesArgs,
) -> anyhow::Result<TimeSeriesRequest> {
    let ids = resolve_ids(ids, settings)?;
    let (from, to) = resolve_range(args, client.config().timezone, Utc::now())?;
    let aggregation = resolve_aggregation(args, settings)?;

    Ok((ids, from, to, aggregation))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_raw(body: &str) {
    print!("{}", body);
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike};
    use chrono_tz::Europe::Copenhagen;
    use clap::Parser;
    use eloverblik::{Mode, Resolution};

    use super::*;

    fn time_series_args(extra: &[&str]) -> TimeSeriesArgs {
        let mut argv = vec!["eloverblik", "--token", "refresh", "customer", "timeseries"];
        argv.extend_from_slice(extra);

        match Cli::try_parse_from(argv).unwrap().api {
            crate::cli::Api::Customer {
                command: Command::Timeseries(args),
            } => args,
            other => panic!("unexpected command {:?}", other),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_resolve_ids() {
        let settings = SettingsConfig {
            metering_points: vec!["571313180100000009".to_string()],
            ..SettingsConfig::default()
        };

        let ids = resolve_ids(Vec::new(), &settings).unwrap();
        assert_eq!(ids, vec!["571313180100000009".to_string()]);

        let ids = resolve_ids(vec!["571313180100000001".to_string()], &settings).unwrap();
        assert_eq!(ids, vec!["571313180100000001".to_string()]);

        assert!(resolve_ids(Vec::new(), &SettingsConfig::default()).is_err());
        assert!(resolve_ids(vec!["1234".to_string()], &settings).is_err());
        assert!(resolve_ids(vec!["571313180100000001".to_string(); 11], &settings).is_err());
    }

    #[test]
    fn test_resolve_range_from_period() {
        let args = time_series_args(&["--period", "yesterday"]);

        let (from, to) = resolve_range(&args, Copenhagen, now()).unwrap();

        assert_eq!(from, Copenhagen.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap());
        assert_eq!(to.date_naive(), from.date_naive());
    }

    #[test]
    fn test_resolve_range_from_dates() {
        let args = time_series_args(&["--from", "now-1w"]);

        let (from, to) = resolve_range(&args, Copenhagen, now()).unwrap();

        assert_eq!(from.date_naive(), chrono::NaiveDate::from_ymd_opt(2026, 3, 8).unwrap());
        assert_eq!(to, Copenhagen.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap());

        let args = time_series_args(&["--from", "2026-01-01", "--to", "2026-02-01"]);
        let (from, to) = resolve_range(&args, Copenhagen, now()).unwrap();
        assert_eq!(from, Copenhagen.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(to, Copenhagen.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_resolve_range_rejects_unknown_period() {
        let args = time_series_args(&["--period", "last_decade"]);
        let err = resolve_range(&args, Copenhagen, now()).unwrap_err();
        assert_eq!(err.to_string(), "invalid period: 'last_decade'");
    }

    #[test]
    fn test_resolve_aggregation() {
        let settings = SettingsConfig {
            aggregation: Some("Month".to_string()),
            ..SettingsConfig::default()
        };

        let args = time_series_args(&["--from", "now"]);
        assert_eq!(resolve_aggregation(&args, &settings).unwrap(), Aggregation::Month);
        assert_eq!(resolve_aggregation(&args, &SettingsConfig::default()).unwrap(), Aggregation::Hour);

        let args = time_series_args(&["--from", "now", "--aggregation", "quarter"]);
        assert_eq!(resolve_aggregation(&args, &settings).unwrap(), Aggregation::Quarter);

        let args = time_series_args(&["--from", "now", "--aggregation", "weekly"]);
        assert!(resolve_aggregation(&args, &settings).is_err());
    }

    #[test]
    fn test_build_config_precedence() {
        let cli = Cli::try_parse_from([
            "eloverblik",
            "--token",
            "refresh",
            "--timezone",
            "Europe/Helsinki",
            "thirdparty",
            "authorizations",
        ])
        .unwrap();
        let settings = SettingsConfig {
            mode: Some("preprod".to_string()),
            timezone: Some("Europe/Copenhagen".to_string()),
            ..SettingsConfig::default()
        };

        let config = build_config(&cli, ClientKind::ThirdParty, &settings).unwrap();

        assert_eq!(config.kind, ClientKind::ThirdParty);
        assert_eq!(config.mode, Mode::PreProduction);
        assert_eq!(config.timezone, chrono_tz::Europe::Helsinki);
    }

    #[test]
    fn test_group_records() {
        let record = |id: &str, hour: u32| FlatRecord {
            metering_point_id: id.to_string(),
            start: Copenhagen.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            end: Copenhagen.with_ymd_and_hms(2024, 1, 1, hour + 1, 0, 0).unwrap(),
            measurement: 1.0,
            quality: "A04".to_string(),
            unit: "KWH".to_string(),
            curve_type: "A01".to_string(),
            business_type: "A04".to_string(),
            resolution: Resolution::Hour,
        };

        let grouped = group_records(vec![
            vec![record("571313180100000002", 0), record("571313180100000002", 1)],
            vec![record("571313180100000001", 0)],
        ]);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["571313180100000002"].len(), 2);
        assert_eq!(grouped["571313180100000002"][1].start.hour(), 1);
        assert_eq!(grouped.keys().next().map(String::as_str), Some("571313180100000001"));
    }
}
