use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use eloverblik::ClientKind;

#[derive(Parser, Debug)]
#[command(name = "eloverblik")]
#[command(about = "Access metering data from Eloverblik", long_about = None)]
pub struct Cli {
    /// Refresh token created in the Eloverblik portal
    #[arg(long, env = "ELOVERBLIK_TOKEN", hide_env_values = true)]
    pub token: String,

    /// API environment (prod, preprod)
    #[arg(long)]
    pub mode: Option<String>,

    /// Timezone used for dates and flattened records
    #[arg(long)]
    pub timezone: Option<String>,

    /// Optional YAML settings file
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub api: Api,
}

#[derive(Subcommand, Debug)]
pub enum Api {
    /// Use the customer API
    Customer {
        #[command(subcommand)]
        command: Command,
    },
    /// Use the third party API
    Thirdparty {
        #[command(subcommand)]
        command: Command,
    },
}

impl Api {
    pub fn kind(&self) -> ClientKind {
        match self {
            Api::Customer { .. } => ClientKind::Customer,
            Api::Thirdparty { .. } => ClientKind::ThirdParty,
        }
    }

    pub fn into_command(self) -> Command {
        match self {
            Api::Customer { command } | Api::Thirdparty { command } => command,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check whether the API is up
    Alive,
    /// List metering points linked to the customer
    Installations {
        /// Include metering points not actively linked to the customer
        #[arg(long)]
        include_all: bool,
    },
    /// Get metering point details
    Details(MeteringPointArgs),
    /// Get subscriptions, fees and tariffs
    Charges(MeteringPointArgs),
    /// Get time series for one or more metering points
    Timeseries(TimeSeriesArgs),
    /// Export time series as CSV
    ExportTimeseries(TimeSeriesArgs),
    /// Export master data as CSV
    ExportMasterdata(MeteringPointArgs),
    /// Export charges as CSV
    ExportCharges(MeteringPointArgs),
    /// Link metering points to the customer
    AddRelation(MeteringPointArgs),
    /// Link a metering point using its web access code
    AddRelationByCode { id: String, code: String },
    /// Remove the link to a metering point
    DeleteRelation { id: String },
    /// List power of attorneys given to the third party
    Authorizations,
    /// List metering points covered by an authorization scope
    ScopeMeteringPoints {
        /// authorizationId, customerCVR or customerKey
        scope: String,
        id: String,
    },
    /// List metering point ids covered by an authorization scope
    ScopeMeteringPointIds {
        /// authorizationId, customerCVR or customerKey
        scope: String,
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct MeteringPointArgs {
    /// Metering point ids, defaults to the ones in the settings file
    pub ids: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TimeSeriesArgs {
    /// Metering point ids, defaults to the ones in the settings file
    pub ids: Vec<String>,

    /// Predefined period (yesterday, this_week, last_week, this_month, last_month, this_year, last_year)
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub period: Option<String>,

    /// Start date (YYYY-MM-DD, now, now-30d/w/m/y)
    #[arg(long, required_unless_present = "period")]
    pub from: Option<String>,

    /// End date (YYYY-MM-DD, now, now-30d/w/m/y), defaults to today
    #[arg(long)]
    pub to: Option<String>,

    /// Aggregation level (Actual, Quarter, Hour, Day, Month, Year)
    #[arg(long)]
    pub aggregation: Option<String>,

    /// Print flat records grouped by metering point
    #[arg(long)]
    pub flatten: bool,
}
