use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

const PRODUCTION_HOST: &str = "api.eloverblik.dk";
const PREPRODUCTION_HOST: &str = "apipreprod.eloverblik.dk";

/// Civil timezone the platform's calendar is expressed in.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Copenhagen;

/// Unknown codes on non-400 responses are treated as success, matching how
/// the platform clients have always behaved. Switch a [`Config`] to
/// [`UnknownCodePolicy::Surface`] to see them instead.
pub const DEFAULT_UNKNOWN_CODE_POLICY: UnknownCodePolicy = UnknownCodePolicy::TreatAsSuccess;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Production,
    PreProduction,
}

impl Mode {
    pub fn host(&self) -> &'static str {
        match self {
            Mode::Production => PRODUCTION_HOST,
            Mode::PreProduction => PREPRODUCTION_HOST,
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "prod" | "production" | "release" => Ok(Mode::Production),
            "test" | "preprod" | "preproduction" => Ok(Mode::PreProduction),
            _ => Err(Error::Config(format!(
                "unknown mode '{}' (available modes: prod, preprod)",
                s
            ))),
        }
    }
}

/// The two API surfaces of the platform. Several operations only exist on
/// one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientKind {
    Customer,
    ThirdParty,
}

impl ClientKind {
    pub fn path_segment(&self) -> &'static str {
        match self {
            ClientKind::Customer => "customerapi",
            ClientKind::ThirdParty => "thirdpartyapi",
        }
    }
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientKind::Customer => f.write_str("Customer"),
            ClientKind::ThirdParty => f.write_str("ThirdParty"),
        }
    }
}

impl FromStr for ClientKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "customer" => Ok(ClientKind::Customer),
            "thirdparty" | "third_party" | "third-party" => Ok(ClientKind::ThirdParty),
            _ => Err(Error::Config(format!("unknown client kind '{}'", s))),
        }
    }
}

/// What to do with an error code that is missing from the table when the
/// response status is not 400.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnknownCodePolicy {
    TreatAsSuccess,
    Surface,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub kind: ClientKind,
    pub timezone: Tz,
    pub unknown_code_policy: UnknownCodePolicy,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mode: Mode::Production,
            kind: ClientKind::Customer,
            timezone: DEFAULT_TIMEZONE,
            unknown_code_policy: DEFAULT_UNKNOWN_CODE_POLICY,
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    pub fn new(kind: ClientKind) -> Self {
        Config {
            kind,
            ..Config::default()
        }
    }

    /// Reads `ELOVERBLIK_MODE`, `ELOVERBLIK_KIND` and `CHRONO_TIMEZONE` from the
    /// environment (or `.env`), keeping defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(mode) = dotenv::var("ELOVERBLIK_MODE") {
            config.mode = mode.parse()?;
        }
        if let Ok(kind) = dotenv::var("ELOVERBLIK_KIND") {
            config.kind = kind.parse()?;
        }
        if let Ok(timezone) = dotenv::var("CHRONO_TIMEZONE") {
            config.timezone = parse_timezone(&timezone)?;
        }

        Ok(config)
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_kind(mut self, kind: ClientKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_unknown_code_policy(mut self, policy: UnknownCodePolicy) -> Self {
        self.unknown_code_policy = policy;
        self
    }

    pub fn with_retry_config(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn base_url(&self) -> String {
        format!("https://{}/{}/api", self.mode.host(), self.kind.path_segment())
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| Error::Config(format!("unknown timezone '{}'", name)))
}
