#[macro_use]
extern crate log;

pub mod client;
pub mod config;
pub mod errors;
pub mod flatten;
pub mod models;
pub mod periods;
pub mod resolution;

pub use client::Client;
pub use config::{parse_timezone, ClientKind, Config, Mode, UnknownCodePolicy, DEFAULT_TIMEZONE};
pub use errors::{
    classify, classify_with, is_retryable, ApiError, ApiErrorKind, Error, ErrorCode, InputField, Result,
};
pub use flatten::{FlatRecord, Flattener};
pub use models::*;
pub use periods::{local_midnight, DateRange, PeriodName, PeriodResolver};
pub use resolution::{Aggregation, Resolution};
