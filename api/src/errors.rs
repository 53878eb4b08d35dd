use std::fmt;

use http::StatusCode;
use thiserror::Error;

use crate::config::{ClientKind, UnknownCodePolicy, DEFAULT_UNKNOWN_CODE_POLICY};

pub type Result<T> = std::result::Result<T, Error>;

/// Which numeric field of a point failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Position,
    Quantity,
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputField::Position => f.write_str("position"),
            InputField::Quantity => f.write_str("quantity"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed {field} '{value}' in time series {entry}, period {period}, point {point}")]
    MalformedInput {
        field: InputField,
        entry: usize,
        period: usize,
        point: usize,
        value: String,
    },
    #[error("invalid period: '{0}'")]
    InvalidPeriodName(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("{operation} is not available for the {kind} API")]
    UnsupportedForClientKind {
        operation: &'static str,
        kind: ClientKind,
    },
    #[error("couldn't connect to eloverblik: {0}")]
    Connection(StatusCode),
    #[error("request period of {days} days exceeds the maximum of {max} days", max = MAXIMUM_REQUEST_DAYS)]
    DateRangeTooLong { days: i64 },
    #[error("invalid aggregation: '{0}'")]
    InvalidAggregation(String),
    #[error("invalid resolution: '{0}'")]
    InvalidResolution(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, Error::MalformedInput { .. })
    }

    /// Business error kind, when the platform answered with a known code.
    pub fn api_kind(&self) -> Option<ApiErrorKind> {
        match self {
            Error::Api(ApiError::Kind(kind)) => Some(*kind),
            _ => None,
        }
    }
}

/// Longest span the time series endpoints accept in one request.
pub const MAXIMUM_REQUEST_DAYS: i64 = 730;

/// Code the platform uses for "no error".
pub const NO_ERROR_CODE: u32 = 10000;

/// Outcome of classifying an error payload that did not map to success.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("failed to parse error in api error message {0}")]
    UnparsablePayload(String),
    #[error("unhandled error: '{0}'")]
    UnhandledBadRequest(String),
    #[error("unhandled error ({status}): '{payload}'")]
    Unhandled { status: StatusCode, payload: String },
    #[error(transparent)]
    Kind(ApiErrorKind),
}

/// Five digit business error code embedded in `[NNNNN] text` payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ErrorCode(u32);

impl ErrorCode {
    pub fn parse(payload: &str) -> std::result::Result<ErrorCode, ApiError> {
        let digits = payload
            .get(1..6)
            .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| ApiError::UnparsablePayload(payload.to_string()))?;

        digits
            .parse::<u32>()
            .map(ErrorCode)
            .map_err(|_| ApiError::UnparsablePayload(payload.to_string()))
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn is_no_error(&self) -> bool {
        self.0 == NO_ERROR_CODE
    }
}

impl From<u32> for ErrorCode {
    fn from(value: u32) -> Self {
        ErrorCode(value)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:05}", self.0)
    }
}

/// Named business errors reported by the platform.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    #[error("wrong number of arguments")]
    WrongNumberOfArguments,
    #[error("too many request items")]
    TooManyRequestItems,
    #[error("internal server error")]
    InternalServerError,
    #[error("number of metering points exceeds the maximum per request")]
    MaximumNumberOfMeteringPointsExceeded,
    #[error("invalid meteringpoint ID or webaccess code")]
    WrongMeteringPointIdOrWebAccessCode,
    #[error("meteringpoint blocked")]
    MeteringPointBlocked,
    #[error("meteringpoint relation already added")]
    MeteringPointAlreadyAdded,
    #[error("meteringpoint ID must be 18 characters long")]
    MeteringPointIdNot18CharsLong,
    #[error("meteringpoint ID contains non-digits")]
    MeteringPointIdContainsNonDigits,
    #[error("meteringpoint alias too long")]
    MeteringPointAliasTooLong,
    #[error("webaccess codes must be 8 characters long")]
    WebAccessCodeNot8CharsLong,
    #[error("webaccess code contains illegal characters")]
    WebAccessCodeContainsIllegalChars,
    #[error("meteringpoint not found")]
    MeteringPointNotFound,
    #[error("meteringpoint can't be child")]
    MeteringPointIsChild,
    #[error("relation not found")]
    RelationNotFound,
    #[error("unknown error")]
    UnknownError,
    #[error("unauthorized access")]
    Unauthorized,
    #[error("no meteringpoints in request conforms to valid meteringpoint format")]
    NoValidMeteringPointsInList,
    #[error("requested from date is after today")]
    FromDateIsGreaterThanToday,
    #[error("period not allowed, ToDate is before FromDate")]
    FromDateIsGreaterThanToDate,
    #[error("period not allowed, ToDate is equal to FromDate")]
    ToDateCanNotBeEqualToFromDate,
    #[error("requested to date is after today")]
    ToDateIsGreaterThanToday,
    #[error("invalid date format in request")]
    InvalidDateFormat,
    #[error("a request parameter is invalid")]
    InvalidRequestParameters,
    #[error("access to meteringpoint denied")]
    AccessToMeteringPointDenied,
    #[error("no meteringpoint data available")]
    NoMeteringPointDataAvailable,
    #[error("requested data aggregation is unavailable")]
    RequestedAggregationUnavailable,
    #[error("requested meteringpoint ID is not valid")]
    InvalidMeteringPointId,
    #[error("requested date not covered by authorization")]
    DateNotCoveredByAuthorization,
    #[error("requested data aggregation is not valid")]
    AggregationNotValid,
    #[error("request size too large")]
    RequestTooLarge,
    #[error("request period exceeds the maximum number of days (730)")]
    NumberOfDaysExceeded,
    #[error("CVR is invalid")]
    InvalidCvr,
    #[error("requested future meteringpoints related to CVR are invalid")]
    InvalidIncludeFutureMeteringPointsRelatedToCvr,
    #[error("invalid master data fields")]
    InvalidMasterDataFields,
    #[error("requested meteringpoint IDs are not valid")]
    InvalidMeteringPointIds,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid signed by name ID")]
    InvalidSignedByNameId,
    #[error("invalid signed date")]
    InvalidSignedDate,
    #[error("invalid signed text")]
    InvalidSignedText,
    #[error("invalid third party ID")]
    InvalidThirdPartyId,
    #[error("invalid from date")]
    InvalidValidFrom,
    #[error("invalid to date")]
    InvalidValidTo,
    #[error("requested from date cannot be after requested to date")]
    ValidToBeforeValidFrom,
    #[error("requested to date is out of range")]
    ValidToOutOfRange,
    #[error("requested from date is out of range")]
    ValidFromOutOfRange,
    #[error("no power of attorneys found")]
    NoAuthorizationsFound,
    #[error("request used wrong token type")]
    WrongTokenType,
    #[error("token is invalid")]
    TokenNotValid,
    #[error("error creating token")]
    ErrorCreatingToken,
    #[error("token registration failed")]
    TokenRegistrationFailed,
    #[error("token already active")]
    TokenAlreadyActive,
    #[error("token already deactivated")]
    TokenAlreadyDeactivated,
    #[error("token does not contain a token id")]
    TokenMissingTokenId,
    #[error("third party not found")]
    ThirdPartyNotFound,
    #[error("third party not created")]
    ThirdPartyWasNotCreated,
    #[error("third party already exists")]
    ThirdPartyAlreadyExists,
    #[error("third party application is already in progress")]
    ThirdPartyApplicationInProgress,
    #[error("third party already exists but is inactive")]
    ThirdPartyAlreadyExistsButIsInactive,
    #[error("third party already exists but access is revoked")]
    ThirdPartyAlreadyExistsButIsRevoked,
    #[error("too many requests")]
    TooManyRequests,
}

impl ApiErrorKind {
    /// Looks up a code in the platform's error table. The "no error" code and
    /// codes missing from the table both yield `None`; check
    /// [`ErrorCode::is_no_error`] to tell them apart.
    pub fn from_code(code: ErrorCode) -> Option<ApiErrorKind> {
        use ApiErrorKind::*;

        let kind = match code.value() {
            10001 => WrongNumberOfArguments,
            10002 => TooManyRequestItems,
            10003 => InternalServerError,
            10004 => MaximumNumberOfMeteringPointsExceeded,
            20000 => WrongMeteringPointIdOrWebAccessCode,
            20001 => MeteringPointBlocked,
            20002 => MeteringPointAlreadyAdded,
            20003 => MeteringPointIdNot18CharsLong,
            20004 => MeteringPointIdContainsNonDigits,
            20005 => MeteringPointAliasTooLong,
            20006 => WebAccessCodeNot8CharsLong,
            20007 => WebAccessCodeContainsIllegalChars,
            20008 => MeteringPointNotFound,
            20009 => MeteringPointIsChild,
            20010 => RelationNotFound,
            20011 => UnknownError,
            20012 => Unauthorized,
            20013 => NoValidMeteringPointsInList,
            30000 => FromDateIsGreaterThanToday,
            30001 => FromDateIsGreaterThanToDate,
            30002 => ToDateCanNotBeEqualToFromDate,
            30003 => ToDateIsGreaterThanToday,
            30004 => InvalidDateFormat,
            30005 => InvalidRequestParameters,
            30006 => AccessToMeteringPointDenied,
            30007 => NoMeteringPointDataAvailable,
            30008 => RequestedAggregationUnavailable,
            30009 => InvalidMeteringPointId,
            30010 => DateNotCoveredByAuthorization,
            30011 => AggregationNotValid,
            30012 => RequestTooLarge,
            30014 => NumberOfDaysExceeded,
            40000 => InvalidCvr,
            40001 => InvalidIncludeFutureMeteringPointsRelatedToCvr,
            40002 => InvalidMasterDataFields,
            40003 => InvalidMeteringPointIds,
            40004 => InvalidSignature,
            40005 => InvalidSignedByNameId,
            40006 => InvalidSignedDate,
            40007 => InvalidSignedText,
            40008 => InvalidThirdPartyId,
            40009 => InvalidValidFrom,
            40010 => InvalidValidTo,
            40011 => ValidToBeforeValidFrom,
            40012 => ValidToOutOfRange,
            40013 => ValidFromOutOfRange,
            40014 => NoAuthorizationsFound,
            50000 => WrongTokenType,
            50001 => TokenNotValid,
            50002 => ErrorCreatingToken,
            50003 => TokenRegistrationFailed,
            50004 => TokenAlreadyActive,
            50005 => TokenAlreadyDeactivated,
            50006 => TokenMissingTokenId,
            60000 => ThirdPartyNotFound,
            60001 => ThirdPartyWasNotCreated,
            60002 => ThirdPartyAlreadyExists,
            60004 => ThirdPartyApplicationInProgress,
            60005 => ThirdPartyAlreadyExistsButIsInactive,
            60006 => ThirdPartyAlreadyExistsButIsRevoked,
            _ => return None,
        };

        Some(kind)
    }

    /// Inverse of [`ApiErrorKind::from_code`]. `TooManyRequests` is only ever
    /// signalled by HTTP status and has no code.
    pub fn code(&self) -> Option<ErrorCode> {
        use ApiErrorKind::*;

        let code = match self {
            WrongNumberOfArguments => 10001,
            TooManyRequestItems => 10002,
            InternalServerError => 10003,
            MaximumNumberOfMeteringPointsExceeded => 10004,
            WrongMeteringPointIdOrWebAccessCode => 20000,
            MeteringPointBlocked => 20001,
            MeteringPointAlreadyAdded => 20002,
            MeteringPointIdNot18CharsLong => 20003,
            MeteringPointIdContainsNonDigits => 20004,
            MeteringPointAliasTooLong => 20005,
            WebAccessCodeNot8CharsLong => 20006,
            WebAccessCodeContainsIllegalChars => 20007,
            MeteringPointNotFound => 20008,
            MeteringPointIsChild => 20009,
            RelationNotFound => 20010,
            UnknownError => 20011,
            Unauthorized => 20012,
            NoValidMeteringPointsInList => 20013,
            FromDateIsGreaterThanToday => 30000,
            FromDateIsGreaterThanToDate => 30001,
            ToDateCanNotBeEqualToFromDate => 30002,
            ToDateIsGreaterThanToday => 30003,
            InvalidDateFormat => 30004,
            InvalidRequestParameters => 30005,
            AccessToMeteringPointDenied => 30006,
            NoMeteringPointDataAvailable => 30007,
            RequestedAggregationUnavailable => 30008,
            InvalidMeteringPointId => 30009,
            DateNotCoveredByAuthorization => 30010,
            AggregationNotValid => 30011,
            RequestTooLarge => 30012,
            NumberOfDaysExceeded => 30014,
            InvalidCvr => 40000,
            InvalidIncludeFutureMeteringPointsRelatedToCvr => 40001,
            InvalidMasterDataFields => 40002,
            InvalidMeteringPointIds => 40003,
            InvalidSignature => 40004,
            InvalidSignedByNameId => 40005,
            InvalidSignedDate => 40006,
            InvalidSignedText => 40007,
            InvalidThirdPartyId => 40008,
            InvalidValidFrom => 40009,
            InvalidValidTo => 40010,
            ValidToBeforeValidFrom => 40011,
            ValidToOutOfRange => 40012,
            ValidFromOutOfRange => 40013,
            NoAuthorizationsFound => 40014,
            WrongTokenType => 50000,
            TokenNotValid => 50001,
            ErrorCreatingToken => 50002,
            TokenRegistrationFailed => 50003,
            TokenAlreadyActive => 50004,
            TokenAlreadyDeactivated => 50005,
            TokenMissingTokenId => 50006,
            ThirdPartyNotFound => 60000,
            ThirdPartyWasNotCreated => 60001,
            ThirdPartyAlreadyExists => 60002,
            ThirdPartyApplicationInProgress => 60004,
            ThirdPartyAlreadyExistsButIsInactive => 60005,
            ThirdPartyAlreadyExistsButIsRevoked => 60006,
            TooManyRequests => return None,
        };

        Some(ErrorCode(code))
    }
}

/// Classifies an error payload with the default policy for unknown codes.
pub fn classify(payload: &str, status: StatusCode) -> std::result::Result<(), ApiError> {
    classify_with(payload, status, DEFAULT_UNKNOWN_CODE_POLICY)
}

/// Maps a `[NNNNN] text` payload and its HTTP status to success (`Ok`) or a
/// typed error. An empty payload is success.
pub fn classify_with(
    payload: &str,
    status: StatusCode,
    policy: UnknownCodePolicy,
) -> std::result::Result<(), ApiError> {
    if payload.is_empty() {
        return Ok(());
    }

    let code = ErrorCode::parse(payload)?;
    if code.is_no_error() {
        return Ok(());
    }

    if let Some(kind) = ApiErrorKind::from_code(code) {
        return Err(ApiError::Kind(kind));
    }

    if status == StatusCode::BAD_REQUEST {
        return Err(ApiError::UnhandledBadRequest(payload.to_string()));
    }

    match policy {
        UnknownCodePolicy::TreatAsSuccess => Ok(()),
        UnknownCodePolicy::Surface => Err(ApiError::Unhandled {
            status,
            payload: payload.to_string(),
        }),
    }
}

/// Whether the transport should try a request again. `status` is `None`
/// when no response was received at all.
pub fn is_retryable<E>(status: Option<StatusCode>, error: Option<&E>) -> bool {
    error.is_some() && status != Some(StatusCode::OK)
}
