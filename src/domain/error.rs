//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for bandcross.
#[derive(Debug, thiserror::Error)]
pub enum BandcrossError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("csv error in {file}: {reason}")]
    Csv { file: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    /// A strategy parameter is out of range. Raised before any data fetch.
    #[error("invalid parameter {parameter}: {reason}")]
    Configuration { parameter: String, reason: String },

    #[error("no data for {symbol} from {start} to {end}: {reason}")]
    NoData {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
        reason: String,
    },

    #[error(
        "insufficient data for {symbol} from {start} to {end}: have {bars} bars, window is {window}"
    )]
    InsufficientData {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
        bars: usize,
        window: usize,
    },

    #[error("serialization error: {reason}")]
    Serialization { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BandcrossError {
    pub fn configuration(parameter: &str, reason: impl Into<String>) -> Self {
        BandcrossError::Configuration {
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }

    /// Process exit status for this error family.
    pub fn exit_status(&self) -> u8 {
        match self {
            BandcrossError::Io(_) | BandcrossError::Serialization { .. } => 1,
            BandcrossError::ConfigParse { .. }
            | BandcrossError::ConfigMissing { .. }
            | BandcrossError::ConfigInvalid { .. }
            | BandcrossError::Configuration { .. } => 2,
            BandcrossError::Database { .. }
            | BandcrossError::DatabaseQuery { .. }
            | BandcrossError::Csv { .. } => 3,
            BandcrossError::NoData { .. } | BandcrossError::InsufficientData { .. } => 5,
        }
    }
}

impl From<&BandcrossError> for std::process::ExitCode {
    fn from(err: &BandcrossError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
