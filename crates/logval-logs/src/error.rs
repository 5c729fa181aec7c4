use logval_source::SourceError;

/// Errors that abort a Listen, Assert or Reset call
///
/// Records that fail to match are not errors; they are reported per
/// expectation in `ValidationInfo`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid log type {log_type:?}: {reason}")]
    Config { log_type: String, reason: String },

    #[error("source unavailable: {0}")]
    SourceUnavailable(#[source] SourceError),

    #[error("stale source: {0}")]
    StaleSource(#[source] SourceError),

    #[error("failed to decode {file} line {line_number}: {reason}")]
    Decode {
        file: String,
        line_number: u64,
        reason: String,
    },

    #[error("unknown log type {0:?}")]
    UnknownLogType(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub(crate) fn config(log_type: &str, reason: impl Into<String>) -> Self {
        Self::Config {
            log_type: log_type.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<SourceError> for Error {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Stale { .. } => Self::StaleSource(err),
            SourceError::InvalidMask { ref mask, ref reason } => Self::Config {
                log_type: String::new(),
                reason: format!("mask {:?}: {}", mask, reason),
            },
            other => Self::SourceUnavailable(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
