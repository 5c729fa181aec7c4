//! Log validation for logval
//!
//! This crate tails log files, decodes them into records, and checks that
//! expected records eventually appear.

mod config;
mod decoder;
mod error;
mod matcher;
mod service;
mod session;
mod state;
mod store;
mod tailer;
mod validator;

pub use config::{DEFAULT_MAX_LINE_BYTES, DEFAULT_READ_CHUNK_BYTES, ValidatorConfig};
pub use decoder::{Decoded, LINE_FIELD, LineCursor, RecordDecoder};
pub use error::{Error, Result};
pub use matcher::{match_pass, record_matches};
pub use service::LogValidatorService;
pub use session::Session;
pub use state::{LogTypeState, StateStats};
pub use store::{ArcLogRecord, RecordStore};
pub use tailer::{Tailer, TrackedFile};
pub use validator::{Sleeper, Validator};

// Re-export types used in our public API
pub use logval_types::{
    AssertRequest, AssertResponse, ExpectedLogRecords, ExpectedRecord, ListenRequest,
    ListenResponse, LogFormat, LogRecord, LogSource, LogTypeConfig, ResetRequest, ResetResponse,
    Scalar, ServiceRequest, ServiceResponse, ValidationInfo,
};
pub use tokio_util::sync::CancellationToken;
