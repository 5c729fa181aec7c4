use std::path::PathBuf;

/// Errors raised while resolving or reading a log source
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("source {url} is unavailable: {reason}")]
    Unavailable { url: String, reason: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} shrank from {offset} to {len} bytes", path.display())]
    Stale { path: PathBuf, offset: u64, len: u64 },

    #[error("invalid mask {mask:?}: {reason}")]
    InvalidMask { mask: String, reason: String },
}

impl SourceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unavailable(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SourceError>;
