use serde::{Deserialize, Serialize};

/// Default size of one read from a log file
pub const DEFAULT_READ_CHUNK_BYTES: u64 = 1024 * 1024;

/// Default longest line accepted before its newline arrives
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Behaviour switches for a validation session
///
/// Loaded from the `[validator]` table of a TOML config file; every field
/// has a default so an empty table is valid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Rewind tracked files to offset 0 on Reset, so content written before
    /// the reset is decoded again. Off by default: a reset only drops the
    /// decoded records and previously read bytes are never re-read.
    pub reset_rewinds_offsets: bool,

    /// Fail the poll on a JSON line that does not decode to an object,
    /// instead of skipping it with a warning.
    pub strict_decoding: bool,

    /// Files are read in chunks of at most this many bytes; a poll keeps
    /// reading chunks until it reaches the end of the file.
    pub read_chunk_bytes: u64,

    /// An unterminated line longer than this fails the poll
    pub max_line_bytes: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            reset_rewinds_offsets: false,
            strict_decoding: false,
            read_chunk_bytes: DEFAULT_READ_CHUNK_BYTES,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

impl ValidatorConfig {
    pub fn with_reset_rewind(mut self, rewind: bool) -> Self {
        self.reset_rewinds_offsets = rewind;
        self
    }

    pub fn with_strict_decoding(mut self, strict: bool) -> Self {
        self.strict_decoding = strict;
        self
    }

    pub fn with_read_chunk_bytes(mut self, bytes: u64) -> Self {
        self.read_chunk_bytes = bytes.max(1);
        self
    }

    pub fn with_max_line_bytes(mut self, bytes: usize) -> Self {
        self.max_line_bytes = bytes;
        self
    }
}
