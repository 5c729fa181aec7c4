use std::path::{Path, PathBuf};

use logval_types::LogSource;

use crate::error::Result;

/// A source resolved to a directory that can be listed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceDir {
    /// Canonical URL of the directory
    pub url: String,
    pub path: PathBuf,
    /// Credential reference carried over from the source
    pub credential: Option<String>,
}

impl SourceDir {
    /// The resolved location as a `LogSource`
    pub fn as_source(&self) -> LogSource {
        LogSource {
            url: self.url.clone(),
            credential: self.credential.clone(),
        }
    }
}

/// A regular file found in a source directory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub len: u64,
}

/// Bytes appended to a file since a previous offset
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Delta {
    pub bytes: Vec<u8>,
    /// Offset just past the returned bytes
    pub new_offset: u64,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Access to log files behind a source
///
/// Implementations own any credential handling; callers only ever see
/// directories, file entries and byte deltas.
pub trait Resource: Send + Sync {
    /// Resolve a source into the directory that holds its files.
    /// A source naming a single file resolves to that file's directory.
    fn resolve_directory(&self, source: &LogSource) -> Result<SourceDir>;

    /// List regular files in the directory, sorted by name
    fn list_files(&self, dir: &SourceDir) -> Result<Vec<FileEntry>>;

    /// Read from `from_offset` towards the current end of the file, at most
    /// `max_len` bytes. A short delta means the end was reached.
    ///
    /// A missing file yields an empty delta; a file shorter than
    /// `from_offset` is a `SourceError::Stale`.
    fn read_delta(&self, path: &Path, from_offset: u64, max_len: u64) -> Result<Delta>;
}
