use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::debug;

use logval_source::{Delta, FileEntry, FileMask, Resource, SourceDir, SourceError};
use logval_types::LogFileInfo;

use crate::decoder::LineCursor;

/// A file matching a log type's mask, and how far it has been read
#[derive(Clone, Debug)]
pub struct TrackedFile {
    pub name: String,
    pub path: PathBuf,

    /// Bytes consumed so far; only moves backwards on a rewinding reset
    read_offset: u64,

    pub discovered_at: DateTime<Utc>,

    /// File length when discovered
    size_at_discovery: u64,

    /// Framing state matching `read_offset`
    cursor: LineCursor,
}

impl TrackedFile {
    pub fn new(entry: &FileEntry) -> Self {
        Self {
            name: entry.name.clone(),
            path: entry.path.clone(),
            read_offset: 0,
            discovered_at: Utc::now(),
            size_at_discovery: entry.len,
            cursor: LineCursor::default(),
        }
    }

    pub fn info(&self) -> LogFileInfo {
        LogFileInfo {
            name: self.name.clone(),
            path: self.path.clone(),
            size: self.size_at_discovery,
            discovered_at: self.discovered_at,
        }
    }

    pub fn read_offset(&self) -> u64 {
        self.read_offset
    }

    pub fn cursor(&self) -> &LineCursor {
        &self.cursor
    }

    /// Read up to `max_len` bytes past the committed offset. Nothing moves
    /// until `commit` is called.
    pub fn read(&self, resource: &dyn Resource, max_len: u64) -> Result<Delta, SourceError> {
        resource.read_delta(&self.path, self.read_offset, max_len)
    }

    /// Accept a delta once its bytes have been decoded
    pub fn commit(&mut self, new_offset: u64, cursor: LineCursor) {
        self.read_offset = new_offset;
        self.cursor = cursor;
    }

    /// Forget everything read so the next poll starts from the beginning
    pub fn rewind(&mut self) {
        self.commit(0, LineCursor::default());
    }
}

/// Tails every file in a source directory that matches a mask
#[derive(Debug)]
pub struct Tailer {
    dir: SourceDir,
    mask: FileMask,
    /// Scan order: discovery order, files found in one listing sorted by name
    files: Vec<TrackedFile>,
}

impl Tailer {
    /// Enumerate the files that already exist; nothing is read yet
    pub fn discover(
        resource: &dyn Resource,
        dir: SourceDir,
        mask: FileMask,
    ) -> Result<Self, SourceError> {
        let mut tailer = Self {
            dir,
            mask,
            files: Vec::new(),
        };
        tailer.refresh(resource)?;
        Ok(tailer)
    }

    /// Start tracking matching files that appeared since the last listing
    pub fn refresh(&mut self, resource: &dyn Resource) -> Result<usize, SourceError> {
        let mut added = 0;
        for entry in resource.list_files(&self.dir)? {
            if !self.mask.matches(&entry.name) || self.files.iter().any(|f| f.path == entry.path)
            {
                continue;
            }
            debug!(file = %entry.name, mask = %self.mask.pattern(), "tracking new log file");
            self.files.push(TrackedFile::new(&entry));
            added += 1;
        }
        Ok(added)
    }

    pub fn files(&self) -> &[TrackedFile] {
        &self.files
    }

    /// Tracked files in scan order
    pub fn files_mut(&mut self) -> &mut [TrackedFile] {
        &mut self.files
    }

    pub fn source_dir(&self) -> &SourceDir {
        &self.dir
    }

    pub fn rewind(&mut self) {
        for file in &mut self.files {
            file.rewind();
        }
    }
}
