use parking_lot::Mutex;
use tracing::{debug, warn};

use logval_source::{FileMask, LogSource, Resource};
use logval_types::{LogTypeConfig, LogTypeMeta};

use crate::config::ValidatorConfig;
use crate::decoder::RecordDecoder;
use crate::error::{Error, Result};
use crate::store::{ArcLogRecord, RecordStore};
use crate::tailer::{Tailer, TrackedFile};

/// Counters kept per log type
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateStats {
    pub polls: u64,
    pub bytes_read: u64,
    pub records: u64,
    pub skipped_lines: u64,
}

struct StateInner {
    tailer: Tailer,
    store: RecordStore,
    stats: StateStats,
}

/// Tracked files and decoded records of one registered log type
///
/// All mutation goes through one exclusive lock, so Listen, Assert and Reset
/// issued from different tasks against the same type are serialized.
pub struct LogTypeState {
    config: LogTypeConfig,
    decoder: RecordDecoder,
    inner: Mutex<StateInner>,
}

impl LogTypeState {
    /// Validate the config, resolve the source and enumerate existing files
    pub fn listen(
        resource: &dyn Resource,
        source: &LogSource,
        config: LogTypeConfig,
    ) -> Result<Self> {
        let mask = FileMask::new(&config.mask).map_err(|e| Error::config(&config.name, e.to_string()))?;
        let decoder = RecordDecoder::new(&config)?;

        let dir = resource.resolve_directory(source)?;
        let tailer = Tailer::discover(resource, dir, mask)?;
        debug!(
            log_type = %config.name,
            format = %config.format,
            files = tailer.files().len(),
            "log type registered"
        );

        Ok(Self {
            config,
            decoder,
            inner: Mutex::new(StateInner {
                tailer,
                store: RecordStore::new(),
                stats: StateStats::default(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Resolved source and currently tracked files
    pub fn meta(&self) -> LogTypeMeta {
        let inner = self.inner.lock();
        LogTypeMeta {
            source: inner.tailer.source_dir().as_source(),
            log_files: inner.tailer.files().iter().map(|f| f.info()).collect(),
        }
    }

    /// Tail every file, decode the new bytes and append the records.
    ///
    /// Each file is read, decoded and committed on its own. A file that
    /// fails keeps its offset and carry, while records from the other files
    /// are still appended; the first failure is returned once every file
    /// has been tried. Returns the number of records appended.
    pub fn grow(&self, resource: &dyn Resource, config: &ValidatorConfig) -> Result<usize> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        inner.stats.polls += 1;
        inner.tailer.refresh(resource)?;

        let mut appended = 0;
        let mut first_error = None;
        for file in inner.tailer.files_mut() {
            match self.grow_file(file, resource, config, &mut inner.store, &mut inner.stats) {
                Ok(count) => appended += count,
                Err(e) => {
                    warn!(
                        log_type = %self.config.name,
                        file = %file.name,
                        offset = file.read_offset(),
                        error = %e,
                        "poll failed, offset kept"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        if appended > 0 {
            debug!(log_type = %self.config.name, appended, total = inner.store.len(), "records decoded");
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(appended),
        }
    }

    /// Read one file chunk by chunk up to its end, committing each chunk
    /// only after it decoded.
    fn grow_file(
        &self,
        file: &mut TrackedFile,
        resource: &dyn Resource,
        config: &ValidatorConfig,
        store: &mut RecordStore,
        stats: &mut StateStats,
    ) -> Result<usize> {
        let chunk = config.read_chunk_bytes.max(1);
        let mut appended = 0;
        loop {
            let delta = file.read(resource, chunk)?;
            if delta.is_empty() {
                return Ok(appended);
            }

            let mut cursor = file.cursor().clone();
            let decoded = self
                .decoder
                .decode(&file.name, &mut cursor, &delta.bytes, config)?;
            let read = delta.bytes.len() as u64;
            file.commit(delta.new_offset, cursor);
            stats.bytes_read += read;

            for (line_number, reason) in &decoded.skipped {
                warn!(
                    log_type = %self.config.name,
                    file = %file.name,
                    line_number,
                    reason = %reason,
                    "skipping undecodable line"
                );
            }
            stats.skipped_lines += decoded.skipped.len() as u64;

            for record in decoded.records {
                store.append(record);
                stats.records += 1;
                appended += 1;
            }

            // A short read reached the end of the file
            if read < chunk {
                return Ok(appended);
            }
        }
    }

    /// Current records in arrival order
    pub fn snapshot(&self) -> Vec<ArcLogRecord> {
        self.inner.lock().store.snapshot()
    }

    /// Records whose index key equals `key`
    pub fn by_key(&self, key: &str) -> Vec<ArcLogRecord> {
        self.inner.lock().store.by_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> StateStats {
        self.inner.lock().stats.clone()
    }

    /// Drop decoded records; optionally rewind the files to re-read them
    pub fn reset(&self, rewind: bool) {
        let mut inner = self.inner.lock();
        inner.store.clear();
        if rewind {
            inner.tailer.rewind();
        }
    }
}

impl std::fmt::Debug for LogTypeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogTypeState")
            .field("config", &self.config)
            .field("records", &self.len())
            .finish()
    }
}
