use std::collections::HashMap;
use std::sync::Arc;

use logval_types::LogRecord;

/// Shared, immutable record
pub type ArcLogRecord = Arc<LogRecord>;

/// Append-only record sequence of one log type
///
/// Not synchronized on its own: it lives inside the lock of its
/// `LogTypeState`.
#[derive(Debug, Default)]
pub struct RecordStore {
    /// Records in arrival order; Arc makes snapshots cheap
    records: Vec<ArcLogRecord>,

    /// Auxiliary lookup from index key to positions in `records`
    by_key: HashMap<String, Vec<usize>>,

    /// Next sequence number
    next_seq: u64,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, assigning its sequence number
    pub fn append(&mut self, mut record: LogRecord) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        record.seq = seq;

        if let Some(key) = &record.index_key {
            self.by_key
                .entry(key.clone())
                .or_default()
                .push(self.records.len());
        }
        self.records.push(Arc::new(record));
        seq
    }

    /// All records in arrival order (Arc clones only)
    pub fn snapshot(&self) -> Vec<ArcLogRecord> {
        self.records.clone()
    }

    /// Every record carrying the given index key, duplicates included
    pub fn by_key(&self, key: &str) -> Vec<ArcLogRecord> {
        self.by_key
            .get(key)
            .map(|positions| positions.iter().map(|&i| Arc::clone(&self.records[i])).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Clear all records and the index
    pub fn clear(&mut self) {
        self.records.clear();
        self.by_key.clear();
        self.next_seq = 0;
    }
}
