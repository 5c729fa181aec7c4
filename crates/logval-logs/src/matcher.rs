//! One matching pass of expected records against record snapshots
//!
//! Each expected record is satisfied by the earliest record of its log type
//! that carries every expected field with an equal value and that no earlier
//! expectation in the same pass has claimed. Claims are local to the pass.

use std::collections::HashMap;
use std::fmt::Write;

use logval_types::{ExpectedLogRecords, ExpectedRecord, LogRecord, ValidationInfo};

use crate::store::ArcLogRecord;

/// Check whether a record carries every expected field with an equal value
pub fn record_matches(expected: &ExpectedRecord, record: &LogRecord) -> bool {
    expected
        .fields()
        .iter()
        .all(|(key, value)| record.field(key) == Some(value))
}

/// Run one pass; returns one outcome per expected record, in input order
pub fn match_pass(
    groups: &[ExpectedLogRecords],
    snapshots: &HashMap<String, Vec<ArcLogRecord>>,
) -> Vec<ValidationInfo> {
    let empty = Vec::new();
    let mut consumed: HashMap<&str, Vec<bool>> = HashMap::new();
    let mut outcomes = Vec::with_capacity(groups.iter().map(|g| g.records.len()).sum());

    for group in groups {
        let records = snapshots.get(&group.log_type).unwrap_or(&empty);
        let claimed = consumed
            .entry(group.log_type.as_str())
            .or_insert_with(|| vec![false; records.len()]);

        for (index, expected) in group.records.iter().enumerate() {
            let found = records
                .iter()
                .enumerate()
                .find(|(i, record)| !claimed[*i] && record_matches(expected, record));

            match found {
                Some((i, _)) => {
                    claimed[i] = true;
                    outcomes.push(ValidationInfo::passed(&group.log_type, index));
                }
                None => {
                    let message = describe_failure(&group.log_type, expected, records, claimed);
                    outcomes.push(ValidationInfo::failed(&group.log_type, index, message));
                }
            }
        }
    }

    outcomes
}

/// Explain why no record satisfied `expected`, pointing at the closest one
fn describe_failure(
    log_type: &str,
    expected: &ExpectedRecord,
    records: &[ArcLogRecord],
    claimed: &[bool],
) -> String {
    let taken = claimed.iter().filter(|c| **c).count();
    let mut message = format!(
        "no record of log type {:?} matched {} ({} records scanned, {} already matched in this pass)",
        log_type,
        expected,
        records.len(),
        taken
    );

    // Most expected fields in common; the earliest record wins a tie
    let mut best: Option<(usize, usize)> = None;
    for (i, record) in records.iter().enumerate() {
        let score = expected
            .fields()
            .iter()
            .filter(|(key, value)| record.field(key) == Some(*value))
            .count();
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((i, score));
        }
    }

    let Some((i, score)) = best else {
        return message;
    };
    let record = &records[i];

    if score == expected.fields().len() {
        let _ = write!(
            message,
            "; every matching record was already matched by an earlier expectation"
        );
        return message;
    }
    if score == 0 {
        return message;
    }

    let _ = write!(
        message,
        "; closest record #{} ({}:{}) differs on",
        record.seq, record.file, record.line_number
    );
    for (key, value) in expected.fields() {
        match record.field(key) {
            Some(actual) if actual == value => {}
            Some(actual) => {
                let _ = write!(message, " {}: expected {}, got {};", key, value, actual);
            }
            None => {
                let _ = write!(message, " {}: expected {}, missing;", key, value);
            }
        }
    }
    message.pop();
    message
}
