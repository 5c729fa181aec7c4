use regex::Regex;
use serde_json::Value;

use logval_types::{LogFormat, LogRecord, LogTypeConfig, Scalar, flatten_object};

use crate::config::ValidatorConfig;
use crate::error::{Error, Result};

/// Field holding the whole line of an indexed-text record
pub const LINE_FIELD: &str = "line";

/// Line framing state of one file
///
/// Callers decode into a copy and keep it only once decoding succeeded, so a
/// failed chunk can be framed again from the same starting point.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineCursor {
    /// Incomplete trailing line held back until its newline arrives
    pub carry: Vec<u8>,

    /// Complete lines framed so far
    pub lines_read: u64,
}

/// Records decoded from one delta
#[derive(Debug, Default)]
pub struct Decoded {
    pub records: Vec<LogRecord>,
    /// Complete lines that could not be decoded and were dropped
    pub skipped: Vec<(u64, String)>,
}

/// Turns tailed bytes into records according to a log type's format
#[derive(Clone, Debug)]
pub struct RecordDecoder {
    format: LogFormat,
    index: Option<Regex>,
}

impl RecordDecoder {
    /// Compile the decoder for a log type; a bad index expression is a config error
    pub fn new(config: &LogTypeConfig) -> Result<Self> {
        let index = match config.index_expr.as_deref() {
            Some(expr) => {
                let regex =
                    Regex::new(expr).map_err(|e| Error::config(&config.name, e.to_string()))?;
                if regex.captures_len() < 2 {
                    return Err(Error::config(
                        &config.name,
                        format!("index expression {:?} has no capture group", expr),
                    ));
                }
                Some(regex)
            }
            None => None,
        };

        if config.format == LogFormat::IndexedText && index.is_none() {
            return Err(Error::config(
                &config.name,
                "indexed-text format requires an index expression",
            ));
        }

        Ok(Self {
            format: config.format,
            index,
        })
    }

    /// Decode the complete lines of `delta`, carrying an unterminated tail
    /// over to the next call for the same file.
    pub fn decode(
        &self,
        file: &str,
        cursor: &mut LineCursor,
        delta: &[u8],
        config: &ValidatorConfig,
    ) -> Result<Decoded> {
        let mut decoded = Decoded::default();
        for (line_number, line) in Self::frame(cursor, delta) {
            match self.decode_line(file, line_number, &line) {
                Ok(Some(record)) => decoded.records.push(record),
                Ok(None) => {}
                Err(reason) if config.strict_decoding => {
                    return Err(Error::Decode {
                        file: file.to_string(),
                        line_number,
                        reason,
                    });
                }
                Err(reason) => decoded.skipped.push((line_number, reason)),
            }
        }

        if cursor.carry.len() > config.max_line_bytes {
            return Err(Error::Decode {
                file: file.to_string(),
                line_number: cursor.lines_read + 1,
                reason: format!(
                    "line exceeds {} bytes without a newline",
                    config.max_line_bytes
                ),
            });
        }
        Ok(decoded)
    }

    /// Split carry + delta on newlines; returns numbered, non-blank lines
    fn frame(cursor: &mut LineCursor, delta: &[u8]) -> Vec<(u64, String)> {
        cursor.carry.extend_from_slice(delta);
        let Some(last_newline) = cursor.carry.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let rest = cursor.carry.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut cursor.carry, rest);

        let mut lines = Vec::new();
        for raw in complete[..complete.len() - 1].split(|b| *b == b'\n') {
            cursor.lines_read += 1;
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            let line = String::from_utf8_lossy(raw);
            if line.trim().is_empty() {
                continue;
            }
            lines.push((cursor.lines_read, line.into_owned()));
        }
        lines
    }

    /// Decode a single line. `Ok(None)` means the line is not a record.
    fn decode_line(
        &self,
        file: &str,
        line_number: u64,
        line: &str,
    ) -> std::result::Result<Option<LogRecord>, String> {
        let mut record = LogRecord::new(file.to_string(), line_number, line.to_string());

        match self.format {
            LogFormat::JsonLines => {
                let value: Value = serde_json::from_str(line.trim()).map_err(|e| e.to_string())?;
                let Value::Object(object) = value else {
                    return Err("line is not a JSON object".to_string());
                };
                record.fields = flatten_object(&object);
                record.index_key = self.index_key(line);
            }
            LogFormat::IndexedText => {
                let Some(index) = &self.index else {
                    return Ok(None);
                };
                let Some(captures) = index.captures(line) else {
                    return Ok(None);
                };
                record
                    .fields
                    .insert(LINE_FIELD.to_string(), Scalar::from(line));
                for name in index.capture_names().flatten() {
                    if let Some(m) = captures.name(name) {
                        record.fields.insert(name.to_string(), Scalar::from(m.as_str()));
                    }
                }
                record.index_key = captures.get(1).map(|m| m.as_str().to_string());
            }
        }

        Ok(Some(record))
    }

    fn index_key(&self, line: &str) -> Option<String> {
        let captures = self.index.as_ref()?.captures(line)?;
        captures.get(1).map(|m| m.as_str().to_string())
    }
}
