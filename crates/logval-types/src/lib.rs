//! Shared types for logval
//!
//! This crate contains the data model and the request/response types used
//! across the logval crates and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Source Types
// ============================================================================

/// Location of a set of log files plus an optional credential reference
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogSource {
    /// `file://` URL or bare path; may name a directory or a single file
    #[serde(rename = "URL", alias = "Url")]
    pub url: String,

    /// Credential reference, resolved by the resource implementation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl LogSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            credential: None,
        }
    }
}

/// A discovered log file, as reported back to callers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogFileInfo {
    pub name: String,
    pub path: PathBuf,
    /// File length when it was discovered
    pub size: u64,
    pub discovered_at: DateTime<Utc>,
}

// ============================================================================
// Log Type Configuration
// ============================================================================

/// How the bytes of a log file are turned into records
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    #[serde(rename = "json", alias = "json-lines", alias = "jsonl")]
    JsonLines,
    /// Free text lines, kept only when the index expression matches
    #[serde(rename = "indexed-text", alias = "text")]
    IndexedText,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JsonLines => "json",
            Self::IndexedText => "indexed-text",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration of one named log type
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogTypeConfig {
    /// Unique key of the log type within a session
    pub name: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Glob over file names (`*` and `?` wildcards)
    pub mask: String,

    /// Regex whose first capture group is the record's index key
    #[serde(
        default,
        rename = "IndexRegExpr",
        alias = "IndexExpr",
        skip_serializing_if = "Option::is_none"
    )]
    pub index_expr: Option<String>,
}

impl LogTypeConfig {
    pub fn new(name: impl Into<String>, format: LogFormat, mask: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format,
            mask: mask.into(),
            index_expr: None,
        }
    }

    pub fn with_index_expr(mut self, expr: impl Into<String>) -> Self {
        self.index_expr = Some(expr.into());
        self
    }
}

// ============================================================================
// Record Types
// ============================================================================

/// A loosely typed scalar value found in a log record or an expectation
///
/// Values compare by their canonical text form, so the JSON number `10`
/// equals the expected string `"10"`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl Scalar {
    /// Canonical text form used for equality
    pub fn canonical(&self) -> Cow<'_, str> {
        match self {
            Self::Null => Cow::Borrowed("null"),
            Self::Bool(true) => Cow::Borrowed("true"),
            Self::Bool(false) => Cow::Borrowed("false"),
            Self::Number(n) => Cow::Owned(canonical_number(n)),
            Self::String(s) => Cow::Borrowed(s.as_str()),
        }
    }

    /// Convert a JSON leaf value; objects and arrays are rendered as compact JSON
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(n.clone()),
            Value::String(s) => Self::String(s.clone()),
            other => Self::String(other.to_string()),
        }
    }
}

/// Integral numbers render without a fractional part (`10.0` -> `10`)
fn canonical_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        // 2^53: beyond this f64 no longer represents every integer
        Some(f) if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 => {
            (f as i64).to_string()
        }
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for Scalar {}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{:?}", s),
            other => f.write_str(&other.canonical()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self {
        Number::from_f64(f).map_or(Self::Null, Self::Number)
    }
}

/// Flat field map; nested JSON is addressed with dotted paths
pub type Fields = BTreeMap<String, Scalar>;

/// Flatten a JSON object into dotted field paths (`Request.Method`, `k2.0`)
pub fn flatten_object(object: &Map<String, Value>) -> Fields {
    let mut fields = Fields::new();
    for (key, value) in object {
        flatten_into(&mut fields, key.clone(), value);
    }
    fields
}

fn flatten_into(fields: &mut Fields, path: String, value: &Value) {
    match value {
        Value::Object(object) if !object.is_empty() => {
            for (key, child) in object {
                flatten_into(fields, format!("{}.{}", path, key), child);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, child) in items.iter().enumerate() {
                flatten_into(fields, format!("{}.{}", path, i), child);
            }
        }
        leaf => {
            fields.insert(path, Scalar::from_json(leaf));
        }
    }
}

/// A single decoded log record
#[derive(Clone, Debug)]
pub struct LogRecord {
    /// Arrival sequence number within its log type
    pub seq: u64,

    /// Name of the file the record was read from
    pub file: String,

    /// Line number within that file
    pub line_number: u64,

    /// Original raw log line
    pub raw: String,

    /// Decoded fields
    pub fields: Fields,

    /// First capture group of the index expression, if configured and matched
    pub index_key: Option<String>,
}

impl LogRecord {
    /// Create a record with no fields yet
    pub fn new(file: String, line_number: u64, raw: String) -> Self {
        Self {
            seq: 0,
            file,
            line_number,
            raw,
            fields: Fields::new(),
            index_key: None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Scalar> {
        self.fields.get(name)
    }
}

/// Fields a matching record must carry; unlisted fields are ignored
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpectedRecord(pub Fields);

impl ExpectedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn fields(&self) -> &Fields {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ExpectedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", key, value)?;
        }
        f.write_str("}")
    }
}

impl Serialize for ExpectedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ExpectedRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let object = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Self(flatten_object(&object)))
    }
}

// ============================================================================
// Requests and Responses
// ============================================================================

/// Register log types against a source
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListenRequest {
    pub source: LogSource,
    pub types: Vec<LogTypeConfig>,
}

/// Wiring information for one registered log type
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogTypeMeta {
    /// The resolved source directory
    pub source: LogSource,
    pub log_files: Vec<LogFileInfo>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListenResponse {
    pub meta: BTreeMap<String, LogTypeMeta>,
}

/// Expected records for one log type
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExpectedLogRecords {
    #[serde(rename = "Type")]
    pub log_type: String,
    pub records: Vec<ExpectedRecord>,
}

impl ExpectedLogRecords {
    pub fn new(log_type: impl Into<String>, records: Vec<ExpectedRecord>) -> Self {
        Self {
            log_type: log_type.into(),
            records,
        }
    }
}

/// Wait for expected records to appear
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AssertRequest {
    /// Sleep between attempts
    #[serde(default)]
    pub log_wait_time_ms: u64,

    /// Attempts made after the first one
    #[serde(default)]
    pub log_wait_retry_count: u32,

    pub expected_log_records: Vec<ExpectedLogRecords>,
}

impl AssertRequest {
    pub fn new(expected_log_records: Vec<ExpectedLogRecords>) -> Self {
        Self {
            log_wait_time_ms: 0,
            log_wait_retry_count: 0,
            expected_log_records,
        }
    }

    pub fn with_wait(mut self, log_wait_time_ms: u64, log_wait_retry_count: u32) -> Self {
        self.log_wait_time_ms = log_wait_time_ms;
        self.log_wait_retry_count = log_wait_retry_count;
        self
    }

    /// Number of expected records across all groups
    pub fn expected_count(&self) -> usize {
        self.expected_log_records.iter().map(|g| g.records.len()).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FailedTest {
    pub message: String,
}

/// Outcome of one expected record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ValidationInfo {
    pub log_type: String,

    /// Position of the record within its expectation group
    pub index: usize,

    pub test_passed: u32,

    /// 0 or 1
    pub test_failed: u32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_tests: Vec<FailedTest>,
}

impl ValidationInfo {
    pub fn passed(log_type: impl Into<String>, index: usize) -> Self {
        Self {
            log_type: log_type.into(),
            index,
            test_passed: 1,
            test_failed: 0,
            failed_tests: Vec::new(),
        }
    }

    pub fn failed(log_type: impl Into<String>, index: usize, message: impl Into<String>) -> Self {
        Self {
            log_type: log_type.into(),
            index,
            test_passed: 0,
            test_failed: 1,
            failed_tests: vec![FailedTest {
                message: message.into(),
            }],
        }
    }

    pub fn has_failed(&self) -> bool {
        self.test_failed > 0
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AssertResponse {
    pub validation_info: Vec<ValidationInfo>,
}

impl AssertResponse {
    pub fn failed_count(&self) -> usize {
        self.validation_info.iter().filter(|v| v.has_failed()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Clear accumulated records for the named log types
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResetRequest {
    pub log_types: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResetResponse {
    pub log_types: Vec<String>,
}

/// Any request accepted by the validator service
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "Action", rename_all = "lowercase")]
pub enum ServiceRequest {
    Listen(ListenRequest),
    Assert(AssertRequest),
    Reset(ResetRequest),
}

impl ServiceRequest {
    pub fn action(&self) -> &'static str {
        match self {
            Self::Listen(_) => "listen",
            Self::Assert(_) => "assert",
            Self::Reset(_) => "reset",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceResponseBody {
    Listen(ListenResponse),
    Assert(AssertResponse),
    Reset(ResetResponse),
}

/// Envelope: infrastructure failures go to `error`, mismatches stay in the body
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceResponse {
    /// Empty on success
    #[serde(default)]
    pub error: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ServiceResponseBody>,
}

impl ServiceResponse {
    pub fn ok(body: ServiceResponseBody) -> Self {
        Self {
            error: String::new(),
            response: Some(body),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            response: None,
        }
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_number_matches_string() {
        let actual = Scalar::from_json(&json!(10));
        assert_eq!(actual, Scalar::from("10"));
        assert_eq!(Scalar::from(10.0), Scalar::from(10_i64));
        assert_ne!(Scalar::from("10.5"), Scalar::from(10_i64));
    }

    #[test]
    fn test_scalar_bool_and_null() {
        assert_eq!(Scalar::from(true), Scalar::from("true"));
        assert_eq!(Scalar::from_json(&Value::Null), Scalar::from("null"));
    }

    #[test]
    fn test_flatten_nested_object() {
        let value = json!({
            "k1": "v1",
            "k2": ["1", "2"],
            "k4": {"s1": 1, "s2": "x"},
            "empty": {}
        });
        let fields = flatten_object(value.as_object().unwrap());
        assert_eq!(fields.get("k1"), Some(&Scalar::from("v1")));
        assert_eq!(fields.get("k2.1"), Some(&Scalar::from("2")));
        assert_eq!(fields.get("k4.s1"), Some(&Scalar::from(1_i64)));
        assert_eq!(fields.get("empty"), Some(&Scalar::from("{}")));
        assert!(!fields.contains_key("k4"));
    }

    #[test]
    fn test_expected_record_deserialize_flattens() {
        let expected: ExpectedRecord =
            serde_json::from_value(json!({"Request": {"Method": "GET"}, "k5": 10})).unwrap();
        assert_eq!(expected.fields().get("Request.Method"), Some(&Scalar::from("GET")));
        assert_eq!(expected.fields().get("k5"), Some(&Scalar::from("10")));
    }

    #[test]
    fn test_log_format_aliases() {
        let config: LogTypeConfig = serde_json::from_value(json!({
            "Name": "t",
            "Format": "json-lines",
            "Mask": "*.log",
            "IndexExpr": "id=(\\d+)"
        }))
        .unwrap();
        assert_eq!(config.format, LogFormat::JsonLines);
        assert_eq!(config.index_expr.as_deref(), Some("id=(\\d+)"));
    }

    #[test]
    fn test_unknown_format_rejected() {
        let result: Result<LogTypeConfig, _> =
            serde_json::from_value(json!({"Name": "t", "Format": "xml", "Mask": "*"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_service_request_tagged() {
        let request: ServiceRequest = serde_json::from_value(json!({
            "Action": "reset",
            "LogTypes": ["t"]
        }))
        .unwrap();
        assert_eq!(request.action(), "reset");
    }

    #[test]
    fn test_assert_request_defaults() {
        let request: AssertRequest = serde_json::from_value(json!({
            "ExpectedLogRecords": [{"Type": "t", "Records": [{"k5": "20"}]}]
        }))
        .unwrap();
        assert_eq!(request.log_wait_time_ms, 0);
        assert_eq!(request.log_wait_retry_count, 0);
        assert_eq!(request.expected_count(), 1);
    }
}
