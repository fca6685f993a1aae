// crates/core/src/timestamp.rs
//! Best-effort timestamp extraction from log lines and structured records.
//!
//! Never invents a timestamp: both entry points return `None` when nothing
//! matches, and callers must leave the field out in that case.

use std::sync::LazyLock;

use chrono::Local;
use regex_lite::Regex;
use serde_json::Value;

/// Anchored pattern: either a full date-time (optional fractional seconds
/// and timezone) or a bare `HH:MM:SS` time at the start of the line.
static TS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?|\d{2}:\d{2}:\d{2}(?:\.\d+)?)",
    )
    .expect("timestamp pattern compiles")
});

/// Extract a leading timestamp from a raw log line.
///
/// A bare time (no date part) is widened to a full timestamp by prefixing
/// the current local date, so `14:30:45 ...` becomes `<today>T14:30:45`.
pub fn timestamp_from_line(line: &str) -> Option<String> {
    let m = TS_RE.find(line)?;
    let ts = m.as_str();
    // Bare times are at most "HH:MM:SS.fff" short; full dates are longer.
    if ts.len() <= 12 {
        Some(format!("{}T{}", Local::now().format("%Y-%m-%d"), ts))
    } else {
        Some(ts.to_string())
    }
}

/// Extract a timestamp from a parsed JSON record, checking fields in
/// priority order: `timestamp`, `time`, `ts`, `@timestamp`, `_meta.date`.
/// Falls back to scanning `raw_line` only when none of the fields are set.
pub fn timestamp_from_value(data: &Value, raw_line: &str) -> Option<String> {
    for key in ["timestamp", "time", "ts", "@timestamp"] {
        if let Some(ts) = field_as_timestamp(data.get(key)) {
            return Some(ts);
        }
    }
    if let Some(meta) = data.get("_meta") {
        if let Some(ts) = field_as_timestamp(meta.get("date")) {
            return Some(ts);
        }
    }
    if raw_line.is_empty() {
        None
    } else {
        timestamp_from_line(raw_line)
    }
}

/// A field counts as a timestamp if it is a non-empty string or a number.
fn field_as_timestamp(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
