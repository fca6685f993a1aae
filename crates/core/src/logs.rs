// crates/core/src/logs.rs
//! Daily log file resolution, log line parsing, and the per-second rate
//! window used by the log stream.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Local;
use serde_json::Value;

use crate::classify::classify;
use crate::timestamp::{timestamp_from_line, timestamp_from_value};

/// Path of today's log file: `<log_dir>/<prefix>-YYYY-MM-DD.log`.
pub fn today_log_path(log_dir: &Path, prefix: &str) -> PathBuf {
    log_dir.join(format!("{prefix}-{}.log", Local::now().format("%Y-%m-%d")))
}

/// Resolve the log file to stream: today's file if it exists, otherwise the
/// most recently modified `<prefix>-*.log` in the directory.
pub fn resolve_log_file(log_dir: &Path, prefix: &str) -> Option<PathBuf> {
    let today = today_log_path(log_dir, prefix);
    if today.is_file() {
        return Some(today);
    }

    let mut newest: Option<(PathBuf, std::time::SystemTime)> = None;
    let entries = std::fs::read_dir(log_dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => continue,
        };
        if !name.starts_with(&format!("{prefix}-")) || !name.ends_with(".log") {
            continue;
        }
        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(_) => continue,
        };
        match &newest {
            Some((_, best)) if *best >= modified => {}
            _ => newest = Some((path, modified)),
        }
    }
    newest.map(|(path, _)| path)
}

/// Parse one log line (JSON object or plain text) into an SSE `log` payload.
///
/// JSON lines keep all their structured fields; `raw`, `type` and
/// `timestamp` are filled in when missing. Plain-text lines get
/// `{raw, type}` plus a `timestamp` when one can be extracted.
pub fn parse_log_line(line: &str) -> Value {
    if line.starts_with('{') {
        if let Ok(Value::Object(mut map)) = serde_json::from_str::<Value>(line) {
            map.entry("raw")
                .or_insert_with(|| Value::String(line.to_string()));
            if !map.contains_key("type") {
                map.insert(
                    "type".to_string(),
                    Value::String(classify(line).as_str().to_string()),
                );
            }
            let data = Value::Object(map);
            if let Some(ts) = timestamp_from_value(&data, "") {
                let mut map = match data {
                    Value::Object(m) => m,
                    _ => unreachable!(),
                };
                map.insert("timestamp".to_string(), Value::String(ts));
                return Value::Object(map);
            }
            return data;
        }
    }

    let mut map = serde_json::Map::new();
    map.insert("raw".to_string(), Value::String(line.to_string()));
    map.insert(
        "type".to_string(),
        Value::String(classify(line).as_str().to_string()),
    );
    if let Some(ts) = timestamp_from_line(line) {
        map.insert("timestamp".to_string(), Value::String(ts));
    }
    Value::Object(map)
}

/// Sliding one-second delivery window for the log stream.
///
/// Lines past the cap inside the current window are dropped, not queued —
/// the stream sheds load instead of buffering.
#[derive(Debug)]
pub struct RateWindow {
    cap: usize,
    sent: usize,
    window_start: Instant,
}

impl RateWindow {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            sent: 0,
            window_start: Instant::now(),
        }
    }

    /// True if the line may be delivered; counts it against the window.
    pub fn allow(&mut self) -> bool {
        self.allow_at(Instant::now())
    }

    /// Clock-injectable form of [`RateWindow::allow`].
    pub fn allow_at(&mut self, now: Instant) -> bool {
        if now.duration_since(self.window_start) >= Duration::from_secs(1) {
            self.sent = 0;
            self.window_start = now;
        }
        if self.sent >= self.cap {
            return false;
        }
        self.sent += 1;
        true
    }
}
