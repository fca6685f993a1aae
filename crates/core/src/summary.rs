// crates/core/src/summary.rs
//! Whole-file session summary extraction with an mtime-keyed cache.
//!
//! One forward pass over the transcript accumulates provider/model, token
//! and cost totals (aggregate and per model), the first user message
//! excerpt, and the processing/idle status inference. Results are cached
//! per path and invalidated by any change to the file's modification time.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum characters kept from the first user message, for display.
const FIRST_MSG_CHARS: usize = 30;

/// A session transcript's last-event recency window: an assistant message
/// ending in a tool call only counts as "still processing" if the file was
/// written within this many seconds.
const RECENT_SECS: f64 = 30.0;

/// Inferred session activity status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Processing,
}

/// Accumulated token and cost totals, aggregate or per model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageTotals {
    pub input: u64,
    pub output: u64,
    pub cache_read: u64,
    pub total_tokens: u64,
    pub cost: f64,
}

impl UsageTotals {
    fn combined(&self) -> u64 {
        self.input + self.output + self.cache_read
    }

    fn finalize(mut self) -> Self {
        self.total_tokens = self.combined();
        self.cost = round6(self.cost);
        self
    }
}

/// Summary of one transcript file, cached by (path, mtime).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub provider: String,
    pub model: String,
    pub status: SessionStatus,
    pub message_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_since: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageTotals>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<BTreeMap<String, UsageTotals>>,
    #[serde(rename = "firstMsg", skip_serializing_if = "Option::is_none")]
    pub first_msg: Option<String>,
}

impl Default for SessionSummary {
    fn default() -> Self {
        Self {
            provider: String::new(),
            model: String::new(),
            status: SessionStatus::Idle,
            message_count: 0,
            idle_since: None,
            usage: None,
            models: None,
            first_msg: None,
        }
    }
}

/// The `cost` field as it appears in the wild: absent, a bare number, or an
/// object carrying a `total`. Resolved once here, never re-inspected
/// downstream.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
enum CostField {
    Number(f64),
    Object {
        #[serde(default)]
        total: f64,
    },
}

impl CostField {
    fn amount(self) -> f64 {
        match self {
            CostField::Number(n) => n,
            CostField::Object { total } => total,
        }
    }
}

/// Mtime-keyed summary cache. Safe for concurrent use from many request
/// handlers; the lock guards only the map, never the file scan, so two
/// callers racing on the same file may both scan (duplicate work, no
/// corruption).
#[derive(Debug, Default)]
pub struct SummaryCache {
    inner: Mutex<HashMap<PathBuf, (f64, SessionSummary)>>,
}

impl SummaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Summarize `path`, reusing the cached result while the mtime is
    /// unchanged. Returns a copy; callers cannot mutate the cached value.
    pub fn extract(&self, path: &Path, mtime: f64) -> SessionSummary {
        {
            let cache = self.inner.lock().expect("summary cache lock");
            if let Some((cached_mtime, summary)) = cache.get(path) {
                if *cached_mtime == mtime {
                    return summary.clone();
                }
            }
        }

        let summary = scan_transcript(path, mtime);

        let mut cache = self.inner.lock().expect("summary cache lock");
        cache.insert(path.to_path_buf(), (mtime, summary.clone()));
        summary
    }

    /// Convenience wrapper that stats the file itself. A missing or
    /// unreadable file yields the default summary, not an error.
    pub fn extract_auto(&self, path: &Path) -> SessionSummary {
        match file_mtime(path) {
            Some(mtime) => self.extract(path, mtime),
            None => SessionSummary::default(),
        }
    }
}

/// Modification time as fractional seconds since the epoch.
pub(crate) fn file_mtime(path: &Path) -> Option<f64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(
        modified
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64(),
    )
}

fn round6(v: f64) -> f64 {
    (v * 1e6).round() / 1e6
}

/// Single forward pass over the whole transcript.
fn scan_transcript(path: &Path, mtime: f64) -> SessionSummary {
    let mut summary = SessionSummary::default();

    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return summary,
    };

    let mut totals = UsageTotals::default();
    let mut per_model: BTreeMap<String, UsageTotals> = BTreeMap::new();
    // The model in effect for usage attribution is sticky: it only changes
    // when a line supplies a non-empty model.
    let mut current_model = String::new();

    let mut last_event_type = String::new();
    let mut last_role = String::new();
    let mut last_line = String::new();
    // toolCallId → has a matching toolResult been seen yet
    let mut tool_results: HashMap<String, bool> = HashMap::new();

    let mut line_count = 0usize;
    for line in BufReader::new(file).lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        line_count += 1;
        last_line = line.clone();

        let obj: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(_) => continue,
        };

        let msg = obj.get("message");
        for key in ["provider", "model"] {
            let value = obj
                .get(key)
                .or_else(|| msg.and_then(|m| m.get(key)))
                .and_then(Value::as_str);
            if let Some(v) = value {
                match key {
                    "provider" => summary.provider = v.to_string(),
                    _ => summary.model = v.to_string(),
                }
            }
        }
        if !summary.model.is_empty() {
            current_model = summary.model.clone();
        }

        let usage = obj
            .get("usage")
            .or_else(|| msg.and_then(|m| m.get("usage")))
            .filter(|u| u.is_object());
        if let Some(usage) = usage {
            let input = u64_field(usage, "input");
            let output = u64_field(usage, "output");
            let cache_read = u64_field(usage, "cacheRead");
            let cost = usage
                .get("cost")
                .cloned()
                .and_then(|c| serde_json::from_value::<CostField>(c).ok())
                .map(CostField::amount)
                .unwrap_or(0.0);

            totals.input += input;
            totals.output += output;
            totals.cache_read += cache_read;
            totals.cost += cost;

            if !current_model.is_empty() {
                let pm = per_model.entry(current_model.clone()).or_default();
                pm.input += input;
                pm.output += output;
                pm.cache_read += cache_read;
                pm.cost += cost;
            }
        }

        last_event_type = obj
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        if last_event_type == "message" {
            let msg = obj.get("message").cloned().unwrap_or(Value::Null);
            last_role = msg
                .get("role")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();

            if last_role == "assistant" {
                for id in tool_call_ids(msg.get("content")) {
                    // A re-issued id goes back to pending.
                    tool_results.insert(id, false);
                }
            }
            if last_role == "toolResult" {
                if let Some(id) = msg.get("toolCallId").and_then(Value::as_str) {
                    if !id.is_empty() {
                        tool_results.insert(id.to_string(), true);
                    }
                }
            }

            if summary.first_msg.is_none() && last_role == "user" {
                if let Some(text) = first_text(msg.get("content")) {
                    summary.first_msg = Some(truncate_chars(&text, FIRST_MSG_CHARS));
                }
            }
        }
    }

    summary.message_count = line_count;

    let pending_tool_call = tool_results.values().any(|resolved| !resolved);

    let mut processing = false;
    if line_count > 0 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        let is_recent = now - mtime < RECENT_SECS;

        // Priority order; first matching rule wins. Preserved exactly,
        // including the known edge where a finished session whose last
        // assistant turn ends in a tool call is reported as processing
        // while the file is recent.
        if pending_tool_call {
            processing = true;
        } else if last_event_type == "run_start" || last_event_type == "tool_start" {
            processing = true;
        } else if last_event_type == "message" && last_role == "user" {
            processing = true;
        } else if last_event_type == "message" && last_role == "toolResult" {
            processing = true;
        } else if is_recent && last_role == "assistant" {
            if let Ok(obj) = serde_json::from_str::<Value>(&last_line) {
                let content = obj.get("message").and_then(|m| m.get("content"));
                processing = has_tool_call(content);
            }
        }
    }

    if processing {
        summary.status = SessionStatus::Processing;
    } else {
        summary.status = SessionStatus::Idle;
        summary.idle_since = Some(mtime);
    }

    if totals.combined() > 0 {
        summary.usage = Some(totals.finalize());
    }
    let models: BTreeMap<String, UsageTotals> = per_model
        .into_iter()
        .filter(|(_, u)| u.combined() > 0)
        .map(|(m, u)| (m, u.finalize()))
        .collect();
    if !models.is_empty() {
        summary.models = Some(models);
    }

    summary
}

fn u64_field(obj: &Value, key: &str) -> u64 {
    obj.get(key).and_then(Value::as_u64).unwrap_or(0)
}

/// All toolCall ids in a message content array (non-empty ids only).
fn tool_call_ids(content: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(blocks)) = content else {
        return Vec::new();
    };
    blocks
        .iter()
        .filter(|b| b.get("type").and_then(Value::as_str) == Some("toolCall"))
        .filter_map(|b| b.get("toolCallId").and_then(Value::as_str))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// True if any block is a toolCall, id or not.
fn has_tool_call(content: Option<&Value>) -> bool {
    matches!(content, Some(Value::Array(blocks))
        if blocks.iter().any(|b| b.get("type").and_then(Value::as_str) == Some("toolCall")))
}

/// First text payload in a message content value (bare string or text block).
fn first_text(content: Option<&Value>) -> Option<String> {
    match content? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(blocks) => blocks
            .iter()
            .find(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            .and_then(|b| b.get("text").and_then(Value::as_str))
            .filter(|t| !t.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Char-boundary-safe truncation.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
