// crates/core/src/directory.rs
//! Session listing: CLI table parsing, transcript directory scanning, and
//! display-label derivation from the sessions registry.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::Serialize;
use serde_json::Value;
use walkdir::WalkDir;

use crate::summary::{file_mtime, SessionSummary, SummaryCache};

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("uuid pattern compiles")
});

/// One row of the sessions listing: summary plus identity and display label.
#[derive(Debug, Clone, Serialize)]
pub struct SessionEntry {
    pub id: String,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtime: Option<f64>,
    #[serde(flatten)]
    pub summary: Option<SessionSummary>,
    #[serde(rename = "labelType", skip_serializing_if = "String::is_empty")]
    pub label_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_line: Option<String>,
}

impl SessionEntry {
    fn new(id: String, file: String) -> Self {
        Self {
            id,
            file,
            mtime: None,
            summary: None,
            label_type: String::new(),
            label: String::new(),
            raw_line: None,
        }
    }
}

/// Per-session metadata from the sessions registry, used only for labels.
#[derive(Debug, Clone, Default)]
pub struct SessionMeta {
    /// Registry key, e.g. `agent:main:main` or `agent:main:cron:xyz`.
    pub key: String,
    /// Originating channel: `heartbeat`, `feishu`, ...
    pub origin: String,
    /// Chat type for channel origins: `group`, `p2p`, ...
    pub chat_type: String,
    /// Explicit display name, when the channel supplied one.
    pub display_name: String,
}

/// Parse the boxed table emitted by the runtime's `sessions` command.
///
/// Box-drawing rows are skipped; any remaining line containing a UUID
/// becomes an entry whose transcript path is reconstructed from the id.
/// Summaries are attached only for transcripts that exist on disk.
pub fn parse_cli_sessions(
    output: &str,
    session_dir: &Path,
    cache: &SummaryCache,
) -> Vec<SessionEntry> {
    let mut entries = Vec::new();
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || line.chars().any(|c| "┌┐└┘├┤─│═".contains(c)) {
            continue;
        }
        let Some(m) = UUID_RE.find(line) else {
            continue;
        };
        let id = m.as_str().to_string();
        let path = session_dir.join(format!("{id}.jsonl"));

        let mut entry = SessionEntry::new(id, path.to_string_lossy().into_owned());
        entry.raw_line = Some(line.to_string());
        if path.is_file() {
            if let Some(mtime) = file_mtime(&path) {
                entry.mtime = Some(mtime);
                entry.summary = Some(cache.extract(&path, mtime));
            }
        }
        entries.push(entry);
    }
    entries
}

/// Scan the transcript directory for `*.jsonl` files, newest first.
pub fn scan_session_files(session_dir: &Path, cache: &SummaryCache) -> Vec<SessionEntry> {
    let Ok(read_dir) = std::fs::read_dir(session_dir) else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    for dirent in read_dir.flatten() {
        let path = dirent.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
            continue;
        }
        let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        let mut entry = SessionEntry::new(id.to_string(), path.to_string_lossy().into_owned());
        if let Some(mtime) = file_mtime(&path) {
            entry.mtime = Some(mtime);
            entry.summary = Some(cache.extract(&path, mtime));
        }
        entries.push(entry);
    }
    entries.sort_by(|a, b| {
        b.mtime
            .unwrap_or(0.0)
            .partial_cmp(&a.mtime.unwrap_or(0.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    entries
}

/// Load the sessions registry and index it by session id.
///
/// The registry is a JSON object mapping session key → metadata; a missing
/// or malformed file yields an empty index.
pub fn load_session_index(registry_file: &Path) -> HashMap<String, SessionMeta> {
    let Ok(text) = std::fs::read_to_string(registry_file) else {
        return HashMap::new();
    };
    let Ok(Value::Object(doc)) = serde_json::from_str::<Value>(&text) else {
        return HashMap::new();
    };

    let mut index = HashMap::new();
    for (key, meta) in doc {
        let Value::Object(meta) = meta else { continue };
        let get = |field: &str| -> String {
            meta.get(field)
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string()
        };
        let sid = {
            let sid = get("sessionId");
            if sid.is_empty() {
                key.clone()
            } else {
                sid
            }
        };
        index.insert(
            sid,
            SessionMeta {
                key,
                origin: get("origin"),
                chat_type: get("chatType"),
                display_name: get("displayName"),
            },
        );
    }
    index
}

/// Derive `(labelType, label)` for each entry from the registry index,
/// falling back to the first-message excerpt when the registry has nothing
/// to say.
pub fn derive_labels(entries: &mut [SessionEntry], index: &HashMap<String, SessionMeta>) {
    for entry in entries.iter_mut() {
        if let Some(meta) = index.get(&entry.id) {
            let (label_type, label) = label_for(meta);
            entry.label_type = label_type;
            entry.label = label;
        }
        if entry.label.is_empty() {
            if let Some(first_msg) = entry
                .summary
                .as_ref()
                .and_then(|s| s.first_msg.as_deref())
            {
                entry.label_type = "firstMsg".to_string();
                entry.label = first_msg.to_string();
            }
        }
    }
}

/// Label precedence: heartbeat, cron key, feishu group/DM, main session,
/// explicit display name, nothing.
fn label_for(meta: &SessionMeta) -> (String, String) {
    let tagged = |t: &str, l: &str| (t.to_string(), l.to_string());
    if meta.origin == "heartbeat" {
        return tagged("heartbeat", "Heartbeat");
    }
    if meta.key.contains("cron:") {
        return tagged("cron", "Cron Task");
    }
    if meta.origin == "feishu" {
        // Group and DM are distinct label types, not one "feishu" bucket.
        return if meta.chat_type == "group" {
            tagged("feishu_group", "Feishu Group")
        } else {
            tagged("feishu_dm", "Feishu DM")
        };
    }
    if meta.key == "agent:main:main" {
        return tagged("main", "Main Session");
    }
    if !meta.display_name.is_empty() && !meta.display_name.eq_ignore_ascii_case("unknown") {
        return tagged("name", &meta.display_name);
    }
    (String::new(), String::new())
}

/// Drop duplicate session ids, keeping the first occurrence.
pub fn dedupe_sessions(entries: Vec<SessionEntry>) -> Vec<SessionEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|e| seen.insert(e.id.clone()))
        .collect()
}

/// Locate a session's transcript: directly under the session directory, or
/// anywhere below the agent root as a fallback.
pub fn find_session_file(
    session_dir: &Path,
    agent_root: &Path,
    session_id: &str,
) -> Option<PathBuf> {
    // Ids come off the URL; refuse anything that could walk the tree.
    if session_id.is_empty()
        || session_id.contains('/')
        || session_id.contains('\\')
        || session_id.contains("..")
    {
        return None;
    }

    let file_name = format!("{session_id}.jsonl");
    let direct = session_dir.join(&file_name);
    if direct.is_file() {
        return Some(direct);
    }

    if agent_root.is_dir() {
        for dirent in WalkDir::new(agent_root).into_iter().flatten() {
            if dirent.file_type().is_file() && dirent.file_name().to_str() == Some(&file_name) {
                return Some(dirent.into_path());
            }
        }
    }
    None
}
