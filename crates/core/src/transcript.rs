// crates/core/src/transcript.rs
//! Transcript line parsing: one JSONL record in, one normalized session
//! event out.
//!
//! The parser is deliberately forgiving — a malformed line degrades to a
//! raw-text event instead of failing, so one bad record never aborts a
//! replay or live tail. The only input that produces no event at all is a
//! blank line.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One normalized content block inside a session event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        content: String,
    },
    Thinking {
        content: String,
    },
    ToolCall {
        name: String,
        arguments: Value,
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
    },
    /// Tool output flattened to a single text payload so the client renders
    /// it as one line regardless of how many fragments the runtime produced.
    ToolResult {
        content: String,
    },
}

/// The unit pushed over SSE for session streams — one per transcript line.
///
/// Roles: `user` / `assistant` / `toolResult` / `unknown` for messages,
/// `meta` for non-message records (the decoded object rides in `meta`),
/// and `raw` for lines that failed to parse as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub role: String,
    pub blocks: Vec<ContentBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl SessionEvent {
    fn raw(line: &str) -> Self {
        Self {
            role: "raw".to_string(),
            blocks: vec![ContentBlock::Text {
                content: line.to_string(),
            }],
            meta: None,
        }
    }

    fn meta(obj: Value) -> Self {
        Self {
            role: "meta".to_string(),
            blocks: Vec::new(),
            meta: Some(obj),
        }
    }
}

/// Parse one transcript line into a session event.
///
/// Returns `None` only for blank lines — every other input yields exactly
/// one event, so event counts track line counts during replay.
pub fn parse_transcript_line(line: &str) -> Option<SessionEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let obj: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(_) => return Some(SessionEvent::raw(line)),
    };

    if obj.get("type").and_then(Value::as_str) != Some("message") {
        return Some(SessionEvent::meta(obj));
    }

    let msg = obj.get("message").cloned().unwrap_or(Value::Null);
    let role = msg
        .get("role")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    // A bare string content is shorthand for a single text block.
    let raw_content: Vec<Value> = match msg.get("content") {
        Some(Value::String(s)) => vec![serde_json::json!({"type": "text", "text": s})],
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    if role == "toolResult" {
        // Flatten to the first text block; other fragments are discarded.
        let text = raw_content
            .iter()
            .find(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            .and_then(|b| b.get("text").and_then(Value::as_str))
            .unwrap_or("")
            .to_string();
        return Some(SessionEvent {
            role,
            blocks: vec![ContentBlock::ToolResult { content: text }],
            meta: None,
        });
    }

    let mut blocks = Vec::new();
    for b in &raw_content {
        if !b.is_object() {
            continue;
        }
        match b.get("type").and_then(Value::as_str).unwrap_or("") {
            "thinking" => blocks.push(ContentBlock::Thinking {
                content: str_field(b, "thinking"),
            }),
            "toolCall" => blocks.push(ContentBlock::ToolCall {
                name: str_field(b, "name"),
                arguments: b.get("arguments").cloned().unwrap_or(Value::Object(Default::default())),
                tool_call_id: str_field(b, "toolCallId"),
            }),
            "text" => blocks.push(ContentBlock::Text {
                content: str_field(b, "text"),
            }),
            // Unknown block types are dropped, not errored.
            _ => {}
        }
    }

    Some(SessionEvent {
        role,
        blocks,
        meta: None,
    })
}

fn str_field(obj: &Value, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}
