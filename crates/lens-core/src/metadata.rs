//! Single-pass metadata extraction from session event logs.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::DateTime;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::fs_util::BUFFER_SIZE;

/// Well-known event types. The vocabulary is open; nothing here assumes
/// these are the only types that occur.
pub const USER_MESSAGE: &str = "user.message";
pub const SESSION_START: &str = "session.start";
pub const MODEL_CHANGE: &str = "session.model_change";

/// Maximum length of the extracted first user message, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 200;

/// Metadata gathered from one streaming pass over an event log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMetadata {
    /// First user message, truncated to [`MAX_MESSAGE_LENGTH`] characters.
    /// Empty when the log contains no user message.
    pub first_user_message: String,
    /// Milliseconds between the first and last parseable event timestamp,
    /// in file order. `None` when fewer than two timestamped events exist
    /// or the last-seen timestamp does not exceed the first.
    pub duration_ms: Option<i64>,
    /// CLI version from the first `session.start` event.
    pub copilot_version: Option<String>,
    /// Model from the first `session.start` or `session.model_change`
    /// event that carries one.
    pub selected_model: Option<String>,
}

/// Minimal typed header for a log line; `data` stays an open map.
#[derive(Debug, Deserialize)]
struct EventHeader {
    #[serde(rename = "type")]
    event_type: Option<String>,
    timestamp: Option<String>,
    data: Option<Map<String, Value>>,
}

impl EventHeader {
    fn data_str(&self, key: &str) -> Option<&str> {
        self.data
            .as_ref()?
            .get(key)?
            .as_str()
            .filter(|s| !s.is_empty())
    }

    fn first_data_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.data_str(key))
    }

    fn is_type(&self, expected: &str) -> bool {
        self.event_type.as_deref() == Some(expected)
    }
}

/// Truncates to [`MAX_MESSAGE_LENGTH`] characters, appending `...` when cut.
fn truncate_message(message: &str) -> String {
    let mut indices = message.char_indices();
    match indices.nth(MAX_MESSAGE_LENGTH) {
        Some((byte_index, _)) => format!("{}...", &message[..byte_index]),
        None => message.to_string(),
    }
}

/// Extracts session metadata in exactly one streaming pass.
///
/// Each line is parsed independently; malformed lines are skipped, never
/// fatal. A missing or unreadable file yields the default (empty) result.
///
/// The duration uses the *last timestamp in file order*, not the numeric
/// maximum: an out-of-order timestamp near the end of the file still wins
/// as "last". Downstream behavior depends on this, so keep it.
pub fn extract(path: &Path) -> SessionMetadata {
    let Ok(file) = File::open(path) else {
        return SessionMetadata::default();
    };
    let reader = BufReader::with_capacity(BUFFER_SIZE, file);

    let mut result = SessionMetadata::default();
    let mut first_timestamp: Option<i64> = None;
    let mut last_timestamp: Option<i64> = None;

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "metadata pass aborted mid-file");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let header: EventHeader = match serde_json::from_str(&line) {
            Ok(header) => header,
            Err(e) => {
                tracing::trace!(error = %e, "skipping malformed JSON line");
                continue;
            }
        };

        if let Some(ts) = header
            .timestamp
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        {
            let millis = ts.timestamp_millis();
            first_timestamp.get_or_insert(millis);
            last_timestamp = Some(millis);
        }

        if result.first_user_message.is_empty() && header.is_type(USER_MESSAGE) {
            if let Some(message) = header.first_data_str(&["message", "content", "text"]) {
                result.first_user_message = truncate_message(message);
            }
        }

        if result.copilot_version.is_none() && header.is_type(SESSION_START) {
            if let Some(version) = header.data_str("copilotVersion") {
                result.copilot_version = Some(version.to_string());
            }
        }

        if result.selected_model.is_none()
            && (header.is_type(SESSION_START) || header.is_type(MODEL_CHANGE))
        {
            if let Some(model) = header.first_data_str(&["selectedModel", "newModel", "model"]) {
                result.selected_model = Some(model.to_string());
            }
        }
    }

    result.duration_ms = match (first_timestamp, last_timestamp) {
        (Some(first), Some(last)) if last > first => Some(last - first),
        _ => None,
    };

    result
}
