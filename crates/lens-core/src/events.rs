//! Event log loading and deterministic ordering.

use std::path::Path;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::metadata::{MODEL_CHANGE, SESSION_START};
use crate::repository::{EVENTS_FILE, RepositoryError, SessionRepository};
use crate::session::Session;
use crate::types::SessionId;

/// One line of a session's JSONL log.
///
/// The type vocabulary is open and payload shapes vary by type, so `data`
/// stays an untyped map and unrecognized top-level fields are preserved in
/// `extra` rather than rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Zero-based position among the file's non-blank lines. Purely an
    /// ordering tiebreaker; never serialized.
    #[serde(skip)]
    file_index: usize,
}

impl SessionEvent {
    fn data_str(&self, key: &str) -> Option<&str> {
        self.data
            .as_ref()?
            .get(key)?
            .as_str()
            .filter(|s| !s.is_empty())
    }

    fn is_type(&self, expected: &str) -> bool {
        self.event_type.as_deref() == Some(expected)
    }

    /// Sort key: events without a parseable timestamp group at time zero.
    fn timestamp_millis(&self) -> i64 {
        self.timestamp
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map_or(0, |dt| dt.timestamp_millis())
    }
}

/// Loads a session's event log and returns it in deterministic order.
///
/// The log is `<root>/<id>/events.jsonl` for directory sessions and
/// `<root>/<id>.jsonl` for legacy ones; neither existing yields an empty
/// sequence. Malformed lines are dropped silently.
///
/// Ordering is `(timestamp, file position)` ascending. Stability under
/// timestamp ties is a correctness property, not an optimization: an
/// assistant message and its tool-start events frequently share one
/// timestamp, and their file order encodes the causal order the viewer
/// renders.
pub fn load(root: &Path, id: &SessionId) -> Vec<SessionEvent> {
    let session_path = root.join(id.as_str());
    let log_path = if session_path.is_dir() {
        session_path.join(EVENTS_FILE)
    } else {
        root.join(format!("{id}.jsonl"))
    };

    let Ok(content) = std::fs::read_to_string(&log_path) else {
        return Vec::new();
    };

    let mut events: Vec<SessionEvent> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .filter_map(|(index, line)| match serde_json::from_str::<SessionEvent>(line) {
            Ok(mut event) => {
                event.file_index = index;
                Some(event)
            }
            Err(e) => {
                tracing::trace!(line = index + 1, error = %e, "dropping malformed event line");
                None
            }
        })
        .collect();

    events.sort_by_key(|event| (event.timestamp_millis(), event.file_index));
    events
}

/// Session detail for the viewer: the entity, its ordered events, and
/// display metadata refined from the event stream.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    pub session: Session,
    pub events: Vec<SessionEvent>,
    pub metadata: SessionMeta,
}

/// Display metadata for a session detail view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMeta {
    #[serde(rename = "type")]
    pub kind: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    pub created: String,
    pub updated: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copilot_version: Option<String>,
}

/// Builds display metadata, letting the event stream override the
/// scan-derived values: in-stream model events win over the entity's
/// model, and the first/last ordered event timestamps win over the
/// filesystem-derived created/updated times.
fn build_meta(session: &Session, events: &[SessionEvent]) -> SessionMeta {
    let mut meta = SessionMeta {
        kind: session.kind.to_string(),
        summary: session.summary.clone(),
        model: session.selected_model.clone(),
        repo: session.workspace.get("repository").cloned(),
        branch: session.workspace.get("branch").cloned(),
        cwd: session.workspace.get("cwd").cloned(),
        created: session.created_at.to_rfc3339(),
        updated: session.updated_at.to_rfc3339(),
        copilot_version: session.copilot_version.clone(),
    };

    if let Some(model) = events
        .iter()
        .find(|e| e.is_type(SESSION_START))
        .and_then(|e| e.data_str("selectedModel"))
    {
        meta.model = Some(model.to_string());
    }
    if let Some(change) = events.iter().find(|e| e.is_type(MODEL_CHANGE)) {
        if let Some(model) = change.data_str("newModel").or_else(|| change.data_str("model")) {
            meta.model = Some(model.to_string());
        }
    }

    if let Some(first) = events.first().and_then(|e| e.timestamp.clone()) {
        meta.created = first;
    }
    if let Some(last) = events.last().and_then(|e| e.timestamp.clone()) {
        meta.updated = last;
    }

    meta
}

/// Resolves a session together with its ordered events and refined
/// metadata. `None` when the session does not exist in either form.
pub fn session_detail(
    repository: &SessionRepository,
    id: &SessionId,
) -> Result<Option<SessionDetail>, RepositoryError> {
    let Some(session) = repository.find_by_id(id)? else {
        return Ok(None);
    };
    let events = load(repository.root(), id);
    let metadata = build_meta(&session, &events);
    Ok(Some(SessionDetail {
        session,
        events,
        metadata,
    }))
}
