//! Session domain model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metadata::SessionMetadata;
use crate::types::SessionId;

/// Summary shown for directory sessions with no other summary source.
pub const NO_SUMMARY: &str = "No summary";

/// Summary shown for legacy file sessions with no user message.
pub const LEGACY_SUMMARY: &str = "Legacy session";

/// How a session is represented on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    /// A folder with a workspace descriptor and optional event log.
    Directory,
    /// A single legacy `<id>.jsonl` file at the session root.
    File,
}

impl SessionKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::File => "file",
        }
    }
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered session, rebuilt from scratch on every scan.
///
/// Instances are immutable once returned; the insight subsystem only
/// touches files, never these values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    #[serde(rename = "type")]
    pub kind: SessionKind,
    /// Free-form descriptor fields; callers read by key.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub workspace: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub summary: String,
    pub has_events: bool,
    pub event_count: usize,
    /// Milliseconds between first and last event timestamp.
    #[serde(rename = "duration")]
    pub duration_ms: Option<i64>,
    pub is_imported: bool,
    pub has_insight: bool,
    pub copilot_version: Option<String>,
    pub selected_model: Option<String>,
}

/// Parses an RFC 3339 descriptor value, if present.
fn descriptor_time(workspace: &BTreeMap<String, String>, key: &str) -> Option<DateTime<Utc>> {
    workspace
        .get(key)
        .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

impl Session {
    /// Builds a directory session.
    ///
    /// Descriptor `created_at`/`updated_at` win over the filesystem times;
    /// the summary falls back from descriptor to first user message to a
    /// fixed placeholder.
    pub fn from_directory(
        id: SessionId,
        fs_times: (DateTime<Utc>, DateTime<Utc>),
        workspace: BTreeMap<String, String>,
        event_count: usize,
        metadata: &SessionMetadata,
        is_imported: bool,
        has_insight: bool,
    ) -> Self {
        let created_at = descriptor_time(&workspace, "created_at").unwrap_or(fs_times.0);
        let updated_at = descriptor_time(&workspace, "updated_at").unwrap_or(fs_times.1);

        let summary = workspace
            .get("summary")
            .filter(|s| !s.is_empty())
            .cloned()
            .or_else(|| {
                (!metadata.first_user_message.is_empty())
                    .then(|| metadata.first_user_message.clone())
            })
            .unwrap_or_else(|| NO_SUMMARY.to_string());

        Self {
            id,
            kind: SessionKind::Directory,
            workspace,
            created_at,
            updated_at,
            summary,
            has_events: event_count > 0,
            event_count,
            duration_ms: metadata.duration_ms,
            is_imported,
            has_insight,
            copilot_version: metadata.copilot_version.clone(),
            selected_model: metadata.selected_model.clone(),
        }
    }

    /// Builds a legacy file session. File sessions never carry a
    /// descriptor, import marker, or insight report.
    pub fn from_file(
        id: SessionId,
        fs_times: (DateTime<Utc>, DateTime<Utc>),
        event_count: usize,
        metadata: &SessionMetadata,
    ) -> Self {
        let summary = if metadata.first_user_message.is_empty() {
            LEGACY_SUMMARY.to_string()
        } else {
            metadata.first_user_message.clone()
        };

        Self {
            id,
            kind: SessionKind::File,
            workspace: BTreeMap::new(),
            created_at: fs_times.0,
            updated_at: fs_times.1,
            summary,
            has_events: event_count > 0,
            event_count,
            duration_ms: metadata.duration_ms,
            is_imported: false,
            has_insight: false,
            copilot_version: metadata.copilot_version.clone(),
            selected_model: metadata.selected_model.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn id(s: &str) -> SessionId {
        SessionId::new(s).unwrap()
    }

    fn fs_times() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_directory_session_prefers_descriptor_fields() {
        let workspace = BTreeMap::from([
            ("summary".to_string(), "S".to_string()),
            ("created_at".to_string(), "2026-01-01T00:00:00Z".to_string()),
            ("updated_at".to_string(), "2026-01-02T00:00:00Z".to_string()),
        ]);
        let metadata = SessionMetadata::default();
        let session = Session::from_directory(
            id("s1"),
            fs_times(),
            workspace,
            5,
            &metadata,
            false,
            false,
        );

        assert_eq!(session.summary, "S");
        assert_eq!(
            session.created_at,
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            session.updated_at,
            Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap()
        );
        assert_eq!(session.event_count, 5);
        assert!(session.has_events);
    }

    #[test]
    fn test_directory_session_falls_back_to_filesystem_times() {
        let session = Session::from_directory(
            id("s1"),
            fs_times(),
            BTreeMap::new(),
            0,
            &SessionMetadata::default(),
            false,
            false,
        );
        assert_eq!(session.created_at, fs_times().0);
        assert_eq!(session.updated_at, fs_times().1);
        assert!(!session.has_events);
    }

    #[test]
    fn test_directory_summary_falls_back_to_first_user_message() {
        let metadata = SessionMetadata {
            first_user_message: "add pagination".to_string(),
            ..SessionMetadata::default()
        };
        let session = Session::from_directory(
            id("s1"),
            fs_times(),
            BTreeMap::new(),
            3,
            &metadata,
            false,
            false,
        );
        assert_eq!(session.summary, "add pagination");
    }

    #[test]
    fn test_directory_summary_placeholder() {
        let session = Session::from_directory(
            id("s1"),
            fs_times(),
            BTreeMap::new(),
            0,
            &SessionMetadata::default(),
            false,
            false,
        );
        assert_eq!(session.summary, NO_SUMMARY);
    }

    #[test]
    fn test_unparseable_descriptor_time_falls_back() {
        let workspace = BTreeMap::from([("created_at".to_string(), "yesterday".to_string())]);
        let session = Session::from_directory(
            id("s1"),
            fs_times(),
            workspace,
            0,
            &SessionMetadata::default(),
            false,
            false,
        );
        assert_eq!(session.created_at, fs_times().0);
    }

    #[test]
    fn test_file_session_defaults() {
        let session = Session::from_file(id("legacy"), fs_times(), 0, &SessionMetadata::default());
        assert_eq!(session.kind, SessionKind::File);
        assert_eq!(session.summary, LEGACY_SUMMARY);
        assert!(!session.has_events);
        assert!(!session.is_imported);
        assert!(!session.has_insight);
        assert!(session.workspace.is_empty());
    }

    #[test]
    fn test_file_session_uses_first_user_message() {
        let metadata = SessionMetadata {
            first_user_message: "hello there".to_string(),
            duration_ms: Some(1500),
            ..SessionMetadata::default()
        };
        let session = Session::from_file(id("legacy"), fs_times(), 7, &metadata);
        assert_eq!(session.summary, "hello there");
        assert_eq!(session.duration_ms, Some(1500));
        assert_eq!(session.event_count, 7);
        assert!(session.has_events);
    }

    #[test]
    fn test_serializes_with_camel_case_wire_names() {
        let session = Session::from_file(id("legacy"), fs_times(), 2, &SessionMetadata::default());
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["type"], "file");
        assert_eq!(value["eventCount"], 2);
        assert_eq!(value["hasEvents"], true);
        assert!(value.get("duration").is_some());
        assert!(value.get("copilotVersion").is_some());
        assert!(value.get("duration_ms").is_none());
    }
}
