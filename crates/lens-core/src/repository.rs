//! Directory scanning and session assembly.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::fs_util::{count_lines, entry_times, should_skip_entry};
use crate::metadata::{self, SessionMetadata};
use crate::session::Session;
use crate::types::SessionId;
use crate::workspace::{self, DESCRIPTOR_FILE};

/// Event log file name inside a directory session.
pub const EVENTS_FILE: &str = "events.jsonl";

/// Presence-only marker left by the import path.
const IMPORT_MARKER_FILE: &str = ".imported";

/// Completed insight report file name.
pub const INSIGHT_REPORT_FILE: &str = "agent-review.md";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One page of the session list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPage {
    pub sessions: Vec<Session>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
}

/// Scans a session root directory and assembles [`Session`] entities.
///
/// Every call re-reads the filesystem; there is no cache or persisted
/// identity between scans.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    root: PathBuf,
}

impl SessionRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns every valid session, sorted by `updated_at` descending.
    ///
    /// Per-entry assembly fans out across a thread pool; an entry that
    /// fails is dropped with a warning while the rest of the scan
    /// proceeds. Ties in `updated_at` keep enumeration order (the sort is
    /// stable), so repeated scans of an unchanged tree are deterministic.
    pub fn find_all(&self) -> Result<Vec<Session>, RepositoryError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut entries: Vec<(String, PathBuf)> = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if should_skip_entry(&name) {
                continue;
            }
            entries.push((name, entry.path()));
        }

        let mut sessions: Vec<Session> = entries
            .par_iter()
            .filter_map(|(name, path)| match self.build_entry(name, path) {
                Ok(session) => session,
                Err(e) => {
                    tracing::warn!(path = ?path, error = %e, "skipping unreadable session entry");
                    None
                }
            })
            .collect();

        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    /// Returns one page of [`find_all`](Self::find_all).
    pub fn find_page(&self, offset: usize, limit: usize) -> Result<SessionPage, RepositoryError> {
        let all = self.find_all()?;
        let total = all.len();
        let sessions: Vec<Session> = all.into_iter().skip(offset).take(limit).collect();
        Ok(SessionPage {
            sessions,
            total,
            offset,
            limit,
            has_more: offset.saturating_add(limit) < total,
        })
    }

    /// Resolves a single session, directory form first, then legacy file.
    ///
    /// The [`SessionId`] type guarantees the id is safe as a path
    /// component before any filesystem access happens here.
    pub fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, RepositoryError> {
        let dir_path = self.root.join(id.as_str());
        if dir_path.is_dir() {
            if let Some(session) = self.build_directory_session(id.as_str(), &dir_path)? {
                return Ok(Some(session));
            }
        }

        let file_path = self.root.join(format!("{id}.jsonl"));
        if file_path.is_file() {
            return self.build_file_session(&format!("{id}.jsonl"), &file_path);
        }

        Ok(None)
    }

    /// Classifies one root entry. Directories without a descriptor and
    /// entries that are neither directories nor `.jsonl` files yield
    /// `None`.
    fn build_entry(&self, name: &str, path: &Path) -> Result<Option<Session>, RepositoryError> {
        let entry_meta = std::fs::metadata(path)?;
        if entry_meta.is_dir() {
            self.build_directory_session(name, path)
        } else if name.ends_with(".jsonl") {
            self.build_file_session(name, path)
        } else {
            Ok(None)
        }
    }

    fn build_directory_session(
        &self,
        name: &str,
        path: &Path,
    ) -> Result<Option<Session>, RepositoryError> {
        let Ok(id) = SessionId::new(name) else {
            tracing::warn!(entry = name, "skipping directory with unusable session id");
            return Ok(None);
        };

        // Validity gate: a directory session without a descriptor is not
        // a session at all.
        let descriptor_path = path.join(DESCRIPTOR_FILE);
        if !descriptor_path.is_file() {
            return Ok(None);
        }

        let workspace = workspace::parse_descriptor(&descriptor_path);
        let events_path = path.join(EVENTS_FILE);
        let (event_count, metadata) = if events_path.is_file() {
            (count_lines(&events_path), metadata::extract(&events_path))
        } else {
            (0, SessionMetadata::default())
        };

        let is_imported = path.join(IMPORT_MARKER_FILE).exists();
        let has_insight = path.join(INSIGHT_REPORT_FILE).is_file();
        let fs_times = entry_times(&std::fs::metadata(path)?);

        Ok(Some(Session::from_directory(
            id,
            fs_times,
            workspace,
            event_count,
            &metadata,
            is_imported,
            has_insight,
        )))
    }

    fn build_file_session(
        &self,
        name: &str,
        path: &Path,
    ) -> Result<Option<Session>, RepositoryError> {
        let stem = name.trim_end_matches(".jsonl");
        let Ok(id) = SessionId::new(stem) else {
            tracing::warn!(entry = name, "skipping file with unusable session id");
            return Ok(None);
        };

        let event_count = count_lines(path);
        let metadata = metadata::extract(path);
        let fs_times = entry_times(&std::fs::metadata(path)?);

        Ok(Some(Session::from_file(
            id,
            fs_times,
            event_count,
            &metadata,
        )))
    }
}
