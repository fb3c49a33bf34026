//! Core domain logic for the session viewer.
//!
//! This crate contains the ingestion pipeline for on-disk agent sessions:
//! - Discovery: scanning a session root for directory and legacy file sessions
//! - Metadata: single-pass streaming extraction from JSONL event logs
//! - Ordering: deterministic, stably-sorted event sequences for the viewer

pub mod events;
pub mod fs_util;
pub mod metadata;
pub mod repository;
pub mod session;
pub mod types;
pub mod workspace;

pub use events::{SessionDetail, SessionEvent, SessionMeta, session_detail};
pub use metadata::SessionMetadata;
pub use repository::{RepositoryError, SessionPage, SessionRepository};
pub use session::{Session, SessionKind};
pub use types::{SessionId, ValidationError};
