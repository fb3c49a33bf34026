//! Asynchronous insight report generation.
//!
//! An insight report is a markdown evaluation of one agent session,
//! produced by spawning an external analysis agent over the session's
//! event log. All job state lives on the filesystem next to the session:
//! the report file is the terminal state, a lock file marks an in-flight
//! job, and a `.tmp` capture exposes live progress. No state survives in
//! memory, so a crashed process leaves nothing worse than a stale lock.

pub mod lock;
pub mod manager;
pub mod registry;
pub mod report;

pub use lock::LOCK_TIMEOUT;
pub use manager::{
    DeleteOutcome, InsightError, InsightManager, InsightSnapshot, InsightState,
};
pub use registry::ProcessRegistry;
