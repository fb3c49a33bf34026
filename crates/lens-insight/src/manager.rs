//! Single-flight insight generation.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lens_core::SessionId;
use serde::Serialize;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::{ChildStderr, ChildStdin, ChildStdout, Command};
use uuid::Uuid;

use crate::lock::{self, LOCK_TIMEOUT};
use crate::registry::ProcessRegistry;
use crate::report;

/// Completed (or failed) report file inside the session directory.
pub const REPORT_FILE: &str = "agent-review.md";
/// Lock file guarding generation for one session.
pub const LOCK_FILE: &str = "agent-review.md.lock";
/// Live capture of agent stdout while generation runs.
const LIVE_LOG_FILE: &str = "agent-review.md.tmp";
/// Input event log streamed to the agent.
const EVENTS_FILE: &str = "events.jsonl";
/// Scratch directory some agents leave inside the session folder.
const OUTPUT_SCRATCH_DIR: &str = ".output";

/// Cap on captured stderr, so a runaway agent cannot grow memory unbounded.
const STDERR_CAP: usize = 64 * 1024;

/// First line of a failure report; also how status tells apart
/// completed and failed terminal states.
const FAILURE_HEADER: &str = "# Insight Generation Failed";

/// Reports shorter than this are treated as the agent not having written
/// its destination file, so the captured stdout is used instead.
const MIN_DIRECT_REPORT_LEN: usize = 50;

const PLACEHOLDER_STARTED: &str =
    "# Generating Insight...\n\nAnalysis in progress. Please wait.";
const PLACEHOLDER_IN_FLIGHT: &str =
    "# Generating Insight...\n\nAnother request is currently generating this insight. Please wait.";

#[derive(Debug, Error)]
pub enum InsightError {
    /// Generation cannot proceed without an event log.
    #[error("events log not found for session {0}")]
    EventsNotFound(String),

    /// The lock could not be acquired even after stale-lock reclamation.
    #[error("insight lock contended for session {0}")]
    LockContended(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Observable state of an insight job, encoded entirely on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightState {
    NotStarted,
    Generating,
    Completed,
    Timeout,
    Failed,
}

impl InsightState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Timeout => "timeout",
            Self::Failed => "failed",
        }
    }

    /// Whether polling can stop at this state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Timeout | Self::Failed)
    }
}

impl std::fmt::Display for InsightState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of an insight job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightSnapshot {
    #[serde(rename = "status")]
    pub state: InsightState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    /// Live agent output captured so far, when generation is in flight.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_ms: Option<u128>,
}

impl InsightSnapshot {
    fn bare(state: InsightState) -> Self {
        Self {
            state,
            report: None,
            log: None,
            started_at: None,
            generated_at: None,
            age_ms: None,
        }
    }
}

/// Outcome of a delete request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Filesystem layout of one insight job.
#[derive(Debug, Clone)]
struct JobPaths {
    session_dir: PathBuf,
    report: PathBuf,
    lock: PathBuf,
    live_log: PathBuf,
    events: PathBuf,
}

/// Controls insight generation for sessions under one root.
///
/// At most one generation runs per session at a time; the lock file is
/// the only concurrency primitive, so independent processes serving the
/// same root get the same guarantee.
#[derive(Debug)]
pub struct InsightManager {
    session_root: PathBuf,
    agent_command: String,
    timeout: Duration,
    registry: Arc<ProcessRegistry>,
}

impl InsightManager {
    pub fn new(
        session_root: impl Into<PathBuf>,
        agent_command: impl Into<String>,
        registry: Arc<ProcessRegistry>,
    ) -> Self {
        Self {
            session_root: session_root.into(),
            agent_command: agent_command.into(),
            timeout: LOCK_TIMEOUT,
            registry,
        }
    }

    /// Overrides the lock staleness timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<ProcessRegistry> {
        &self.registry
    }

    fn paths(&self, id: &SessionId) -> JobPaths {
        let session_dir = self.session_root.join(id.as_str());
        JobPaths {
            report: session_dir.join(REPORT_FILE),
            lock: session_dir.join(LOCK_FILE),
            live_log: session_dir.join(LIVE_LOG_FILE),
            events: session_dir.join(EVENTS_FILE),
            session_dir,
        }
    }

    /// Generates (or returns) the insight report for a session.
    ///
    /// Returns immediately: when a generation is started the caller gets
    /// a `Generating` snapshot and polls [`status`](Self::status) until a
    /// terminal state. Concurrent calls collapse into the in-flight job;
    /// a lock older than the timeout is reclaimed first. `force` discards
    /// an existing report but never kills an in-flight fresh job.
    pub async fn generate(
        &self,
        id: &SessionId,
        force: bool,
    ) -> Result<InsightSnapshot, InsightError> {
        let paths = self.paths(id);

        if !force {
            if let Some(snapshot) = read_terminal(&paths).await? {
                return Ok(snapshot);
            }
        }

        if !lock::try_acquire(&paths.lock, id.as_str()).await? {
            let age = lock::age(&paths.lock).await.unwrap_or_default();
            if age < self.timeout {
                // Single-flight: report the in-flight job, spawn nothing.
                return Ok(InsightSnapshot {
                    report: Some(PLACEHOLDER_IN_FLIGHT.to_string()),
                    log: tokio::fs::read_to_string(&paths.live_log).await.ok(),
                    started_at: lock::started_at(&paths.lock).await,
                    age_ms: Some(age.as_millis()),
                    ..InsightSnapshot::bare(InsightState::Generating)
                });
            }
            tracing::warn!(session = %id, age_secs = age.as_secs(), "removing stale insight lock");
            let _ = tokio::fs::remove_file(&paths.lock).await;
            if !lock::try_acquire(&paths.lock, id.as_str()).await? {
                return Err(InsightError::LockContended(id.to_string()));
            }
        }

        if !tokio::fs::try_exists(&paths.events).await.unwrap_or(false) {
            let _ = tokio::fs::remove_file(&paths.lock).await;
            return Err(InsightError::EventsNotFound(id.to_string()));
        }

        if force {
            let _ = tokio::fs::remove_file(&paths.report).await;
        }

        self.spawn_generation(id, paths).await;

        Ok(InsightSnapshot {
            report: Some(PLACEHOLDER_STARTED.to_string()),
            started_at: Some(Utc::now()),
            ..InsightSnapshot::bare(InsightState::Generating)
        })
    }

    /// Read-only status check; never spawns anything.
    pub async fn status(&self, id: &SessionId) -> Result<InsightSnapshot, InsightError> {
        let paths = self.paths(id);

        if let Some(snapshot) = read_terminal(&paths).await? {
            return Ok(snapshot);
        }

        match lock::age(&paths.lock).await {
            Ok(age) => {
                let state = if age >= self.timeout {
                    InsightState::Timeout
                } else {
                    InsightState::Generating
                };
                Ok(InsightSnapshot {
                    log: tokio::fs::read_to_string(&paths.live_log).await.ok(),
                    started_at: lock::started_at(&paths.lock).await,
                    age_ms: Some(age.as_millis()),
                    ..InsightSnapshot::bare(state)
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Ok(InsightSnapshot::bare(InsightState::NotStarted))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Removes the completed report. A missing report is a successful
    /// no-op.
    pub async fn delete(&self, id: &SessionId) -> Result<DeleteOutcome, InsightError> {
        let paths = self.paths(id);
        match tokio::fs::remove_file(&paths.report).await {
            Ok(()) => Ok(DeleteOutcome {
                success: true,
                message: None,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(DeleteOutcome {
                success: true,
                message: Some("insight report not found".to_string()),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Spawns the agent and detaches a task that drives it to completion.
    /// The lock is already held; every exit path of the task releases it.
    async fn spawn_generation(&self, id: &SessionId, paths: JobPaths) {
        let scratch = std::env::temp_dir().join(format!("agent-review-{id}-{}", Uuid::new_v4()));
        if let Err(e) = tokio::fs::create_dir_all(&scratch).await {
            tracing::error!(session = %id, error = %e, "failed to create agent scratch dir");
            write_failure_report(&paths.report, &format!("failed to create scratch dir: {e}"))
                .await;
            cleanup(&paths, &scratch).await;
            return;
        }

        let prompt = build_prompt(&paths.session_dir, &paths.report);
        let mut command = Command::new(&self.agent_command);
        command
            .arg("--config-dir")
            .arg(&scratch)
            .arg("--yolo")
            .arg("-p")
            .arg(&prompt)
            .current_dir(&paths.session_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(agent = %self.agent_command, error = %e, "failed to spawn analysis agent");
                write_failure_report(
                    &paths.report,
                    &format!("failed to spawn {}: {e}", self.agent_command),
                )
                .await;
                cleanup(&paths, &scratch).await;
                return;
            }
        };

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let token = self.registry.register(format!("insight-{id}"), child).await;

        let registry = Arc::clone(&self.registry);
        let session = id.to_string();
        tokio::spawn(async move {
            let stderr_tail =
                drive_pipes(stdin, stdout, stderr, &paths.events, &paths.live_log).await;

            // The registry swept the child only if we are shutting down;
            // the lock then expires by staleness in a later run.
            let Some(mut child) = registry.remove(token).await else {
                return;
            };

            match child.wait().await {
                Ok(status) => finalize(status, &stderr_tail, &paths, &session).await,
                Err(e) => {
                    tracing::error!(session, error = %e, "failed to reap analysis agent");
                    write_failure_report(&paths.report, &format!("failed to reap agent: {e}"))
                        .await;
                }
            }
            cleanup(&paths, &scratch).await;
        });
    }
}

/// Reads a terminal report, distinguishing success from a written-out
/// failure. `None` when no report exists yet.
async fn read_terminal(paths: &JobPaths) -> Result<Option<InsightSnapshot>, InsightError> {
    match tokio::fs::read_to_string(&paths.report).await {
        Ok(content) => {
            let state = if content.starts_with(FAILURE_HEADER) {
                InsightState::Failed
            } else {
                InsightState::Completed
            };
            let generated_at = tokio::fs::metadata(&paths.report)
                .await
                .ok()
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Utc>::from);
            Ok(Some(InsightSnapshot {
                report: Some(content),
                generated_at,
                ..InsightSnapshot::bare(state)
            }))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Runs the three pipe transfers concurrently until the agent closes its
/// streams, returning the capped stderr tail.
async fn drive_pipes(
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    events: &Path,
    live_log: &Path,
) -> Vec<u8> {
    let feed_events = async {
        let Some(mut stdin) = stdin else { return };
        let Ok(mut file) = tokio::fs::File::open(events).await else {
            return;
        };
        // A broken pipe just means the agent stopped reading early.
        if let Err(e) = tokio::io::copy(&mut file, &mut stdin).await {
            tracing::debug!(error = %e, "event feed to agent ended early");
        }
    };

    let capture_stdout = async {
        let Some(mut stdout) = stdout else { return };
        let Ok(mut sink) = tokio::fs::File::create(live_log).await else {
            return;
        };
        if let Err(e) = tokio::io::copy(&mut stdout, &mut sink).await {
            tracing::debug!(error = %e, "agent output capture ended early");
        }
    };

    let capture_stderr = async {
        let Some(mut stderr) = stderr else {
            return Vec::new();
        };
        let mut tail = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            match stderr.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    // Keep draining past the cap so the agent never
                    // blocks on a full pipe.
                    if tail.len() < STDERR_CAP {
                        let take = n.min(STDERR_CAP - tail.len());
                        tail.extend_from_slice(&chunk[..take]);
                    }
                }
            }
        }
        tail
    };

    let ((), (), tail) = tokio::join!(feed_events, capture_stdout, capture_stderr);
    tail
}

/// Turns the agent's exit into a terminal report file.
async fn finalize(status: ExitStatus, stderr_tail: &[u8], paths: &JobPaths, session: &str) {
    if !status.success() {
        let detail = String::from_utf8_lossy(stderr_tail);
        tracing::error!(session, code = status.code(), "analysis agent failed");
        write_failure_report(&paths.report, detail.trim()).await;
        return;
    }

    // The agent is instructed to write the report itself; prefer that.
    if let Ok(direct) = tokio::fs::read_to_string(&paths.report).await {
        if direct.trim().len() > MIN_DIRECT_REPORT_LEN {
            tracing::info!(session, "insight generated (agent wrote report directly)");
            return;
        }
    }

    match tokio::fs::read_to_string(&paths.live_log).await {
        Ok(raw) => {
            let cleaned = report::clean_report(&raw);
            if let Err(e) = tokio::fs::write(&paths.report, cleaned).await {
                tracing::error!(session, error = %e, "failed to write insight report");
            } else {
                tracing::info!(session, "insight generated (cleaned from captured output)");
            }
        }
        Err(e) => {
            tracing::error!(session, error = %e, "agent exited cleanly but produced no output");
            write_failure_report(
                &paths.report,
                "agent exited successfully but produced no output",
            )
            .await;
        }
    }
}

/// Writes a visible failure report into the slot a successful report
/// would occupy, so polling reaches a terminal state either way.
async fn write_failure_report(report_path: &Path, detail: &str) {
    let body = format!("{FAILURE_HEADER}\n\n```\n{detail}\n```\n");
    if let Err(e) = tokio::fs::write(report_path, body).await {
        tracing::error!(path = ?report_path, error = %e, "failed to write failure report");
    }
}

/// Releases the lock and removes scratch state. Every generation exit
/// path ends here.
async fn cleanup(paths: &JobPaths, scratch: &Path) {
    let _ = tokio::fs::remove_file(&paths.live_log).await;
    let _ = tokio::fs::remove_file(&paths.lock).await;
    let _ = tokio::fs::remove_dir_all(scratch).await;
    let _ = tokio::fs::remove_dir_all(paths.session_dir.join(OUTPUT_SCRATCH_DIR)).await;
}

/// Prompt handed to the analysis agent.
fn build_prompt(session_dir: &Path, report_path: &Path) -> String {
    let work_dir = session_dir.join(OUTPUT_SCRATCH_DIR);
    format!(
        "You are an expert AI-agent evaluator. The current working directory is an \
agent session folder containing the raw data of one coding-agent run.\n\
\n\
Read `events.jsonl` (JSONL, one event per line; also streamed to your stdin) plus \
any other session files, and evaluate the run. Use `{work_dir}` as scratch space \
for intermediate notes.\n\
\n\
Write the final report to `{report_path}` as markdown with these sections:\n\
\n\
## 🎯 Effectiveness Score: X/100\n\
One-line verdict on how well the agent fulfilled the user's intent.\n\
\n\
## 🔧 Tool Usage Analysis\n\
Tool selection quality, redundant or wasted calls, error recovery.\n\
\n\
## 🔄 Workflow & Strategy\n\
Planning quality, sequencing, backtracking, sub-agent decomposition.\n\
\n\
## ⚡ Performance\n\
Where wall-clock time went, bottlenecks, missed parallelism.\n\
\n\
## 💡 Top 3 Improvements\n\
Specific, actionable recommendations tied to evidence from the session.\n\
\n\
Be precise and concise; every sentence must carry data or actionable \
insight. Keep the entire report under 3000 characters. When done, remove \
`{work_dir}`.",
        work_dir = work_dir.display(),
        report_path = report_path.display(),
    )
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    const POLL_INTERVAL: Duration = Duration::from_millis(25);
    const POLL_ATTEMPTS: u32 = 400;

    fn id(s: &str) -> SessionId {
        SessionId::new(s).unwrap()
    }

    /// Creates a session directory with a one-line event log.
    fn make_session(root: &Path, name: &str) -> PathBuf {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(EVENTS_FILE),
            "{\"type\":\"session.start\",\"timestamp\":\"2026-01-29T10:00:00Z\"}\n",
        )
        .unwrap();
        dir
    }

    /// Writes an executable shell script standing in for the agent CLI.
    fn fake_agent(root: &Path, body: &str) -> String {
        let path = root.join("fake-agent.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn manager(root: &Path, agent: &str) -> InsightManager {
        InsightManager::new(root, agent, Arc::new(ProcessRegistry::new()))
    }

    async fn wait_until_terminal(manager: &InsightManager, id: &SessionId) -> InsightSnapshot {
        for _ in 0..POLL_ATTEMPTS {
            let snapshot = manager.status(id).await.unwrap();
            if snapshot.state.is_terminal() {
                return snapshot;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        panic!("generation did not reach a terminal state");
    }

    #[tokio::test]
    async fn test_status_not_started() {
        let temp = TempDir::new().unwrap();
        make_session(temp.path(), "s");
        let manager = manager(temp.path(), "true");

        let snapshot = manager.status(&id("s")).await.unwrap();
        assert_eq!(snapshot.state, InsightState::NotStarted);
        assert!(snapshot.report.is_none());
    }

    #[tokio::test]
    async fn test_existing_report_returned_without_spawn() {
        let temp = TempDir::new().unwrap();
        let dir = make_session(temp.path(), "s");
        std::fs::write(dir.join(REPORT_FILE), "## Existing report\nfine\n").unwrap();

        let manager = manager(temp.path(), "false");
        let snapshot = manager.generate(&id("s"), false).await.unwrap();

        assert_eq!(snapshot.state, InsightState::Completed);
        assert!(snapshot.report.unwrap().contains("Existing report"));
        assert_eq!(manager.registry().count().await, 0);
        // No lock was taken for the idempotent read.
        assert!(!dir.join(LOCK_FILE).exists());
    }

    #[tokio::test]
    async fn test_generation_completes_and_cleans_output() {
        let temp = TempDir::new().unwrap();
        let dir = make_session(temp.path(), "s");
        let agent = fake_agent(
            temp.path(),
            "cat > /dev/null\nprintf '## 🎯 Effectiveness Score: 90/100\\nSolid run.\\n'",
        );
        let manager = manager(temp.path(), &agent);

        let snapshot = manager.generate(&id("s"), false).await.unwrap();
        assert_eq!(snapshot.state, InsightState::Generating);

        let terminal = wait_until_terminal(&manager, &id("s")).await;
        assert_eq!(terminal.state, InsightState::Completed);
        let report = terminal.report.unwrap();
        assert!(report.starts_with("## 🎯 Effectiveness Score: 90/100"));
        assert!(report.contains("Solid run."));

        assert!(!dir.join(LOCK_FILE).exists());
        assert!(!dir.join(LIVE_LOG_FILE).exists());
    }

    #[tokio::test]
    async fn test_single_flight_concurrent_requests() {
        let temp = TempDir::new().unwrap();
        make_session(temp.path(), "s");
        let agent = fake_agent(temp.path(), "cat > /dev/null\nsleep 5\necho done");
        let manager = manager(temp.path(), &agent);

        let first = manager.generate(&id("s"), false).await.unwrap();
        assert_eq!(first.state, InsightState::Generating);

        let second = manager.generate(&id("s"), false).await.unwrap();
        assert_eq!(second.state, InsightState::Generating);

        // Exactly one agent process was spawned.
        assert_eq!(manager.registry().count().await, 1);
        manager.registry().kill_all().await;
    }

    #[tokio::test]
    async fn test_stale_lock_is_reclaimed() {
        let temp = TempDir::new().unwrap();
        let dir = make_session(temp.path(), "s");
        std::fs::write(dir.join(LOCK_FILE), "{}").unwrap();

        let agent = fake_agent(
            temp.path(),
            "cat > /dev/null\nprintf '## 🎯 Effectiveness Score: 70/100\\nok\\n'",
        );
        let manager =
            manager(temp.path(), &agent).with_timeout(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The abandoned lock is older than the timeout: reclaim and spawn.
        let snapshot = manager.generate(&id("s"), false).await.unwrap();
        assert_eq!(snapshot.state, InsightState::Generating);

        for _ in 0..POLL_ATTEMPTS {
            if dir.join(REPORT_FILE).exists() && !dir.join(LOCK_FILE).exists() {
                return;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        panic!("reclaimed generation never completed");
    }

    #[tokio::test]
    async fn test_fresh_lock_is_not_reclaimed() {
        let temp = TempDir::new().unwrap();
        let dir = make_session(temp.path(), "s");
        std::fs::write(dir.join(LOCK_FILE), "{}").unwrap();

        let manager = manager(temp.path(), "true");
        let snapshot = manager.generate(&id("s"), false).await.unwrap();

        assert_eq!(snapshot.state, InsightState::Generating);
        assert!(snapshot.age_ms.is_some());
        assert_eq!(manager.registry().count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_events_releases_lock() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("s");
        std::fs::create_dir_all(&dir).unwrap();

        let manager = manager(temp.path(), "true");
        let err = manager.generate(&id("s"), false).await.unwrap_err();

        assert!(matches!(err, InsightError::EventsNotFound(_)));
        assert!(!dir.join(LOCK_FILE).exists());
    }

    #[tokio::test]
    async fn test_failed_agent_writes_failure_report() {
        let temp = TempDir::new().unwrap();
        make_session(temp.path(), "s");
        let agent = fake_agent(temp.path(), "cat > /dev/null\necho boom >&2\nexit 3");
        let manager = manager(temp.path(), &agent);

        manager.generate(&id("s"), false).await.unwrap();
        let terminal = wait_until_terminal(&manager, &id("s")).await;

        assert_eq!(terminal.state, InsightState::Failed);
        assert!(terminal.report.unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_force_discards_existing_report() {
        let temp = TempDir::new().unwrap();
        let dir = make_session(temp.path(), "s");
        std::fs::write(dir.join(REPORT_FILE), "## Old report\nstale content\n").unwrap();

        let agent = fake_agent(
            temp.path(),
            "cat > /dev/null\nprintf '## 🎯 Effectiveness Score: 55/100\\nfresh\\n'",
        );
        let manager = manager(temp.path(), &agent);

        let snapshot = manager.generate(&id("s"), true).await.unwrap();
        assert_eq!(snapshot.state, InsightState::Generating);

        let terminal = wait_until_terminal(&manager, &id("s")).await;
        let report = terminal.report.unwrap();
        assert!(report.contains("fresh"));
        assert!(!report.contains("stale content"));
    }

    #[tokio::test]
    async fn test_timeout_state_for_expired_lock() {
        let temp = TempDir::new().unwrap();
        let dir = make_session(temp.path(), "s");
        std::fs::write(dir.join(LOCK_FILE), "{}").unwrap();

        let manager = manager(temp.path(), "true").with_timeout(Duration::ZERO);
        let snapshot = manager.status(&id("s")).await.unwrap();
        assert_eq!(snapshot.state, InsightState::Timeout);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let dir = make_session(temp.path(), "s");
        std::fs::write(dir.join(REPORT_FILE), "## Report").unwrap();

        let manager = manager(temp.path(), "true");

        let outcome = manager.delete(&id("s")).await.unwrap();
        assert!(outcome.success);
        assert!(outcome.message.is_none());
        assert!(!dir.join(REPORT_FILE).exists());

        let outcome = manager.delete(&id("s")).await.unwrap();
        assert!(outcome.success);
        assert!(outcome.message.is_some());
    }

    #[tokio::test]
    async fn test_agent_written_report_preferred_over_stdout() {
        let temp = TempDir::new().unwrap();
        let dir = make_session(temp.path(), "s");
        let report_path = dir.join(REPORT_FILE);
        let agent = fake_agent(
            temp.path(),
            &format!(
                "cat > /dev/null\nprintf '## Direct report\\nwritten by the agent itself, long enough to count.\\n' > {}\necho 'stdout noise'",
                report_path.display()
            ),
        );
        let manager = manager(temp.path(), &agent);

        manager.generate(&id("s"), false).await.unwrap();
        let terminal = wait_until_terminal(&manager, &id("s")).await;

        assert_eq!(terminal.state, InsightState::Completed);
        let report = terminal.report.unwrap();
        assert!(report.contains("Direct report"));
        assert!(!report.contains("stdout noise"));
    }
}
