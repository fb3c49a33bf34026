//! Tracking of spawned agent processes for shutdown cleanup.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::process::Child;
use tokio::sync::Mutex;

/// Registry of live agent processes.
///
/// Created once at startup and shared via `Arc`; explicitly-scoped global
/// state rather than an implicit singleton. Generation tasks register
/// their child on spawn and remove it before reaping; `kill_all` sweeps
/// whatever is still running at shutdown.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    children: Mutex<HashMap<u64, Entry>>,
    next_token: AtomicU64,
}

#[derive(Debug)]
struct Entry {
    name: String,
    child: Child,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a child process and returns a token for later removal.
    pub async fn register(&self, name: impl Into<String>, child: Child) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let name = name.into();
        tracing::debug!(token, name = %name, "registered agent process");
        self.children
            .lock()
            .await
            .insert(token, Entry { name, child });
        token
    }

    /// Removes a child from tracking, returning it so the caller can
    /// reap it. `None` when the registry already swept it.
    pub async fn remove(&self, token: u64) -> Option<Child> {
        self.children
            .lock()
            .await
            .remove(&token)
            .map(|entry| entry.child)
    }

    /// Kills every tracked process. Best-effort; failures are logged.
    pub async fn kill_all(&self) {
        let mut children = self.children.lock().await;
        let count = children.len();
        if count > 0 {
            tracing::info!(count, "killing active agent processes");
        }
        for (_, mut entry) in children.drain() {
            if let Err(e) = entry.child.start_kill() {
                tracing::warn!(name = %entry.name, error = %e, "failed to kill agent process");
            }
        }
    }

    /// Number of currently tracked processes.
    pub async fn count(&self) -> usize {
        self.children.lock().await.len()
    }
}
