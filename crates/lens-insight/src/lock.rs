//! Exclusive-create lock files for single-flight generation.

use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

/// Age beyond which a lock is considered abandoned.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Metadata written into the lock file when generation starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockInfo {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub pid: u32,
}

/// Attempts to create the lock file.
///
/// The create call itself is the exclusivity check (`O_EXCL` semantics);
/// there is deliberately no existence probe beforehand, which would
/// reintroduce the race the lock exists to prevent. Returns `false` when
/// the lock is already held.
pub async fn try_acquire(path: &Path, session_id: &str) -> io::Result<bool> {
    let info = LockInfo {
        session_id: session_id.to_string(),
        start_time: Utc::now(),
        pid: std::process::id(),
    };
    let payload = serde_json::to_vec(&info).map_err(io::Error::other)?;

    match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(mut file) => {
            file.write_all(&payload).await?;
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}

/// Age of an existing lock file, from its modification time.
pub async fn age(path: &Path) -> io::Result<Duration> {
    let metadata = tokio::fs::metadata(path).await?;
    let modified = metadata.modified()?;
    Ok(SystemTime::now()
        .duration_since(modified)
        .unwrap_or_default())
}

/// Modification time of the lock as a wall-clock timestamp.
pub async fn started_at(path: &Path) -> Option<DateTime<Utc>> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    metadata.modified().ok().map(DateTime::<Utc>::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_acquire_is_exclusive() {
        let temp = TempDir::new().unwrap();
        let lock = temp.path().join("report.md.lock");

        assert!(try_acquire(&lock, "s1").await.unwrap());
        assert!(!try_acquire(&lock, "s1").await.unwrap());

        tokio::fs::remove_file(&lock).await.unwrap();
        assert!(try_acquire(&lock, "s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_lock_contains_metadata() {
        let temp = TempDir::new().unwrap();
        let lock = temp.path().join("report.md.lock");

        try_acquire(&lock, "session-9").await.unwrap();
        let content = tokio::fs::read_to_string(&lock).await.unwrap();
        let info: LockInfo = serde_json::from_str(&content).unwrap();
        assert_eq!(info.session_id, "session-9");
        assert_eq!(info.pid, std::process::id());
    }

    #[tokio::test]
    async fn test_fresh_lock_age_is_small() {
        let temp = TempDir::new().unwrap();
        let lock = temp.path().join("report.md.lock");

        try_acquire(&lock, "s1").await.unwrap();
        let age = age(&lock).await.unwrap();
        assert!(age < Duration::from_secs(60));
        assert!(started_at(&lock).await.is_some());
    }
}
