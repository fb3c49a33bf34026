//! Streaming file helpers shared by the ingestion path.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{DateTime, Utc};

/// Buffer size for `BufReader` (64KB for optimal performance on large files)
pub(crate) const BUFFER_SIZE: usize = 64 * 1024;

/// Returns true for directory entries the scanner should ignore
/// (dotfiles and OS artifacts such as `.DS_Store`).
pub fn should_skip_entry(name: &str) -> bool {
    name.starts_with('.')
}

/// Counts non-blank lines without loading the file into memory.
///
/// Missing or unreadable files count as zero; a read error mid-file keeps
/// the lines counted so far.
pub fn count_lines(path: &Path) -> usize {
    let Ok(file) = File::open(path) else {
        return 0;
    };
    let reader = BufReader::with_capacity(BUFFER_SIZE, file);

    let mut count = 0;
    for line in reader.lines() {
        match line {
            Ok(line) if !line.trim().is_empty() => count += 1,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "line count aborted mid-file");
                break;
            }
        }
    }
    count
}

/// Extracts (created, modified) timestamps from filesystem metadata.
///
/// Birth time is unavailable on some filesystems; modified time is the
/// fallback there, and "now" is the last resort so callers always get a
/// sortable value.
pub fn entry_times(metadata: &std::fs::Metadata) -> (DateTime<Utc>, DateTime<Utc>) {
    let modified = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    let created = metadata
        .created()
        .map(DateTime::<Utc>::from)
        .unwrap_or(modified);
    (created, modified)
}
