//! Workspace descriptor parsing.
//!
//! Directory sessions carry a `workspace.yaml` descriptor, but only a flat
//! `key: value` subset of YAML is ever written. The parser is therefore a
//! single-level line matcher, not a YAML implementation: values are plain
//! strings and callers interpret them by key.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Descriptor file name required for a directory session to be valid.
pub const DESCRIPTOR_FILE: &str = "workspace.yaml";

/// Matches `identifier: rest-of-line`.
static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\w+):\s*(.+)$").expect("descriptor line regex is valid")
});

/// Parses a workspace descriptor into a flat string map.
///
/// Lines that do not match the grammar are ignored; a missing or
/// unreadable file yields an empty map rather than an error.
pub fn parse_descriptor(path: &Path) -> BTreeMap<String, String> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!(path = ?path, error = %e, "descriptor unreadable, treating as empty");
            return BTreeMap::new();
        }
    };

    let mut fields = BTreeMap::new();
    for line in content.lines() {
        if let Some(caps) = LINE_RE.captures(line) {
            fields.insert(caps[1].to_string(), caps[2].trim().to_string());
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parses_key_value_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "repository: github.com/acme/widgets").unwrap();
        writeln!(file, "branch: main").unwrap();
        writeln!(file, "summary: Fix the flaky test   ").unwrap();

        let fields = parse_descriptor(file.path());
        assert_eq!(
            fields.get("repository").map(String::as_str),
            Some("github.com/acme/widgets")
        );
        assert_eq!(fields.get("branch").map(String::as_str), Some("main"));
        assert_eq!(
            fields.get("summary").map(String::as_str),
            Some("Fix the flaky test")
        );
    }

    #[test]
    fn test_ignores_non_matching_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# a comment").unwrap();
        writeln!(file, "nested:").unwrap();
        writeln!(file, "  indented: value").unwrap();
        writeln!(file, "key with space: value").unwrap();
        writeln!(file, "cwd: /home/user/project").unwrap();

        let fields = parse_descriptor(file.path());
        assert_eq!(fields.len(), 1);
        assert_eq!(
            fields.get("cwd").map(String::as_str),
            Some("/home/user/project")
        );
    }

    #[test]
    fn test_values_stay_strings() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "created_at: 2026-01-01T00:00:00Z").unwrap();
        writeln!(file, "count: 42").unwrap();

        let fields = parse_descriptor(file.path());
        assert_eq!(
            fields.get("created_at").map(String::as_str),
            Some("2026-01-01T00:00:00Z")
        );
        assert_eq!(fields.get("count").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_value_keeps_everything_after_first_colon() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "repository: https://github.com/acme/widgets").unwrap();

        let fields = parse_descriptor(file.path());
        assert_eq!(
            fields.get("repository").map(String::as_str),
            Some("https://github.com/acme/widgets")
        );
    }

    #[test]
    fn test_missing_file_yields_empty_map() {
        let fields = parse_descriptor(Path::new("/nonexistent/workspace.yaml"));
        assert!(fields.is_empty());
    }
}
