//! Best-effort extraction of the report from raw agent output.
//!
//! The agent CLI interleaves tool-call tracing with the actual report on
//! stdout. This module slices the report back out heuristically; it is
//! documented best-effort, not a parser with formal guarantees.

use std::sync::LazyLock;

use regex::Regex;

/// Heading the agent is instructed to start the report with.
pub const REPORT_MARKER: &str = "## 🎯 Effectiveness Score";

static THINKING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<thinking>.*?</thinking>").expect("valid regex"));

static META_COMMENTARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(Let me analyze|I'll analyze|Analyzing|Here's my analysis of|I need the session data).*$")
        .expect("valid regex")
});

static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^## 🎯\s*Effectiveness Score").expect("valid regex"));

static ANY_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,2} ").expect("valid regex"));

static FILE_WRITE_NOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(\+\d+ lines?\)").expect("valid regex"));

static BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Strips agent working logs from raw output and returns the report.
///
/// Strategy, in order: cut everything before the *last* report marker
/// (the agent sometimes emits intermediate attempts); else cut before the
/// first markdown heading; else strip recognized tool-trace line patterns
/// one by one.
pub fn clean_report(raw: &str) -> String {
    let without_thinking = THINKING_RE.replace_all(raw, "");
    let report = META_COMMENTARY_RE.replace_all(&without_thinking, "");

    let sliced = if let Some(last) = MARKER_RE.find_iter(&report).last() {
        report[last.start()..].to_string()
    } else if let Some(heading) = ANY_HEADING_RE.find(&report) {
        report[heading.start()..].to_string()
    } else {
        strip_trace_lines(&report)
    };

    BLANK_RUN_RE.replace_all(&sliced, "\n\n").trim().to_string()
}

/// Last resort: filter known agent-CLI trace patterns line by line.
fn strip_trace_lines(report: &str) -> String {
    let mut cleaned = Vec::new();
    let mut skipping_block = false;

    for line in report.lines() {
        if line.starts_with("● ") {
            skipping_block = true;
            continue;
        }
        if line.starts_with("  $ ") {
            skipping_block = true;
            continue;
        }
        if line.starts_with("  └ ") {
            skipping_block = false;
            continue;
        }
        if FILE_WRITE_NOTE_RE.is_match(line) {
            continue;
        }

        // A non-indented, non-blank line ends a trace block.
        if skipping_block && !line.trim().is_empty() && !line.starts_with("  ") {
            skipping_block = false;
        }
        if skipping_block {
            continue;
        }

        cleaned.push(line);
    }

    cleaned.join("\n")
}
