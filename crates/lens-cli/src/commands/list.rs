//! List command for showing discovered sessions.

use std::io::Write;

use anyhow::Result;
use lens_core::{Session, SessionRepository};

use super::format_duration;

/// Default page size when only an offset is given.
const DEFAULT_LIMIT: usize = 50;

pub fn run<W: Write>(
    writer: &mut W,
    repository: &SessionRepository,
    json: bool,
    offset: Option<usize>,
    limit: Option<usize>,
) -> Result<()> {
    if offset.is_none() && limit.is_none() {
        let sessions = repository.find_all()?;
        if json {
            serde_json::to_writer_pretty(&mut *writer, &sessions)?;
            writeln!(writer)?;
        } else {
            write_table(writer, &sessions)?;
            writeln!(writer)?;
            writeln!(writer, "{} session(s)", sessions.len())?;
        }
        return Ok(());
    }

    let page = repository.find_page(offset.unwrap_or(0), limit.unwrap_or(DEFAULT_LIMIT))?;
    if json {
        serde_json::to_writer_pretty(&mut *writer, &page)?;
        writeln!(writer)?;
    } else {
        write_table(writer, &page.sessions)?;
        writeln!(writer)?;
        writeln!(
            writer,
            "{} of {} session(s), offset {}{}",
            page.sessions.len(),
            page.total,
            page.offset,
            if page.has_more { ", more available" } else { "" }
        )?;
    }
    Ok(())
}

fn write_table<W: Write>(writer: &mut W, sessions: &[Session]) -> Result<()> {
    if sessions.is_empty() {
        writeln!(writer, "No sessions found.")?;
        return Ok(());
    }

    writeln!(
        writer,
        "{:<36}  {:<9}  {:<16}  {:>6}  {:>8}  Summary",
        "ID", "Type", "Updated", "Events", "Duration"
    )?;

    for session in sessions {
        let duration = session
            .duration_ms
            .map_or_else(|| "-".to_string(), format_duration);
        // Truncate by characters, not bytes, to avoid panics on multi-byte UTF-8
        let summary = if session.summary.chars().count() > 48 {
            format!("{}...", session.summary.chars().take(45).collect::<String>())
        } else {
            session.summary.clone()
        };

        writeln!(
            writer,
            "{:<36}  {:<9}  {:<16}  {:>6}  {:>8}  {}",
            session.id.as_str(),
            session.kind,
            session.updated_at.format("%Y-%m-%d %H:%M"),
            session.event_count,
            duration,
            summary
        )?;
    }
    Ok(())
}
