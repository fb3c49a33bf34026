//! Show command for one session's summary fields.

use std::io::Write;

use anyhow::{Result, bail};
use lens_core::{Session, SessionId, SessionRepository};

use super::format_duration;

pub fn run<W: Write>(
    writer: &mut W,
    repository: &SessionRepository,
    id: &SessionId,
    json: bool,
) -> Result<()> {
    let Some(session) = repository.find_by_id(id)? else {
        bail!("session not found: {id}");
    };

    if json {
        serde_json::to_writer_pretty(&mut *writer, &session)?;
        writeln!(writer)?;
        return Ok(());
    }

    write_details(writer, &session)
}

fn write_details<W: Write>(writer: &mut W, session: &Session) -> Result<()> {
    writeln!(writer, "Session:  {}", session.id)?;
    writeln!(writer, "Type:     {}", session.kind)?;
    writeln!(writer, "Summary:  {}", session.summary)?;
    writeln!(
        writer,
        "Created:  {}",
        session.created_at.format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(
        writer,
        "Updated:  {}",
        session.updated_at.format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(writer, "Events:   {}", session.event_count)?;

    let duration = session
        .duration_ms
        .map_or_else(|| "-".to_string(), format_duration);
    writeln!(writer, "Duration: {duration}")?;

    if let Some(model) = &session.selected_model {
        writeln!(writer, "Model:    {model}")?;
    }
    if let Some(version) = &session.copilot_version {
        writeln!(writer, "Version:  {version}")?;
    }
    if session.is_imported {
        writeln!(writer, "Imported: yes")?;
    }
    if session.has_insight {
        writeln!(writer, "Insight:  yes")?;
    }

    if !session.workspace.is_empty() {
        writeln!(writer, "Workspace:")?;
        for (key, value) in &session.workspace {
            writeln!(writer, "  {key}: {value}")?;
        }
    }
    Ok(())
}
