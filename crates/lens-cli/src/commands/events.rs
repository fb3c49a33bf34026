//! Events command for printing a session's ordered event log.

use std::io::Write;

use anyhow::{Result, bail};
use lens_core::{SessionId, SessionRepository, session_detail};

pub fn run<W: Write>(
    writer: &mut W,
    repository: &SessionRepository,
    id: &SessionId,
    json: bool,
) -> Result<()> {
    let Some(detail) = session_detail(repository, id)? else {
        bail!("session not found: {id}");
    };

    if json {
        serde_json::to_writer_pretty(&mut *writer, &detail)?;
        writeln!(writer)?;
        return Ok(());
    }

    writeln!(writer, "{}: {}", detail.session.id, detail.metadata.summary)?;
    writeln!(writer, "{} event(s)", detail.events.len())?;
    writeln!(writer)?;

    for event in &detail.events {
        let timestamp = event.timestamp.as_deref().unwrap_or("-");
        let event_type = event.event_type.as_deref().unwrap_or("(untyped)");
        match event_preview(event) {
            Some(preview) => {
                writeln!(writer, "{timestamp:<24}  {event_type:<24}  {preview}")?;
            }
            None => writeln!(writer, "{timestamp:<24}  {event_type}")?,
        }
    }
    Ok(())
}

/// Short single-line payload preview for the text listing.
fn event_preview(event: &lens_core::SessionEvent) -> Option<String> {
    let data = event.data.as_ref()?;
    let text = data
        .get("content")
        .or_else(|| data.get("message"))
        .or_else(|| data.get("text"))?
        .as_str()?;

    let one_line = text.replace('\n', " ");
    Some(if one_line.chars().count() > 60 {
        format!("{}...", one_line.chars().take(57).collect::<String>())
    } else {
        one_line
    })
}
