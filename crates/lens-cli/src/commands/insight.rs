//! Insight subcommands: generate, status, delete.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use lens_core::SessionId;
use lens_insight::{InsightManager, InsightSnapshot, InsightState, ProcessRegistry};

use crate::Config;
use crate::cli::InsightAction;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

pub async fn run<W: Write>(writer: &mut W, config: &Config, action: &InsightAction) -> Result<()> {
    let registry = Arc::new(ProcessRegistry::new());
    let manager = InsightManager::new(
        &config.session_root,
        &config.agent_command,
        Arc::clone(&registry),
    );

    match action {
        InsightAction::Generate { id, force } => {
            generate(writer, &manager, &registry, id, *force).await
        }
        InsightAction::Status { id, json } => status(writer, &manager, id, *json).await,
        InsightAction::Delete { id } => delete(writer, &manager, id).await,
    }
}

/// Kicks off generation and blocks until a terminal state, since exiting
/// early would tear down the runtime and kill the agent mid-run.
async fn generate<W: Write>(
    writer: &mut W,
    manager: &InsightManager,
    registry: &ProcessRegistry,
    id: &SessionId,
    force: bool,
) -> Result<()> {
    let snapshot = manager.generate(id, force).await?;
    if snapshot.state.is_terminal() {
        return write_terminal(writer, &snapshot);
    }

    writeln!(writer, "Generating insight for {id}...")?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                registry.kill_all().await;
                bail!("interrupted, killed the running agent");
            }
            () = tokio::time::sleep(POLL_INTERVAL) => {}
        }

        let snapshot = manager.status(id).await?;
        if snapshot.state.is_terminal() {
            writeln!(writer)?;
            return write_terminal(writer, &snapshot);
        }
    }
}

fn write_terminal<W: Write>(writer: &mut W, snapshot: &InsightSnapshot) -> Result<()> {
    match snapshot.state {
        InsightState::Completed => {
            if let Some(report) = &snapshot.report {
                writeln!(writer, "{report}")?;
            }
            Ok(())
        }
        InsightState::Failed => {
            if let Some(report) = &snapshot.report {
                writeln!(writer, "{report}")?;
            }
            bail!("insight generation failed");
        }
        InsightState::Timeout => bail!("insight generation timed out"),
        state => bail!("unexpected insight state: {state}"),
    }
}

async fn status<W: Write>(
    writer: &mut W,
    manager: &InsightManager,
    id: &SessionId,
    json: bool,
) -> Result<()> {
    let snapshot = manager.status(id).await?;

    if json {
        serde_json::to_writer_pretty(&mut *writer, &snapshot)?;
        writeln!(writer)?;
        return Ok(());
    }

    writeln!(writer, "Status: {}", snapshot.state)?;
    if let Some(started) = snapshot.started_at {
        writeln!(writer, "Started: {}", started.format("%Y-%m-%d %H:%M:%S"))?;
    }
    if let Some(generated) = snapshot.generated_at {
        writeln!(
            writer,
            "Generated: {}",
            generated.format("%Y-%m-%d %H:%M:%S")
        )?;
    }
    if let Some(log) = &snapshot.log {
        writeln!(writer)?;
        writeln!(writer, "--- live agent output ---")?;
        writeln!(writer, "{log}")?;
    }
    Ok(())
}

async fn delete<W: Write>(writer: &mut W, manager: &InsightManager, id: &SessionId) -> Result<()> {
    let outcome = manager.delete(id).await?;
    match &outcome.message {
        Some(message) => writeln!(writer, "{message}")?,
        None => writeln!(writer, "Deleted insight report for {id}")?,
    }
    Ok(())
}
