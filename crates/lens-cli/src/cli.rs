//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lens_core::SessionId;

/// Local viewer for AI coding-agent sessions.
///
/// Reads session folders and legacy event logs straight from disk and can
/// generate insight reports by running an analysis agent over a session.
#[derive(Debug, Parser)]
#[command(name = "lens", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List discovered sessions, newest first.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,

        /// Skip this many sessions.
        #[arg(long)]
        offset: Option<usize>,

        /// Return at most this many sessions.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show one session's summary fields.
    Show {
        /// The session ID.
        id: SessionId,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print a session's events in chronological order.
    Events {
        /// The session ID.
        id: SessionId,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage insight reports.
    Insight {
        #[command(subcommand)]
        action: InsightAction,
    },
}

/// Insight report operations.
#[derive(Debug, Subcommand)]
pub enum InsightAction {
    /// Generate an insight report, waiting for the agent to finish.
    Generate {
        /// The session ID.
        id: SessionId,

        /// Discard an existing report and regenerate.
        #[arg(long)]
        force: bool,
    },

    /// Show the current insight state for a session.
    Status {
        /// The session ID.
        id: SessionId,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete a session's insight report.
    Delete {
        /// The session ID.
        id: SessionId,
    },
}
