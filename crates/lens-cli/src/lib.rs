//! Session viewer CLI library.
//!
//! This crate provides the CLI interface for browsing agent sessions and
//! managing insight reports.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, InsightAction};
pub use config::Config;
