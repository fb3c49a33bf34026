use anyhow::{Context, Result};
use clap::Parser;
use lens_core::SessionRepository;
use tracing_subscriber::EnvFilter;

use lens_cli::commands::{events, insight, list, show};
use lens_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let mut stdout = std::io::stdout().lock();

    match &cli.command {
        Some(Commands::List {
            json,
            offset,
            limit,
        }) => {
            let repository = SessionRepository::new(&config.session_root);
            list::run(&mut stdout, &repository, *json, *offset, *limit)?;
        }
        Some(Commands::Show { id, json }) => {
            let repository = SessionRepository::new(&config.session_root);
            show::run(&mut stdout, &repository, id, *json)?;
        }
        Some(Commands::Events { id, json }) => {
            let repository = SessionRepository::new(&config.session_root);
            events::run(&mut stdout, &repository, id, *json)?;
        }
        Some(Commands::Insight { action }) => {
            // Only the insight subcommands run the agent; the rest of the
            // CLI stays synchronous.
            let runtime =
                tokio::runtime::Runtime::new().context("failed to start async runtime")?;
            runtime.block_on(insight::run(&mut stdout, &config, action))?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
