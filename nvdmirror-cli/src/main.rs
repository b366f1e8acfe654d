//! nvdmirror command-line entry point

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use nvdmirror_core::config::{GeneralConfig, NvdMirrorConfig};

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_tracing(&logging_config(&cli).await)?;
    nvdmirror_core::metrics::describe_all();

    tracing::debug!(config = %cli.config.display(), "nvdmirror starting");

    if let Err(e) = run(cli).await {
        eprintln!("{} {e}", "error:".red().bold());
        std::process::exit(e.exit_code());
    }

    Ok(())
}

/// Logging settings: the config file's `[general]` section, `--log-level` on top.
///
/// A missing or invalid config file falls back to defaults so that
/// `config validate` can still report the problem.
async fn logging_config(cli: &Cli) -> GeneralConfig {
    let mut general = NvdMirrorConfig::load(&cli.config)
        .await
        .map(|config| config.general)
        .unwrap_or_default();
    if let Some(level) = &cli.log_level {
        general.log_level = level.clone();
    }
    general
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    let config_path = cli.config.as_path();

    match cli.command {
        Commands::Sync(args) => commands::sync::execute(args, config_path, &writer).await,
        Commands::Import(args) => commands::import::execute(args, config_path, &writer).await,
        Commands::Search(args) => commands::search::execute(args, config_path, &writer).await,
        Commands::Scan(args) => commands::scan::execute(args, config_path, &writer).await,
        Commands::Status(args) => commands::status::execute(args, config_path, &writer).await,
        Commands::Config(args) => commands::config::execute(args, config_path, &writer).await,
    }
}
