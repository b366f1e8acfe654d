//! CLI argument parsing using clap derive API
//!
//! Purely declarative, no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// nvdmirror -- local mirror of the NVD CVE feed.
///
/// Use `nvdmirror <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "nvdmirror", version, about, long_about = None)]
pub struct Cli {
    /// Path to the nvdmirror.toml configuration file.
    #[arg(short, long, default_value = "nvdmirror.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch CVEs published since the last run into the year partitions.
    Sync(SyncArgs),

    /// One-time full-history import into the year partitions.
    Import(ImportArgs),

    /// Search partitions for rows whose criteria contains a substring.
    Search(SearchArgs),

    /// Check an installed-package inventory against the mirror.
    Scan(ScanArgs),

    /// Show partitions, resume point and pending work.
    Status(StatusArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- sync ----

/// Incremental synchronization.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Start without asking for confirmation.
    #[arg(short, long)]
    pub yes: bool,

    /// Only compute and print the plan.
    #[arg(long)]
    pub check_only: bool,
}

// ---- import ----

/// Bootstrap import.
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// CSV file with the partition columns covering the full history.
    pub source: PathBuf,
}

// ---- search ----

/// Criteria substring search.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Substring to look for (e.g. `:openssl:`).
    pub criteria: String,

    /// Treat the argument as a package name and search for `:<name>:`.
    #[arg(short, long)]
    pub package: bool,
}

// ---- scan ----

/// Inventory scan.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Inventory JSON (`{"<path>": {"<package>": "<version>"}}`).
    pub inventory: PathBuf,

    /// Minimum severity to evaluate (medium, high).
    #[arg(long, default_value = "medium")]
    pub min_severity: String,

    /// Override the findings audit path from the configuration.
    #[arg(long)]
    pub findings: Option<PathBuf>,

    /// Print every verdict, not only vulnerable ones.
    #[arg(short, long)]
    pub all: bool,
}

// ---- status ----

/// Mirror status.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Show row counts per partition.
    #[arg(short, long)]
    pub verbose: bool,
}

// ---- config ----

/// Manage nvdmirror configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, feed, store, sync).
        #[arg(long)]
        section: Option<String>,
    },
}
