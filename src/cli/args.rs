//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Persist - store-backed artifact cache for CI jobs
///
/// Saves workspace paths into a mounted store and restores them in later
/// runs. The action runs `pre`, `main` and `post` as its three phases.
#[derive(Parser, Debug)]
#[command(name = "persist")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Defaults file path
    #[arg(short, long, global = true, env = "PERSIST_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the store and record flags (pre phase)
    Pre,

    /// Save, restore, or schedule cleanup (main phase)
    Main,

    /// Report on and remove the run-scoped directory (post phase)
    Post,

    /// Summarize a store directory
    Report(ReportArgs),
}

/// Arguments for the report command
#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Directory to summarize
    pub path: PathBuf,

    /// Walk deeper and list more entries
    #[arg(long)]
    pub trace: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Output format for the report command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Table,
    /// JSON output
    Json,
    /// Sample lines only
    Plain,
}
