//! Persist - store-backed artifact cache for CI jobs
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use persist::cli::{Cli, Commands};
use persist::config::inputs::names;
use persist::config::{Config, ConfigManager, LogFormat};
use persist::error::PersistResult;
use persist::host::{ActionsHost, Host};
use persist::phase::Phase;
use persist::state::{keys, truthy};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

/// Verbosity requested by the action inputs or by an earlier phase
fn host_verbosity(host: &dyn Host) -> u8 {
    let flag = |input: &str, key: &str| {
        truthy(host.input(input).as_deref()) || truthy(host.state(key).as_deref())
    };
    if flag(names::TRACE, keys::TRACE) {
        2
    } else if flag(names::VERBOSE, keys::VERBOSE) {
        1
    } else {
        0
    }
}

async fn run() -> PersistResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = match config_manager.load().await {
        Ok(config) => config,
        // post must never fail the job
        Err(e) if matches!(cli.command, Commands::Post) => {
            eprintln!("{} {}", style("Warning:").yellow(), e);
            Config::default()
        }
        Err(e) => return Err(e),
    };

    // Initialize logging: 0 = info, 1 = debug, 2+ = trace
    let level = match cli.command {
        Commands::Report(_) => cli.verbose,
        _ => cli.verbose.max(host_verbosity(&ActionsHost::new())),
    };
    let filter = match level {
        0 => EnvFilter::new("persist=info"),
        1 => EnvFilter::new("persist=debug"),
        _ => EnvFilter::new("persist=trace"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time();
    match config.log.format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }

    // Dispatch to command
    match cli.command {
        Commands::Pre => persist::cli::commands::phase(Phase::Pre, &config).await,
        Commands::Main => persist::cli::commands::phase(Phase::Main, &config).await,
        Commands::Post => persist::cli::commands::phase(Phase::Post, &config).await,
        Commands::Report(args) => persist::cli::commands::report(args, cli.verbose > 0).await,
    }
}
