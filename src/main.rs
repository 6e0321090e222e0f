//! finchcred - per-build registry credentials for container builds
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use finchcred::cli::{Cli, Commands};
use finchcred::config::{Config, ConfigManager};
use finchcred::error::{FinchError, FinchResult};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        // the engine already reported its own failure
        Err(FinchError::BuildFailed { code }) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> FinchResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config);

    match cli.command {
        Commands::Build(args) => {
            ConfigManager::ensure_state_dirs().await?;
            finchcred::cli::commands::build(args, &config).await
        }
        Commands::Config(args) => {
            finchcred::cli::commands::config(args, &config, &config_manager).await
        }
    }
}

/// 0 = warn, 1 = info, 2+ = debug
fn init_logging(verbose: u8, config: &Config) {
    let verbose = if config.general.verbose {
        verbose.max(1)
    } else {
        verbose
    };
    let filter = match verbose {
        0 => EnvFilter::new("finchcred=warn"),
        1 => EnvFilter::new("finchcred=info,tower_http=info"),
        _ => EnvFilter::new("finchcred=debug,tower_http=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
