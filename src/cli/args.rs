//! CLI argument definitions using clap derive

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// finchcred - per-build registry credentials for container builds
///
/// Serves registry credentials to a build's credential helper over a
/// dedicated local socket, for exactly as long as the build runs.
#[derive(Parser, Debug)]
#[command(name = "finchcred")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "FINCHCRED_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a build with isolated registry credentials
    Build(BuildArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// JSON file mapping registry addresses to auth configs
    #[arg(long, value_name = "FILE", conflicts_with = "registry_config_header")]
    pub registry_config: Option<PathBuf>,

    /// Base64 X-Registry-Config value
    #[arg(long, value_name = "B64")]
    pub registry_config_header: Option<String>,

    /// Credential socket path (overrides config)
    #[arg(long, value_name = "PATH")]
    pub socket: Option<PathBuf>,

    /// Build engine executable (overrides config)
    #[arg(long, value_name = "BIN")]
    pub engine: Option<String>,

    /// Build context directory
    #[arg(default_value = ".")]
    pub context: PathBuf,

    /// Extra arguments passed to the engine
    #[arg(last = true)]
    pub engine_args: Vec<String>,
}

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., credential.socket_path)
        key: String,
        /// Value to set
        value: String,
    },
}
