//! Configuration schema for finchcred
//!
//! Configuration is stored at `~/.config/finchcred/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Well-known credential socket path, shared with the helper
pub const DEFAULT_CREDENTIAL_SOCKET: &str = "/var/run/finch-credential.sock";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Credential socket settings
    pub credential: CredentialSocketConfig,

    /// Credential helper settings
    pub helper: HelperConfig,

    /// Build engine settings
    pub build: BuildConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,

    /// Enable audit logging
    pub audit_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
            audit_log: true,
        }
    }
}

/// Credential socket configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSocketConfig {
    /// Path of the dedicated credential socket
    pub socket_path: PathBuf,

    /// Permission bits applied to the socket file
    pub socket_mode: u32,

    /// Seconds a peer may take to send request headers
    pub header_read_timeout_secs: u64,
}

impl Default for CredentialSocketConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_CREDENTIAL_SOCKET),
            socket_mode: 0o600,
            header_read_timeout_secs: 10,
        }
    }
}

/// Credential helper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HelperConfig {
    /// Seconds the helper waits to reach the daemon
    pub dial_timeout_secs: u64,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            dial_timeout_secs: 5,
        }
    }
}

/// Build engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Engine executable
    pub engine: String,

    /// Arguments placed before user-supplied ones
    pub engine_args: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            engine: "nerdctl".to_string(),
            engine_args: vec!["build".to_string()],
        }
    }
}
