//! Error types for finchcred
//!
//! All modules use `FinchResult<T>` as their return type. Anything that
//! crosses the credential socket is first collapsed to an [`ErrorKind`].

use crate::peer::GuardRejection;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for finchcred operations
pub type FinchResult<T> = Result<T, FinchError>;

/// Externally observable error classes.
///
/// This is the only information about a failure that may leave the daemon
/// over the credential socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    Malformed,
    Internal,
}

/// All errors that can occur in finchcred
#[derive(Error, Debug)]
pub enum FinchError {
    // Credential errors
    #[error("No credentials stored for build {build_ref}")]
    BuildNotFound { build_ref: String },

    #[error("No credential for {address} in build {build_ref}")]
    CredentialNotFound { build_ref: String, address: String },

    #[error("Peer rejected: {0}")]
    PeerRejected(GuardRejection),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Secure random source unavailable: {0}")]
    Entropy(String),

    #[error("Invalid registry config: {0}")]
    RegistryConfig(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Transport errors
    #[error("Credential socket error: {0}")]
    Http(String),

    #[error("Timed out after {secs}s: {context}")]
    Timeout { context: String, secs: u64 },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Build engine exited with code {code}")]
    BuildFailed { code: i32 },

    #[error("Process terminated by signal")]
    ProcessSignaled,

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("{0}")]
    User(String),
}

impl FinchError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Collapse into the externally observable class
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BuildNotFound { .. } | Self::CredentialNotFound { .. } => ErrorKind::NotFound,
            Self::PeerRejected(_) => ErrorKind::Unauthorized,
            Self::MalformedRequest(_) | Self::RegistryConfig(_) | Self::Json(_) => {
                ErrorKind::Malformed
            }
            _ => ErrorKind::Internal,
        }
    }

    /// Check if the error is a not-found outcome
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::RegistryConfig(_) => {
                Some("Expected base64-encoded JSON: {\"<registry>\": {\"username\": ..., \"password\": ...}}")
            }
            Self::ConfigInvalid { .. } => Some("Run: finchcred config init --force"),
            Self::Io { .. } => Some("Check permissions on the credential socket directory"),
            _ => None,
        }
    }
}
