//! Read-only helper backed by the daemon's credential socket

use super::{CredentialClient, CredentialHelper, Credentials, HelperError};
use crate::config::schema::{HelperConfig, DEFAULT_CREDENTIAL_SOCKET};
use crate::protocol::{BUILD_ID_ENV, CREDENTIAL_SOCKET_ENV};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// What the build engine told the helper through its environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperEnv {
    pub build_id: Option<String>,
    pub socket_path: PathBuf,
}

impl HelperEnv {
    /// Read `FINCH_BUILD_ID` and `FINCH_CREDENTIAL_SOCKET`; empty values count as unset
    pub fn from_env() -> Self {
        let build_id = std::env::var(BUILD_ID_ENV)
            .ok()
            .filter(|v| !v.is_empty());
        let socket_path = std::env::var_os(CREDENTIAL_SOCKET_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIAL_SOCKET));

        Self {
            build_id,
            socket_path,
        }
    }
}

/// Answers `get` from the daemon; all writes are refused
pub struct FinchHelper {
    env: HelperEnv,
    timeout: Duration,
}

impl FinchHelper {
    pub fn new(env: HelperEnv, config: &HelperConfig) -> Self {
        Self {
            env,
            timeout: Duration::from_secs(config.dial_timeout_secs),
        }
    }
}

#[async_trait]
impl CredentialHelper for FinchHelper {
    async fn add(&self, _credentials: &Credentials) -> Result<(), HelperError> {
        Err(HelperError::NotImplemented)
    }

    async fn delete(&self, _server_url: &str) -> Result<(), HelperError> {
        Err(HelperError::NotImplemented)
    }

    async fn get(&self, server_url: &str) -> Result<(String, String), HelperError> {
        let Some(build_id) = self.env.build_id.as_deref() else {
            debug!("{} not set, no credentials configured", BUILD_ID_ENV);
            return Err(HelperError::NotFound);
        };

        let client = CredentialClient::new(&self.env.socket_path, self.timeout);
        match client.fetch(build_id, server_url).await {
            Ok(record) => Ok((record.username, record.password)),
            Err(e) => {
                debug!("Credential lookup for {} failed: {}", server_url, e);
                Err(HelperError::NotFound)
            }
        }
    }

    async fn list(&self) -> Result<HashMap<String, String>, HelperError> {
        Err(HelperError::NotImplemented)
    }
}
