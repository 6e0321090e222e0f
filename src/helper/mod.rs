//! Docker credential-helper protocol
//!
//! The build engine runs `docker-credential-finch <action>`, writes the
//! action's input on stdin and reads the result from stdout. Failures are
//! reported as a bare message on stdout with a non-zero exit status.

mod client;
mod finch;

pub use client::CredentialClient;
pub use finch::{FinchHelper, HelperEnv};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::process::ExitCode;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Message the credential-helper contract uses to signal a missing entry
pub const NOT_FOUND_MESSAGE: &str = "credentials not found in native keychain";

/// Credential payload exchanged with the build engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "ServerURL")]
    pub server_url: String,

    #[serde(rename = "Username")]
    pub username: String,

    #[serde(rename = "Secret")]
    pub secret: String,
}

/// Failures reported back to the build engine
#[derive(Error, Debug, PartialEq, Eq)]
pub enum HelperError {
    #[error("{}", NOT_FOUND_MESSAGE)]
    NotFound,

    #[error("not implemented")]
    NotImplemented,

    #[error("no credentials server URL")]
    MissingServerUrl,

    #[error("{0}")]
    Protocol(String),
}

/// A credential store reachable through the helper protocol
#[async_trait]
pub trait CredentialHelper: Send + Sync {
    /// Store credentials for a server
    async fn add(&self, credentials: &Credentials) -> Result<(), HelperError>;

    /// Remove the credentials for a server
    async fn delete(&self, server_url: &str) -> Result<(), HelperError>;

    /// Return the username and secret for a server
    async fn get(&self, server_url: &str) -> Result<(String, String), HelperError>;

    /// Map every known server URL to its username
    async fn list(&self) -> Result<HashMap<String, String>, HelperError>;
}

/// Run one protocol action, reporting failures on `output`
pub async fn serve<H, R, W>(helper: &H, action: &str, input: R, output: &mut W) -> ExitCode
where
    H: CredentialHelper + ?Sized,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match execute(helper, action, input, output).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let _ = output.write_all(format!("{}\n", e).as_bytes()).await;
            let _ = output.flush().await;
            ExitCode::FAILURE
        }
    }
}

/// Dispatch a protocol action
pub async fn execute<H, R, W>(
    helper: &H,
    action: &str,
    mut input: R,
    output: &mut W,
) -> Result<(), HelperError>
where
    H: CredentialHelper + ?Sized,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match action {
        "get" => {
            let server_url = read_server_url(&mut input).await?;
            let (username, secret) = helper.get(&server_url).await?;
            write_json(
                output,
                &Credentials {
                    server_url,
                    username,
                    secret,
                },
            )
            .await
        }
        "store" => {
            let raw = read_all(&mut input).await?;
            let credentials: Credentials = serde_json::from_str(&raw)
                .map_err(|e| HelperError::Protocol(e.to_string()))?;
            if credentials.server_url.is_empty() {
                return Err(HelperError::MissingServerUrl);
            }
            helper.add(&credentials).await
        }
        "erase" => {
            let server_url = read_server_url(&mut input).await?;
            helper.delete(&server_url).await
        }
        "list" => {
            let entries = helper.list().await?;
            write_json(output, &entries).await
        }
        "version" => {
            let line = format!(
                "docker-credential-finch {}\n",
                env!("CARGO_PKG_VERSION")
            );
            write_raw(output, line.as_bytes()).await
        }
        other => Err(HelperError::Protocol(format!(
            "unknown credential action `{}`",
            other
        ))),
    }
}

async fn read_all<R: AsyncRead + Unpin>(input: &mut R) -> Result<String, HelperError> {
    let mut raw = String::new();
    input
        .read_to_string(&mut raw)
        .await
        .map_err(|e| HelperError::Protocol(format!("reading input: {}", e)))?;
    Ok(raw)
}

async fn read_server_url<R: AsyncRead + Unpin>(input: &mut R) -> Result<String, HelperError> {
    let raw = read_all(input).await?;
    let server_url = raw.trim();
    if server_url.is_empty() {
        return Err(HelperError::MissingServerUrl);
    }
    Ok(server_url.to_string())
}

async fn write_json<W, T>(output: &mut W, value: &T) -> Result<(), HelperError>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let mut body = serde_json::to_vec(value).map_err(|e| HelperError::Protocol(e.to_string()))?;
    body.push(b'\n');
    write_raw(output, &body).await
}

async fn write_raw<W: AsyncWrite + Unpin>(output: &mut W, bytes: &[u8]) -> Result<(), HelperError> {
    output
        .write_all(bytes)
        .await
        .map_err(|e| HelperError::Protocol(format!("writing output: {}", e)))?;
    output
        .flush()
        .await
        .map_err(|e| HelperError::Protocol(format!("writing output: {}", e)))
}
