//! Client side of the credential socket

use crate::credentials::{BuildId, CredentialRecord};
use crate::error::{FinchError, FinchResult};
use crate::protocol::{CredentialRequest, ErrorMessage, CREDENTIALS_PATH};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{CONTENT_TYPE, HOST};
use hyper::{Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::UnixStream;
use tracing::debug;

/// Fetches credentials from the daemon over its credential socket
#[derive(Debug, Clone)]
pub struct CredentialClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl CredentialClient {
    /// Create a client; `timeout` bounds the dial and the whole round trip
    pub fn new(socket_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout,
        }
    }

    /// Ask the daemon for the credential `build_id` declared for `server_addr`
    pub async fn fetch(&self, build_id: &str, server_addr: &str) -> FinchResult<CredentialRecord> {
        tokio::time::timeout(self.timeout, self.round_trip(build_id, server_addr))
            .await
            .map_err(|_| FinchError::Timeout {
                context: format!("credential request to {}", self.socket_path.display()),
                secs: self.timeout.as_secs(),
            })?
    }

    async fn round_trip(&self, build_id: &str, server_addr: &str) -> FinchResult<CredentialRecord> {
        let stream = UnixStream::connect(&self.socket_path).await.map_err(|e| {
            FinchError::io(format!("connecting to {}", self.socket_path.display()), e)
        })?;

        let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| FinchError::Http(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!("Credential socket connection closed: {}", e);
            }
        });

        let body = serde_json::to_vec(&CredentialRequest {
            build_id: build_id.to_string(),
            server_addr: server_addr.to_string(),
        })?;

        let request = Request::builder()
            .method(Method::GET)
            .uri(CREDENTIALS_PATH)
            .header(HOST, "localhost")
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| FinchError::Http(e.to_string()))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| FinchError::Http(e.to_string()))?;
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| FinchError::Http(e.to_string()))?
            .to_bytes();

        if status == StatusCode::NOT_FOUND {
            return Err(FinchError::CredentialNotFound {
                build_ref: BuildId::new(build_id).fingerprint(),
                address: server_addr.to_string(),
            });
        }

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorMessage>(&bytes)
                .map(|m| m.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
            return Err(FinchError::Http(format!("{}: {}", status, message)));
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}
