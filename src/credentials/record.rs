//! Registry credential records and build-request auth decoding

use crate::error::{FinchError, FinchResult};
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single registry credential.
///
/// Field names follow the Docker `AuthConfig` wire shape so the record can be
/// passed through verbatim from the build request to the helper.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,

    /// Address the credential was declared against
    #[serde(default, rename = "serveraddress", skip_serializing_if = "String::is_empty")]
    pub server_address: String,

    /// Bearer token used in place of a password
    #[serde(default, rename = "identitytoken", skip_serializing_if = "String::is_empty")]
    pub identity_token: String,

    /// Token sent directly to the registry
    #[serde(default, rename = "registrytoken", skip_serializing_if = "String::is_empty")]
    pub registry_token: String,
}

impl CredentialRecord {
    /// Create a username/password record for a registry
    pub fn basic(server_address: &str, username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            server_address: server_address.to_string(),
            ..Default::default()
        }
    }
}

// Secrets never reach log output through Debug.
impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .field("auth", &redacted(&self.auth))
            .field("server_address", &self.server_address)
            .field("identity_token", &redacted(&self.identity_token))
            .field("registry_token", &redacted(&self.registry_token))
            .finish()
    }
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() {
        ""
    } else {
        "<redacted>"
    }
}

/// Credentials supplied for one build, keyed by server address exactly as
/// the caller wrote it.
pub type CredentialEntry = HashMap<String, CredentialRecord>;

/// Decode a Docker `X-Registry-Config` value.
///
/// The value is base64 (URL-safe or standard, padding optional) of a JSON
/// object mapping server addresses to auth configs. An empty value means the
/// build supplied no registry auth.
pub fn decode_registry_config(encoded: &str) -> FinchResult<CredentialEntry> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Ok(CredentialEntry::new());
    }

    let raw = [URL_SAFE, URL_SAFE_NO_PAD, STANDARD, STANDARD_NO_PAD]
        .iter()
        .find_map(|engine| engine.decode(encoded).ok())
        .ok_or_else(|| FinchError::RegistryConfig("value is not valid base64".to_string()))?;

    parse_registry_config(&raw)
}

/// Parse a plain JSON registry config (the decoded form of the header)
pub fn parse_registry_config(raw: &[u8]) -> FinchResult<CredentialEntry> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(CredentialEntry::new());
    }

    let entry: Option<CredentialEntry> = serde_json::from_slice(raw)
        .map_err(|e| FinchError::RegistryConfig(format!("invalid JSON: {}", e)))?;

    // `null` is what some clients send for "no auth"
    Ok(entry.unwrap_or_default())
}
