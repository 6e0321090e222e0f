//! Wire contract between the credential helper and the daemon

use serde::{Deserialize, Serialize};

/// Route serving credential lookups on the credential socket
pub const CREDENTIALS_PATH: &str = "/finch/credentials";

/// Build identifier handed to the build engine and its helpers
pub const BUILD_ID_ENV: &str = "FINCH_BUILD_ID";

/// Override for the credential socket location
pub const CREDENTIAL_SOCKET_ENV: &str = "FINCH_CREDENTIAL_SOCKET";

/// Lookup request sent by the helper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRequest {
    #[serde(rename = "buildID")]
    pub build_id: String,

    #[serde(rename = "serverAddr")]
    pub server_addr: String,
}

/// Body of every failure response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
}
