//! Credential endpoint

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::credentials::{BuildId, CredentialRecord};
use crate::error::{ErrorKind, FinchError};
use crate::protocol::CredentialRequest;
use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use tracing::debug;

/// Serve the credential a build declared for a registry
pub async fn get_credentials(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CredentialRecord>, ApiError> {
    let request = decode_request(&body).map_err(|e| {
        debug!("Rejecting credential request: {}", e);
        ApiError(ErrorKind::Malformed)
    })?;

    let build_id = BuildId::new(request.build_id);
    let audit_data = serde_json::json!({
        "build_ref": build_id.fingerprint(),
        "server": &request.server_addr,
    });

    match state.service.resolve(&build_id, &request.server_addr) {
        Ok((record, kind)) => {
            let mut data = audit_data;
            data["match"] = kind.as_str().into();
            state.audit.log("credentials.served", &data).await;
            Ok(Json(record))
        }
        Err(e) => {
            debug!("Credential lookup failed: {}", e);
            state.audit.log("credentials.denied", &audit_data).await;
            Err(e.into())
        }
    }
}

fn decode_request(body: &[u8]) -> Result<CredentialRequest, FinchError> {
    let request: CredentialRequest = serde_json::from_slice(body)
        .map_err(|e| FinchError::MalformedRequest(e.to_string()))?;

    if request.build_id.is_empty() {
        return Err(FinchError::MalformedRequest("buildID is empty".to_string()));
    }
    if request.server_addr.is_empty() {
        return Err(FinchError::MalformedRequest("serverAddr is empty".to_string()));
    }

    Ok(request)
}
