//! Peer authentication middleware

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::error::FinchError;
use crate::peer::{GuardRejection, PeerConnection};
use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

/// Admit the request only if its connection passes the peer guard.
///
/// Runs before the body is read. Every rejection produces the same 401.
pub async fn require_peer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let verdict = match request.extensions().get::<ConnectInfo<PeerConnection>>() {
        Some(ConnectInfo(conn)) => state.guard.admit(conn),
        None => Err(GuardRejection::NotLocal),
    };

    match verdict {
        Ok(peer) => {
            debug!("Admitted peer pid {} (uid {})", peer.pid, peer.uid);
            next.run(request).await
        }
        Err(rejection) => {
            warn!("Rejected credential socket peer: {}", rejection);
            state
                .audit
                .log(
                    "peer.rejected",
                    &serde_json::json!({ "reason": rejection.as_str() }),
                )
                .await;
            ApiError::from(FinchError::PeerRejected(rejection)).into_response()
        }
    }
}
