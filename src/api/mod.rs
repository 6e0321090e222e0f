//! HTTP surface of the dedicated credential socket
//!
//! One read-only route, guarded for every request by [`PeerGuard`]. This
//! router is never mounted on the general API listener.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;

pub use error::ApiError;
pub use server::CredentialServer;

use crate::audit::AuditLog;
use crate::credentials::CredentialService;
use crate::peer::PeerGuard;
use crate::protocol::CREDENTIALS_PATH;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

/// Shared state for credential socket handlers
#[derive(Clone)]
pub struct AppState {
    pub service: CredentialService,
    pub guard: PeerGuard,
    pub audit: AuditLog,
}

impl AppState {
    pub fn new(service: CredentialService, guard: PeerGuard, audit: AuditLog) -> Self {
        Self {
            service,
            guard,
            audit,
        }
    }
}

/// Build the credential socket router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(CREDENTIALS_PATH, get(handlers::get_credentials))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_peer,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{CredentialEntry, CredentialRecord};
    use crate::peer::guard::testing::FakeProcessTable;
    use crate::peer::{PeerConnection, PeerCredentials, ProcessIdentity};
    use crate::protocol::ErrorMessage;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    const DAEMON: ProcessIdentity = ProcessIdentity {
        uid: 1000,
        gid: 1000,
        pid: 10,
    };

    fn state(peer_uid: u32, grandparent: u32) -> AppState {
        let peer = ProcessIdentity {
            uid: peer_uid,
            gid: 1000,
            pid: 30,
        };
        let table = FakeProcessTable::with_chain(peer, &[20, grandparent]);
        AppState::new(
            CredentialService::in_memory(),
            PeerGuard::new(Arc::new(table), DAEMON),
            AuditLog::disabled(),
        )
    }

    fn local_peer() -> ConnectInfo<PeerConnection> {
        ConnectInfo(PeerConnection::unix(PeerCredentials {
            uid: 1000,
            gid: 1000,
            pid: Some(30),
        }))
    }

    fn request(body: &str, conn: Option<ConnectInfo<PeerConnection>>) -> Request<Body> {
        let mut req = Request::builder()
            .method("GET")
            .uri(CREDENTIALS_PATH)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        if let Some(conn) = conn {
            req.extensions_mut().insert(conn);
        }
        req
    }

    fn store(state: &AppState, address: &str) -> String {
        let id = state.service.generate_build_id().unwrap();
        let mut entry = CredentialEntry::new();
        entry.insert(
            address.to_string(),
            CredentialRecord::basic(address, "alice", "hunter2"),
        );
        state.service.store_auth_configs(&id, entry).unwrap();
        id.as_str().to_string()
    }

    async fn send(state: AppState, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router(state).oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn serves_stored_credential() {
        let state = state(1000, 10);
        let build_id = store(&state, "https://gcr.io/v1/");
        let body = format!(r#"{{"buildID":"{}","serverAddr":"https://gcr.io"}}"#, build_id);

        let (status, json) = send(state, request(&body, Some(local_peer()))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["username"], "alice");
        assert_eq!(json["password"], "hunter2");
    }

    #[tokio::test]
    async fn unknown_build_and_unknown_registry_are_indistinguishable() {
        let state = state(1000, 10);
        let build_id = store(&state, "https://gcr.io/v1/");

        let wrong_build = r#"{"buildID":"deadbeef","serverAddr":"https://gcr.io"}"#;
        let wrong_registry = format!(r#"{{"buildID":"{}","serverAddr":"https://quay.io"}}"#, build_id);

        let a = send(state.clone(), request(wrong_build, Some(local_peer()))).await;
        let b = send(state, request(&wrong_registry, Some(local_peer()))).await;

        assert_eq!(a.0, StatusCode::NOT_FOUND);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn missing_field_is_bad_request() {
        let (status, json) = send(
            state(1000, 10),
            request(r#"{"buildID":"abc"}"#, Some(local_peer())),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message: ErrorMessage = serde_json::from_value(json).unwrap();
        assert_eq!(message.message, "malformed request");
    }

    #[tokio::test]
    async fn foreign_ancestry_is_unauthorized() {
        let state = state(1000, 999);
        let build_id = store(&state, "ghcr.io");
        let body = format!(r#"{{"buildID":"{}","serverAddr":"ghcr.io"}}"#, build_id);

        let (status, json) = send(state, request(&body, Some(local_peer()))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["message"], "unauthorized");
        assert!(json.get("username").is_none());
    }

    #[tokio::test]
    async fn foreign_uid_is_unauthorized() {
        let (status, _) = send(
            state(0, 10),
            request(r#"{"buildID":"a","serverAddr":"b"}"#, Some(local_peer())),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unauthorized_before_body_is_parsed() {
        // garbage body still yields 401, not 400
        let (status, _) = send(state(1000, 999), request("not json", Some(local_peer()))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_connection_info_is_unauthorized() {
        let (status, _) = send(
            state(1000, 10),
            request(r#"{"buildID":"a","serverAddr":"b"}"#, None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn network_peer_is_unauthorized() {
        let conn = ConnectInfo(PeerConnection::Network {
            remote: "192.168.1.4:5000".parse().unwrap(),
        });
        let (status, _) = send(
            state(1000, 10),
            request(r#"{"buildID":"a","serverAddr":"b"}"#, Some(conn)),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn no_write_routes() {
        let state = state(1000, 10);
        let req = Request::builder()
            .method("POST")
            .uri(CREDENTIALS_PATH)
            .extension(local_peer())
            .body(Body::from("{}"))
            .unwrap();
        let response = router(state).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
