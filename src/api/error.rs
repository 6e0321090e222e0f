//! The single mapping from internal errors to the wire

use crate::error::{ErrorKind, FinchError};
use crate::protocol::ErrorMessage;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Error returned by credential socket handlers.
///
/// Carries only the error class so that no internal detail can reach the
/// response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiError(pub ErrorKind);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Malformed => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &'static str {
        match self.0 {
            ErrorKind::NotFound => "credentials not found",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Malformed => "malformed request",
            ErrorKind::Internal => "internal error",
        }
    }
}

impl From<FinchError> for ApiError {
    fn from(err: FinchError) -> Self {
        Self(err.kind())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorMessage {
            message: self.message().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
