//! Unified error handling for the relay's HTTP surface.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::Draining;
use crate::slack::SignatureError;

/// Application-level error type for HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request signature is missing, stale or wrong.
    #[error("Signature verification failed: {0}")]
    Signature(#[from] SignatureError),

    /// Request body is not a valid event payload.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// The relay is draining and takes no new work.
    #[error("Unavailable: {0}")]
    ShuttingDown(#[from] Draining),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Signature(_) => {
                tracing::warn!(error = %self, "Rejected unsigned or stale request");
                (StatusCode::BAD_REQUEST, "invalid request signature")
            }
            Self::MalformedPayload(_) => {
                tracing::warn!(error = %self, "Rejected malformed payload");
                (StatusCode::BAD_REQUEST, "malformed payload")
            }
            Self::ShuttingDown(_) => {
                tracing::warn!(error = %self, "Refused event during shutdown");
                (StatusCode::SERVICE_UNAVAILABLE, "shutting down")
            }
        };

        // Don't expose error details to clients
        (status, Json(json!({"ok": false, "error": message}))).into_response()
    }
}
