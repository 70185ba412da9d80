//! Liveness endpoints.

use axum::{Router, routing::get};

use crate::state::AppState;

/// Create the health routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/slack/health", get(health))
}

/// Returns "ok" while the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
