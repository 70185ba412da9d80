//! Slack Events API webhook.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use crate::error::AppError;
use crate::services::{Intake, classify};
use crate::slack::InboundEvent;
use crate::state::AppState;

/// Header Slack sets on redeliveries of an unacknowledged event.
pub const RETRY_NUM_HEADER: &str = "x-slack-retry-num";

/// Create the events route.
pub fn router() -> Router<AppState> {
    Router::new().route("/slack/events", post(handle_event))
}

/// Handle an Events API request.
///
/// The body is read raw so the signature covers the exact bytes Slack
/// sent. Qualifying messages are handed to a background task and the
/// request is acknowledged immediately.
#[instrument(skip_all, fields(body_len = body.len()))]
async fn handle_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    state
        .verifier()
        .verify(&headers, &body, chrono::Utc::now().timestamp())?;

    let event: InboundEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::MalformedPayload(e.to_string()))?;

    match classify(event) {
        Intake::Challenge(challenge) => {
            info!("Answering URL verification challenge");
            Ok(Json(json!({ "challenge": challenge })))
        }
        Intake::Dispatch(job) => {
            if let Some(retry_num) = headers.get(RETRY_NUM_HEADER).and_then(|v| v.to_str().ok()) {
                info!(retry_num, channel = %job.channel, "Skipping Slack redelivery");
            } else {
                info!(channel = %job.channel, "Dispatching message");
                state
                    .tasks()
                    .spawn(state.dispatcher().clone(), state.slack().clone(), job)
                    .await?;
            }
            Ok(ack())
        }
        Intake::Ignore(reason) => {
            debug!(reason, "Event ignored");
            Ok(ack())
        }
    }
}

fn ack() -> Json<Value> {
    Json(json!({ "ok": true }))
}
