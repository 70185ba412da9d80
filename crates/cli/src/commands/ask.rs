//! Run the agent locally.
//!
//! Replaces an HTTP debug endpoint: the request never touches Slack, and the
//! message that would have been posted is printed as JSON.

use chatops_relay::AppState;
use chatops_relay::agent::DispatchError;
use chatops_relay::config::{ConfigError, RelayConfig};
use chatops_relay::slack::format_reply;
use thiserror::Error;

/// Errors that can occur while answering a request.
#[derive(Debug, Error)]
pub enum AskError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// The agent failed.
    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    /// The message could not be serialized.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Answer `text` and print the outbound Slack message.
///
/// # Errors
///
/// Returns an error if configuration fails to load or the agent fails.
#[allow(clippy::print_stdout)]
pub async fn run(text: &str) -> Result<(), AskError> {
    let config = RelayConfig::from_env()?;
    let state = AppState::new(config)?;

    tracing::info!("Dispatching request");
    let reply = state.dispatcher().handle(text).await?;
    let message = format_reply(&reply);

    println!("{}", serde_json::to_string_pretty(&message)?);
    Ok(())
}
