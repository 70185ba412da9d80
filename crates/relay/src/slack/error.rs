//! Slack delivery errors.

use thiserror::Error;

/// API error codes worth retrying.
///
/// Slack documents `ratelimited`; `rate_limited` and `server_error` are
/// returned by some workspace gateways.
const TRANSIENT_API_ERRORS: &[&str] = &[
    "rate_limited",
    "ratelimited",
    "server_error",
    "internal_error",
    "service_unavailable",
];

/// Errors that can occur when posting to Slack.
#[derive(Debug, Error)]
pub enum SlackError {
    /// HTTP request failed before a response arrived.
    #[error("Slack request failed: {0}")]
    Request(String),

    /// Slack answered with a non-success HTTP status.
    #[error("Slack returned HTTP {0}")]
    Status(u16),

    /// Failed to parse response.
    #[error("Slack response error: {0}")]
    Response(String),

    /// Slack API returned `ok: false` with this error code.
    #[error("Slack API error: {0}")]
    Api(String),

    /// Every allowed attempt failed with a transient error.
    #[error("Slack delivery failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// Error from the final attempt.
        last: Box<Self>,
    },
}

impl SlackError {
    /// Whether another attempt could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Status(status) => *status == 429 || (500..=599).contains(status),
            Self::Api(code) => TRANSIENT_API_ERRORS.contains(&code.as_str()),
            Self::Response(_) | Self::RetriesExhausted { .. } => false,
        }
    }
}
