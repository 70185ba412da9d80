//! Slack Web API client.
//!
//! Posts messages with `chat.postMessage`, retrying transient failures with
//! exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use chatops_core::ChannelId;
use reqwest::{Client, StatusCode, header::RETRY_AFTER};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument, warn};

use super::error::SlackError;
use super::types::{Ack, OutboundMessage, PostMessage, PostMessageResponse};
use crate::config::{DeliveryPolicy, SlackConfig};

/// Header carrying the 0-based attempt number of a delivery request.
///
/// Only sent when [`DeliveryPolicy::tag_attempts`] is set.
pub const RETRY_ATTEMPT_HEADER: &str = "x-chatops-retry-attempt";

/// Upper bound on a server-requested `Retry-After` delay.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Slack API client for posting messages.
#[derive(Clone)]
pub struct SlackClient {
    inner: Arc<SlackClientInner>,
}

struct SlackClientInner {
    client: Client,
    bot_token: SecretString,
    api_base: String,
    policy: DeliveryPolicy,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("bot_token", &"[REDACTED]")
            .field("api_base", &self.inner.api_base)
            .field("policy", &self.inner.policy)
            .finish_non_exhaustive()
    }
}

/// A failed attempt and how long Slack asked us to wait.
struct AttemptError {
    error: SlackError,
    retry_after: Option<Duration>,
}

impl From<SlackError> for AttemptError {
    fn from(error: SlackError) -> Self {
        Self {
            error,
            retry_after: None,
        }
    }
}

impl SlackClient {
    /// Create a new Slack client sharing the given HTTP client.
    #[must_use]
    pub fn new(client: Client, config: &SlackConfig) -> Self {
        Self {
            inner: Arc::new(SlackClientInner {
                client,
                bot_token: config.bot_token.clone(),
                api_base: config.api_base.clone(),
                policy: config.delivery,
            }),
        }
    }

    /// Post a message to a channel.
    ///
    /// Transient failures (transport errors, HTTP 429/5xx, `rate_limited`
    /// and friends) are retried up to the configured attempt budget. Other
    /// API errors fail immediately.
    ///
    /// # Errors
    ///
    /// Returns the terminal error, or `RetriesExhausted` wrapping the last
    /// transient one.
    #[instrument(skip(self, message), fields(channel = %channel, blocks = message.is_blocks()))]
    pub async fn send(
        &self,
        channel: &ChannelId,
        message: &OutboundMessage,
    ) -> Result<Ack, SlackError> {
        let body = PostMessage::new(channel, message);
        let policy = self.inner.policy;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self.post_once(&body, attempt - 1).await {
                Ok(response) => {
                    debug!(attempt, ts = ?response.ts, "Message posted to Slack");
                    return Ok(Ack {
                        channel: response.channel,
                        ts: response.ts,
                        attempts: attempt,
                    });
                }
                Err(AttemptError { error, .. }) if !error.is_transient() => {
                    return Err(error);
                }
                Err(AttemptError { error, .. }) if attempt >= policy.max_attempts => {
                    return Err(SlackError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(error),
                    });
                }
                Err(AttemptError { error, retry_after }) => {
                    let delay = retry_after
                        .map_or_else(|| policy.backoff_after(attempt), |d| d.min(MAX_RETRY_AFTER));
                    warn!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "Transient Slack failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn post_once(
        &self,
        body: &PostMessage<'_>,
        attempt: u32,
    ) -> Result<PostMessageResponse, AttemptError> {
        let mut request = self
            .inner
            .client
            .post(format!("{}/chat.postMessage", self.inner.api_base))
            .bearer_auth(self.inner.bot_token.expose_secret());
        if self.inner.policy.tag_attempts {
            request = request.header(RETRY_ATTEMPT_HEADER, attempt.to_string());
        }

        let response = request
            .json(body)
            .send()
            .await
            .map_err(|e| SlackError::Request(e.without_url().to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(AttemptError {
                error: SlackError::Status(status.as_u16()),
                retry_after: retry_after(&response),
            });
        }

        let result: PostMessageResponse = response
            .json()
            .await
            .map_err(|e| SlackError::Response(e.to_string()))?;

        if result.ok {
            return Ok(result);
        }

        Err(SlackError::Api(result.error.unwrap_or_else(|| "unknown_error".to_string())).into())
    }
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
