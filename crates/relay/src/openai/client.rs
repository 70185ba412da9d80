//! `OpenAI` Chat Completions client.

use std::sync::Arc;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};

use crate::config::OpenAiConfig;

use super::error::{ApiErrorResponse, OpenAiError};
use super::types::{ChatRequest, ChatResponse, ResponseMessage};

/// `OpenAI` API client.
///
/// Each call is a single stateless completion; no conversation is kept.
#[derive(Clone)]
pub struct OpenAiClient {
    inner: Arc<OpenAiClientInner>,
}

struct OpenAiClientInner {
    client: reqwest::Client,
    api_key: SecretString,
    api_base: String,
    model: String,
    summary_model: String,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.inner.api_base)
            .field("model", &self.inner.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Create a new client sharing the given HTTP client.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &OpenAiConfig) -> Self {
        Self {
            inner: Arc::new(OpenAiClientInner {
                client,
                api_key: config.api_key.clone(),
                api_base: config.api_base.clone(),
                model: config.model.clone(),
                summary_model: config.summary_model.clone(),
            }),
        }
    }

    /// Model used to choose a tool.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.inner.model
    }

    /// Model used for structured summaries.
    #[must_use]
    pub fn summary_model(&self) -> &str {
        &self.inner.summary_model
    }

    /// Run a chat completion and return the first choice's message.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the API returns an error
    /// status, or the response has no choices.
    #[instrument(skip(self, request), fields(model = %request.model))]
    pub async fn complete(&self, request: &ChatRequest) -> Result<ResponseMessage, OpenAiError> {
        let response = self
            .inner
            .client
            .post(format!("{}/chat/completions", self.inner.api_base))
            .bearer_auth(self.inner.api_key.expose_secret())
            .json(request)
            .send()
            .await?;

        let response = Self::handle_response(response).await?;
        debug!(
            id = ?response.id,
            finish_reason = ?response.choices.first().and_then(|c| c.finish_reason.as_deref()),
            "Completion received"
        );

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or(OpenAiError::EmptyResponse)
    }

    /// Handle a successful response.
    async fn handle_response(response: reqwest::Response) -> Result<ChatResponse, OpenAiError> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body)
                .map_err(|e| OpenAiError::Parse(format!("Failed to parse response: {e}")))
        } else {
            Err(Self::handle_error_status(status, response).await)
        }
    }

    /// Handle an error status code.
    async fn handle_error_status(status: StatusCode, response: reqwest::Response) -> OpenAiError {
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(20);
            return OpenAiError::RateLimited(retry_after);
        }

        if status == StatusCode::UNAUTHORIZED {
            return OpenAiError::Unauthorized("Invalid API key".to_string());
        }

        match response.text().await {
            Ok(body) => match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_error) => OpenAiError::Api {
                    error_type: api_error
                        .error
                        .code
                        .or(api_error.error.error_type)
                        .unwrap_or_else(|| status.as_u16().to_string()),
                    message: api_error.error.message,
                },
                Err(_) => OpenAiError::Api {
                    error_type: status.as_u16().to_string(),
                    message: body,
                },
            },
            Err(e) => OpenAiError::Http(e),
        }
    }
}
