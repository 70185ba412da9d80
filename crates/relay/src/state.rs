//! Application state shared across handlers and background tasks.

use std::sync::Arc;

use crate::agent::Dispatcher;
use crate::config::RelayConfig;
use crate::gcp::ErrorReportingClient;
use crate::openai::OpenAiClient;
use crate::services::PipelineTasks;
use crate::slack::{SignatureVerifier, SlackClient};

/// User agent sent on every outbound request.
const USER_AGENT: &str = concat!("chatops-relay/", env!("CARGO_PKG_VERSION"));

/// Application state shared across all handlers.
///
/// Cheap to clone; every collaborator sits behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RelayConfig,
    verifier: SignatureVerifier,
    slack: SlackClient,
    dispatcher: Dispatcher,
    tasks: PipelineTasks,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("slack", &self.inner.slack)
            .field("dispatcher", &self.inner.dispatcher)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Build the state and every API client from configuration.
    ///
    /// All clients share one connection pool with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: RelayConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.http_timeout)
            .build()?;

        let verifier = SignatureVerifier::new(
            config.slack.signing_secret.clone(),
            config.slack.max_request_age,
        );
        let slack = SlackClient::new(http.clone(), &config.slack);
        let dispatcher = Dispatcher::new(
            OpenAiClient::new(http.clone(), &config.openai),
            ErrorReportingClient::new(http, &config.error_reporting),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                verifier,
                slack,
                dispatcher,
                tasks: PipelineTasks::default(),
            }),
        })
    }

    /// Loaded configuration.
    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    /// Webhook signature verifier.
    #[must_use]
    pub fn verifier(&self) -> &SignatureVerifier {
        &self.inner.verifier
    }

    /// Slack delivery client.
    #[must_use]
    pub fn slack(&self) -> &SlackClient {
        &self.inner.slack
    }

    /// Tool dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// Background reply tasks, drained on shutdown.
    #[must_use]
    pub fn tasks(&self) -> &PipelineTasks {
        &self.inner.tasks
    }
}
