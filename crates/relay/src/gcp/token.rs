//! GCP access tokens.
//!
//! Tokens come either from configuration or from the metadata server that
//! Cloud Run, GKE and GCE expose to workloads. Metadata tokens are cached.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::SecretString;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::GcpCredentials;

use super::error::ErrorReportingError;

/// How long a metadata token is reused. The metadata server hands out
/// tokens with at least five minutes of remaining lifetime.
const TOKEN_TTL: Duration = Duration::from_secs(240);

const CACHE_KEY: &str = "default";

/// Supplies bearer tokens for Google APIs.
#[derive(Clone)]
pub struct TokenProvider {
    inner: Arc<TokenSource>,
}

enum TokenSource {
    Static(SecretString),
    Metadata {
        client: reqwest::Client,
        token_url: String,
        cache: Cache<&'static str, SecretString>,
    },
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.as_ref() {
            TokenSource::Static(_) => f.debug_struct("TokenProvider::Static").finish_non_exhaustive(),
            TokenSource::Metadata { token_url, .. } => f
                .debug_struct("TokenProvider::Metadata")
                .field("token_url", token_url)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

impl TokenProvider {
    /// Create a provider for the configured credentials.
    #[must_use]
    pub fn new(client: reqwest::Client, credentials: &GcpCredentials) -> Self {
        let source = match credentials {
            GcpCredentials::Static(token) => TokenSource::Static(token.clone()),
            GcpCredentials::MetadataServer { token_url } => TokenSource::Metadata {
                client,
                token_url: token_url.clone(),
                cache: Cache::builder()
                    .max_capacity(1)
                    .time_to_live(TOKEN_TTL)
                    .build(),
            },
        };
        Self {
            inner: Arc::new(source),
        }
    }

    /// Get a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `Token` if the metadata server cannot be reached or answers
    /// with an unusable token.
    pub async fn token(&self) -> Result<SecretString, ErrorReportingError> {
        match self.inner.as_ref() {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::Metadata {
                client,
                token_url,
                cache,
            } => {
                if let Some(token) = cache.get(&CACHE_KEY).await {
                    return Ok(token);
                }
                let token = fetch_metadata_token(client, token_url).await?;
                cache.insert(CACHE_KEY, token.clone()).await;
                Ok(token)
            }
        }
    }
}

#[instrument(skip(client))]
async fn fetch_metadata_token(
    client: &reqwest::Client,
    token_url: &str,
) -> Result<SecretString, ErrorReportingError> {
    let response = client
        .get(token_url)
        .header("Metadata-Flavor", "Google")
        .send()
        .await
        .map_err(|e| ErrorReportingError::Token(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ErrorReportingError::Token(format!(
            "metadata server returned {status}"
        )));
    }

    let token: MetadataToken = response
        .json()
        .await
        .map_err(|e| ErrorReportingError::Token(e.to_string()))?;

    if token.access_token.is_empty() {
        return Err(ErrorReportingError::Token(
            "metadata server returned an empty token".to_string(),
        ));
    }

    debug!(expires_in = token.expires_in, "Fetched GCP access token");
    Ok(SecretString::from(token.access_token))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use secrecy::ExposeSecret;
    use serde_json::json;

    #[tokio::test]
    async fn test_static_token() {
        let provider = TokenProvider::new(
            reqwest::Client::new(),
            &GcpCredentials::Static(SecretString::from("ya29.static".to_string())),
        );
        assert_eq!(provider.token().await.unwrap().expose_secret(), "ya29.static");
    }

    #[tokio::test]
    async fn test_metadata_token_is_cached() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/token")
                .header("Metadata-Flavor", "Google");
            then.status(200).json_body(json!({
                "access_token": "ya29.metadata",
                "expires_in": 3599,
                "token_type": "Bearer"
            }));
        });

        let provider = TokenProvider::new(
            reqwest::Client::new(),
            &GcpCredentials::MetadataServer {
                token_url: server.url("/token"),
            },
        );

        assert_eq!(provider.token().await.unwrap().expose_secret(), "ya29.metadata");
        assert_eq!(provider.token().await.unwrap().expose_secret(), "ya29.metadata");
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn test_metadata_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/token");
            then.status(404);
        });

        let provider = TokenProvider::new(
            reqwest::Client::new(),
            &GcpCredentials::MetadataServer {
                token_url: server.url("/token"),
            },
        );

        assert!(matches!(
            provider.token().await,
            Err(ErrorReportingError::Token(_))
        ));
    }
}
