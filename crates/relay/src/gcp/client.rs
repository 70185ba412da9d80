//! Cloud Error Reporting API client.
//!
//! See: <https://cloud.google.com/error-reporting/reference/rest/v1beta1/projects.groupStats/list>

use std::sync::Arc;

use chatops_core::{ProjectId, RawError};
use secrecy::ExposeSecret;
use serde::{Deserialize, Deserializer};
use tracing::{debug, instrument};

use crate::config::ErrorReportingConfig;

use super::error::ErrorReportingError;
use super::token::TokenProvider;

const PAGE_SIZE: &str = "100";
/// Stop paging after this many pages even if the API keeps returning tokens.
const MAX_PAGES: usize = 50;
const OPEN: &str = "OPEN";

/// Client for the Cloud Error Reporting API.
#[derive(Clone, Debug)]
pub struct ErrorReportingClient {
    inner: Arc<ErrorReportingClientInner>,
}

#[derive(Debug)]
struct ErrorReportingClientInner {
    client: reqwest::Client,
    api_base: String,
    tokens: TokenProvider,
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListGroupStatsResponse {
    #[serde(default)]
    error_group_stats: Vec<ErrorGroupStats>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorGroupStats {
    #[serde(default)]
    group: ErrorGroup,
    #[serde(default, deserialize_with = "int64")]
    count: u64,
    #[serde(default = "empty_object")]
    affected_services: serde_json::Value,
    #[serde(default)]
    representative: ErrorEvent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorGroup {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    resolution_status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorEvent {
    #[serde(default = "empty_object")]
    service_context: serde_json::Value,
    #[serde(default)]
    message: String,
}

// Used when `representative` is absent; must agree with the field defaults.
impl Default for ErrorEvent {
    fn default() -> Self {
        Self {
            service_context: empty_object(),
            message: String::new(),
        }
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Protobuf JSON encodes int64 as a string; accept both forms.
fn int64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Int64 {
        Number(u64),
        Text(String),
    }

    match Int64::deserialize(deserializer)? {
        Int64::Number(n) => Ok(n),
        Int64::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

impl ErrorGroupStats {
    fn is_open(&self) -> bool {
        self.group.resolution_status.as_deref() == Some(OPEN)
    }

    fn into_raw(self, project_id: &ProjectId) -> RawError {
        RawError {
            project_id: project_id.to_string(),
            group_name: self.group.name.unwrap_or_else(|| "empty".to_string()),
            resolution_status: self.group.resolution_status.unwrap_or_default(),
            count: self.count,
            affected_services: self.affected_services,
            service_context: self.representative.service_context,
            error_message: self.representative.message,
        }
    }
}

// =============================================================================
// Client
// =============================================================================

impl ErrorReportingClient {
    /// Create a new client sharing the given HTTP client.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &ErrorReportingConfig) -> Self {
        let tokens = TokenProvider::new(client.clone(), &config.credentials);
        Self {
            inner: Arc::new(ErrorReportingClientInner {
                client,
                api_base: config.api_base.clone(),
                tokens,
            }),
        }
    }

    /// List the open error groups of a project.
    ///
    /// Follows `nextPageToken` across pages and drops groups whose
    /// resolution status is anything other than `OPEN`.
    ///
    /// # Errors
    ///
    /// Returns an error if a token cannot be obtained or any page fails.
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub async fn list_open_errors(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<RawError>, ErrorReportingError> {
        let token = self.inner.tokens.token().await?;
        let endpoint = format!("{}/projects/{project_id}/groupStats", self.inner.api_base);

        let mut errors = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen = 0_usize;

        for page in 1..=MAX_PAGES {
            let mut url = url::Url::parse(&endpoint)?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("pageSize", PAGE_SIZE);
                if let Some(page_token) = &page_token {
                    query.append_pair("pageToken", page_token);
                }
            }

            let response = self
                .inner
                .client
                .get(url)
                .bearer_auth(token.expose_secret())
                .header("Accept", "application/json")
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(ErrorReportingError::Status {
                    status: status.as_u16(),
                    message,
                });
            }

            let body: ListGroupStatsResponse = response
                .json()
                .await
                .map_err(|e| ErrorReportingError::Parse(e.to_string()))?;

            seen += body.error_group_stats.len();
            errors.extend(
                body.error_group_stats
                    .into_iter()
                    .filter(ErrorGroupStats::is_open)
                    .map(|stats| stats.into_raw(project_id)),
            );

            page_token = body.next_page_token.filter(|t| !t.is_empty());
            if page_token.is_none() {
                debug!(pages = page, groups = seen, open = errors.len(), "Listed error groups");
                return Ok(errors);
            }
        }

        debug!(pages = MAX_PAGES, groups = seen, open = errors.len(), "Page limit reached");
        Ok(errors)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::GcpCredentials;
    use httpmock::prelude::*;
    use secrecy::SecretString;
    use serde_json::json;

    fn client(server: &MockServer) -> ErrorReportingClient {
        let config = ErrorReportingConfig {
            api_base: server.url("/v1beta1"),
            credentials: GcpCredentials::Static(SecretString::from("ya29.test".to_string())),
        };
        ErrorReportingClient::new(reqwest::Client::new(), &config)
    }

    fn project() -> ProjectId {
        ProjectId::parse("proj-1").unwrap()
    }

    fn group(name: &str, status: &str) -> serde_json::Value {
        json!({
            "group": {"name": name, "groupId": "g", "resolutionStatus": status},
            "count": "12",
            "affectedServices": [{"service": "api", "version": "v7"}],
            "representative": {
                "eventTime": "2024-01-01T00:00:00Z",
                "serviceContext": {"service": "api", "version": "v7", "resourceType": "cloud_run_revision"},
                "message": "KeyError: 'user'"
            }
        })
    }

    #[tokio::test]
    async fn test_lists_open_groups_across_pages() {
        let server = MockServer::start();
        let first = server.mock(|when, then| {
            when.method(GET)
                .path("/v1beta1/projects/proj-1/groupStats")
                .query_param("pageSize", "100")
                .query_param_missing("pageToken")
                .header("authorization", "Bearer ya29.test");
            then.status(200).json_body(json!({
                "errorGroupStats": [group("g1", "OPEN"), group("g2", "RESOLVED")],
                "nextPageToken": "page-2"
            }));
        });
        let second = server.mock(|when, then| {
            when.method(GET)
                .path("/v1beta1/projects/proj-1/groupStats")
                .query_param("pageToken", "page-2");
            then.status(200).json_body(json!({
                "errorGroupStats": [group("g3", "OPEN"), group("g4", "MUTED")]
            }));
        });

        let errors = client(&server).list_open_errors(&project()).await.unwrap();

        first.assert();
        second.assert();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].group_name, "g1");
        assert_eq!(errors[0].count, 12);
        assert_eq!(errors[0].resolution_status, "OPEN");
        assert_eq!(errors[0].service(), Some("api"));
        assert_eq!(errors[0].error_message, "KeyError: 'user'");
        assert_eq!(errors[1].group_name, "g3");
    }

    #[tokio::test]
    async fn test_empty_project() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1beta1/projects/proj-1/groupStats");
            then.status(200).json_body(json!({}));
        });

        let errors = client(&server).list_open_errors(&project()).await.unwrap();
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn test_missing_fields_use_defaults() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1beta1/projects/proj-1/groupStats");
            then.status(200).json_body(json!({
                "errorGroupStats": [{"group": {"resolutionStatus": "OPEN"}, "count": 3}]
            }));
        });

        let errors = client(&server).list_open_errors(&project()).await.unwrap();
        assert_eq!(errors[0].group_name, "empty");
        assert_eq!(errors[0].count, 3);
        assert_eq!(errors[0].service_context, json!({}));
        assert_eq!(errors[0].error_message, "");
    }

    #[test]
    fn test_representative_defaults_match_when_present_or_absent() {
        let absent: ErrorGroupStats =
            serde_json::from_value(json!({"group": {"resolutionStatus": "OPEN"}})).unwrap();
        let empty: ErrorGroupStats = serde_json::from_value(json!({
            "group": {"resolutionStatus": "OPEN"},
            "representative": {}
        }))
        .unwrap();

        assert_eq!(absent.representative.service_context, json!({}));
        assert_eq!(
            absent.representative.service_context,
            empty.representative.service_context
        );
        assert_eq!(absent.affected_services, json!({}));
        assert_eq!(absent.representative.message, empty.representative.message);
    }

    #[tokio::test]
    async fn test_api_error_is_surfaced() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1beta1/projects/proj-1/groupStats");
            then.status(403)
                .json_body(json!({"error": {"code": 403, "message": "Permission denied"}}));
        });

        let err = client(&server).list_open_errors(&project()).await.unwrap_err();
        assert!(matches!(err, ErrorReportingError::Status { status: 403, .. }));
    }
}
