//! Relay configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SLACK_SIGNING_SECRET` - Slack app signing secret for webhook verification
//! - `SLACK_BOT_TOKEN` - Slack bot token (xoxb-...) used to post replies
//! - `OPENAI_API_KEY` - `OpenAI` API key for the agent
//!
//! ## Optional
//! - `RELAY_HOST` - Bind address (default: 0.0.0.0)
//! - `RELAY_PORT` - Listen port (default: 8000)
//! - `SLACK_API_BASE` - Slack Web API base URL (default: <https://slack.com/api>)
//! - `SLACK_MAX_REQUEST_AGE_SECS` - Replay window for signed requests (default: 300)
//! - `SLACK_DELIVERY_MAX_ATTEMPTS` - Attempts per outbound message (default: 3)
//! - `SLACK_DELIVERY_BACKOFF_MS` - First retry delay, doubled per attempt (default: 500)
//! - `SLACK_DELIVERY_TAG_ATTEMPTS` - Send the attempt number header on deliveries (default: false)
//! - `OPENAI_API_BASE` - `OpenAI` API base URL (default: <https://api.openai.com/v1>)
//! - `OPENAI_MODEL` - Model used to pick a tool (default: gpt-4o)
//! - `OPENAI_SUMMARY_MODEL` - Model used to summarise errors (default: gpt-4o-mini)
//! - `ERROR_REPORTING_API_BASE` - Cloud Error Reporting base URL
//! - `GCP_ACCESS_TOKEN` - Static bearer token for Error Reporting
//! - `GCP_METADATA_TOKEN_URL` - Metadata server token endpoint (used when no static token)
//! - `HTTP_TIMEOUT_SECS` - Timeout applied to every outbound request (default: 30)
//! - `SHUTDOWN_GRACE_SECS` - Time given to pending replies on shutdown (default: 30)
//! - `LOG_FORMAT` - `text` or `json` (default: text)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";
pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_ERROR_REPORTING_API_BASE: &str =
    "https://clouderrorreporting.googleapis.com/v1beta1";
pub const DEFAULT_METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const DEFAULT_OPENAI_SUMMARY_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MAX_REQUEST_AGE_SECS: u64 = 300;
const DEFAULT_DELIVERY_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_DELIVERY_BACKOFF_MS: u64 = 500;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Relay application configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Slack configuration
    pub slack: SlackConfig,
    /// `OpenAI` configuration
    pub openai: OpenAiConfig,
    /// Cloud Error Reporting configuration
    pub error_reporting: ErrorReportingConfig,
    /// Timeout applied to every outbound HTTP request
    pub http_timeout: Duration,
    /// How long shutdown waits for pending replies
    pub shutdown_grace: Duration,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Slack configuration.
///
/// Implements `Debug` manually to redact secrets.
#[derive(Clone)]
pub struct SlackConfig {
    /// Slack bot token (xoxb-...).
    pub bot_token: SecretString,
    /// Slack app signing secret for webhook verification.
    pub signing_secret: SecretString,
    /// Slack Web API base URL.
    pub api_base: String,
    /// Maximum accepted distance between a request timestamp and now.
    pub max_request_age: Duration,
    /// Retry policy for outbound messages.
    pub delivery: DeliveryPolicy,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &"[REDACTED]")
            .field("signing_secret", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("max_request_age", &self.max_request_age)
            .field("delivery", &self.delivery)
            .finish()
    }
}

/// Bounded retry policy for chat delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each further attempt.
    pub base_backoff: Duration,
    /// Send the 0-based attempt number with each request (for test doubles).
    pub tag_attempts: bool,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_DELIVERY_MAX_ATTEMPTS,
            base_backoff: Duration::from_millis(DEFAULT_DELIVERY_BACKOFF_MS),
            tag_attempts: false,
        }
    }
}

impl DeliveryPolicy {
    /// Delay to wait after the given failed attempt (1-based).
    #[must_use]
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(10);
        self.base_backoff.saturating_mul(1_u32 << shift)
    }
}

/// `OpenAI` API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct OpenAiConfig {
    /// `OpenAI` API key
    pub api_key: SecretString,
    /// API base URL
    pub api_base: String,
    /// Model used for tool selection
    pub model: String,
    /// Model used for structured error summaries
    pub summary_model: String,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("summary_model", &self.summary_model)
            .finish()
    }
}

/// Cloud Error Reporting configuration.
#[derive(Debug, Clone)]
pub struct ErrorReportingConfig {
    /// API base URL (up to and including the version segment)
    pub api_base: String,
    /// Where access tokens come from
    pub credentials: GcpCredentials,
}

/// Source of GCP access tokens.
#[derive(Clone)]
pub enum GcpCredentials {
    /// A fixed bearer token.
    Static(SecretString),
    /// Tokens fetched from the GCE / Cloud Run metadata server.
    MetadataServer {
        /// Token endpoint URL.
        token_url: String,
    },
}

impl std::fmt::Debug for GcpCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(_) => f.debug_tuple("Static").field(&"[REDACTED]").finish(),
            Self::MetadataServer { token_url } => f
                .debug_struct("MetadataServer")
                .field("token_url", token_url)
                .finish(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let host = env
            .get_or_default("RELAY_HOST", "0.0.0.0")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("RELAY_HOST".to_string(), e.to_string()))?;
        let port = env.parse_or_default("RELAY_PORT", 8000_u16)?;

        let slack = SlackConfig::from_env(&env)?;
        let openai = OpenAiConfig::from_env(&env)?;
        let error_reporting = ErrorReportingConfig::from_env(&env)?;

        let http_timeout = Duration::from_secs(
            env.parse_or_default("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?
                .max(1),
        );

        let shutdown_grace = Duration::from_secs(
            env.parse_or_default("SHUTDOWN_GRACE_SECS", DEFAULT_SHUTDOWN_GRACE_SECS)?,
        );

        let log_format = match env.get_or_default("LOG_FORMAT", "text").as_str() {
            "text" => LogFormat::Text,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "LOG_FORMAT".to_string(),
                    format!("expected 'text' or 'json', got '{other}'"),
                ));
            }
        };

        let sentry_dsn = env.get("SENTRY_DSN");
        let sentry_environment = env.get("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = env
            .get("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = env
            .get("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            host,
            port,
            slack,
            openai,
            error_reporting,
            http_timeout,
            shutdown_grace,
            log_format,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl SlackConfig {
    fn from_env<F: Fn(&str) -> Option<String>>(env: &Env<F>) -> Result<Self, ConfigError> {
        let bot_token = env.get_secret("SLACK_BOT_TOKEN")?;
        let signing_secret = env.get_secret("SLACK_SIGNING_SECRET")?;
        let api_base = env.get_url("SLACK_API_BASE", DEFAULT_SLACK_API_BASE)?;

        let max_request_age = Duration::from_secs(
            env.parse_or_default("SLACK_MAX_REQUEST_AGE_SECS", DEFAULT_MAX_REQUEST_AGE_SECS)?,
        );

        let max_attempts =
            env.parse_or_default("SLACK_DELIVERY_MAX_ATTEMPTS", DEFAULT_DELIVERY_MAX_ATTEMPTS)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SLACK_DELIVERY_MAX_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let base_backoff = Duration::from_millis(
            env.parse_or_default("SLACK_DELIVERY_BACKOFF_MS", DEFAULT_DELIVERY_BACKOFF_MS)?,
        );
        let tag_attempts = env.parse_or_default("SLACK_DELIVERY_TAG_ATTEMPTS", false)?;

        Ok(Self {
            bot_token,
            signing_secret,
            api_base,
            max_request_age,
            delivery: DeliveryPolicy {
                max_attempts,
                base_backoff,
                tag_attempts,
            },
        })
    }
}

impl OpenAiConfig {
    fn from_env<F: Fn(&str) -> Option<String>>(env: &Env<F>) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: env.get_secret("OPENAI_API_KEY")?,
            api_base: env.get_url("OPENAI_API_BASE", DEFAULT_OPENAI_API_BASE)?,
            model: env.get_or_default("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            summary_model: env.get_or_default("OPENAI_SUMMARY_MODEL", DEFAULT_OPENAI_SUMMARY_MODEL),
        })
    }
}

impl ErrorReportingConfig {
    fn from_env<F: Fn(&str) -> Option<String>>(env: &Env<F>) -> Result<Self, ConfigError> {
        let api_base = env.get_url("ERROR_REPORTING_API_BASE", DEFAULT_ERROR_REPORTING_API_BASE)?;

        let credentials = match env.get("GCP_ACCESS_TOKEN") {
            Some(token) => GcpCredentials::Static(SecretString::from(token)),
            None => GcpCredentials::MetadataServer {
                token_url: env.get_url("GCP_METADATA_TOKEN_URL", DEFAULT_METADATA_TOKEN_URL)?,
            },
        };

        Ok(Self {
            api_base,
            credentials,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Environment lookup with typed accessors.
struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get an optional variable, treating blank values as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a required variable.
    fn get_required(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to a default when unset.
    fn parse_or_default<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }

    /// Get a base URL, validated and without a trailing slash.
    fn get_url(&self, key: &str, default: &str) -> Result<String, ConfigError> {
        let raw = self.get_or_default(key, default);
        url::Url::parse(&raw)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
        Ok(raw.trim_end_matches('/').to_string())
    }

    /// Load a required secret. Weak-looking secrets are logged, not rejected.
    fn get_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = self.get_required(key)?;
        if let Err(e) = validate_secret_strength(&value, key) {
            tracing::warn!("{key} validation warning: {e}");
        }
        Ok(SecretString::from(value))
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}
