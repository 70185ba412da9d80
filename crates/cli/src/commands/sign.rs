//! Sign a webhook payload for manual testing.
//!
//! # Usage
//!
//! ```bash
//! chatops-cli sign --body event.json
//! curl -X POST localhost:8000/slack/events \
//!   -H "X-Slack-Request-Timestamp: ..." -H "X-Slack-Signature: ..." \
//!   --data-binary @event.json
//! ```
//!
//! # Environment Variables
//!
//! - `SLACK_SIGNING_SECRET` - Slack app signing secret

use std::path::Path;
use std::time::Duration;

use chatops_relay::slack::{SignatureError, SignatureVerifier};
use secrecy::SecretString;
use thiserror::Error;

/// Errors that can occur while signing.
#[derive(Debug, Error)]
pub enum SignError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Body file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path of the body file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Signing failed.
    #[error("Signing failed: {0}")]
    Signature(#[from] SignatureError),
}

/// Print the signature header pair for the body in `path`.
///
/// # Errors
///
/// Returns an error if the secret is unset or the file cannot be read.
#[allow(clippy::print_stdout)]
pub fn run(path: &Path, timestamp: Option<i64>) -> Result<(), SignError> {
    dotenvy::dotenv().ok();

    let secret = std::env::var("SLACK_SIGNING_SECRET")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .ok_or(SignError::MissingEnvVar("SLACK_SIGNING_SECRET"))?;
    let body = std::fs::read(path).map_err(|source| SignError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let timestamp = timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp());

    for (name, value) in signature_headers(SecretString::from(secret), timestamp, &body)? {
        println!("{name}: {value}");
    }
    Ok(())
}

/// Header name/value pairs authenticating `body` at `timestamp`.
///
/// # Errors
///
/// Returns an error if the secret cannot key the MAC.
pub fn signature_headers(
    secret: SecretString,
    timestamp: i64,
    body: &[u8],
) -> Result<[(&'static str, String); 2], SignError> {
    // The window only matters when verifying.
    let verifier = SignatureVerifier::new(secret, Duration::ZERO);
    let signature = verifier.sign(timestamp, body)?;
    Ok([
        ("X-Slack-Request-Timestamp", timestamp.to_string()),
        ("X-Slack-Signature", signature),
    ])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_verify_against_relay() {
        let secret = "8f742231b10e8888abcd99yyyzzz85a5";
        let body = br#"{"type":"url_verification","challenge":"abc"}"#;
        let [(ts_name, ts), (sig_name, sig)] =
            signature_headers(SecretString::from(secret.to_string()), 1_700_000_000, body)
                .unwrap();

        assert_eq!(ts_name, "X-Slack-Request-Timestamp");
        assert_eq!(ts, "1700000000");
        assert_eq!(sig_name, "X-Slack-Signature");
        assert!(sig.starts_with("v0="));

        let verifier =
            SignatureVerifier::new(SecretString::from(secret.to_string()), Duration::from_secs(300));
        assert!(
            verifier
                .verify_parts(Some(ts.as_str()), Some(sig.as_str()), body, 1_700_000_010)
                .is_ok()
        );
    }
}
