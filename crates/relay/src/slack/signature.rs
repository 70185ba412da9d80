//! Slack request signature verification.
//!
//! Slack signs every webhook with HMAC-SHA256 over `v0:{timestamp}:{body}`
//! using the app's signing secret, and sends the result as
//! `X-Slack-Signature: v0={hex}` next to `X-Slack-Request-Timestamp`.
//!
//! See: <https://api.slack.com/authentication/verifying-requests-from-slack>

use std::time::Duration;

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the request signature.
pub const SIGNATURE_HEADER: &str = "x-slack-signature";
/// Header carrying the unix timestamp the request was signed at.
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
/// Signature scheme version prefix.
const VERSION: &str = "v0";

/// Reasons a signed request is rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    /// Signature or timestamp header is absent or not valid text.
    #[error("missing signature or timestamp header")]
    MissingCredentials,

    /// Timestamp header is not an integer.
    #[error("request timestamp is not a unix timestamp")]
    InvalidTimestamp,

    /// Timestamp is outside the replay window.
    #[error("request timestamp is {age_secs}s from now")]
    StaleRequest {
        /// Distance between the request timestamp and now, in seconds.
        age_secs: u64,
    },

    /// Signature does not match the body.
    #[error("signature mismatch")]
    InvalidSignature,
}

/// Verifies Slack request signatures against a shared signing secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    signing_secret: SecretString,
    max_age: Duration,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("signing_secret", &"[REDACTED]")
            .field("max_age", &self.max_age)
            .finish()
    }
}

impl SignatureVerifier {
    /// Create a verifier accepting requests signed at most `max_age` from now.
    #[must_use]
    pub const fn new(signing_secret: SecretString, max_age: Duration) -> Self {
        Self {
            signing_secret,
            max_age,
        }
    }

    /// Verify a request's headers and raw body at time `now` (unix seconds).
    ///
    /// # Errors
    ///
    /// Returns the first check that failed. Checks run in order: headers
    /// present, timestamp fresh, signature matches.
    pub fn verify(&self, headers: &HeaderMap, body: &[u8], now: i64) -> Result<(), SignatureError> {
        let timestamp = headers
            .get(TIMESTAMP_HEADER)
            .and_then(|v| v.to_str().ok());
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok());

        self.verify_parts(timestamp, signature, body, now)
    }

    /// Verify already-extracted header values.
    ///
    /// # Errors
    ///
    /// See [`SignatureVerifier::verify`].
    pub fn verify_parts(
        &self,
        timestamp: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
        now: i64,
    ) -> Result<(), SignatureError> {
        let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
            return Err(SignatureError::MissingCredentials);
        };

        let signed_at: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| SignatureError::InvalidTimestamp)?;

        let age_secs = now.abs_diff(signed_at);
        if age_secs > self.max_age.as_secs() {
            return Err(SignatureError::StaleRequest { age_secs });
        }

        let expected = signature
            .strip_prefix(VERSION)
            .and_then(|rest| rest.strip_prefix('='))
            .and_then(|hex_sig| hex::decode(hex_sig).ok())
            .ok_or(SignatureError::InvalidSignature)?;

        // verify_slice compares in constant time
        self.mac(timestamp.trim(), body)?
            .verify_slice(&expected)
            .map_err(|_| SignatureError::InvalidSignature)
    }

    /// Boolean form of [`SignatureVerifier::verify`]; fails closed.
    #[must_use]
    pub fn is_valid(&self, headers: &HeaderMap, body: &[u8], now: i64) -> bool {
        self.verify(headers, body, now).is_ok()
    }

    /// Compute the `v0=...` signature Slack would send for this body.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSignature` if the MAC cannot be keyed.
    pub fn sign(&self, timestamp: i64, body: &[u8]) -> Result<String, SignatureError> {
        let mac = self.mac(&timestamp.to_string(), body)?;
        Ok(format!("{VERSION}={}", hex::encode(mac.finalize().into_bytes())))
    }

    fn mac(&self, timestamp: &str, body: &[u8]) -> Result<HmacSha256, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(self.signing_secret.expose_secret().as_bytes())
            .map_err(|_| SignatureError::InvalidSignature)?;
        mac.update(VERSION.as_bytes());
        mac.update(b":");
        mac.update(timestamp.as_bytes());
        mac.update(b":");
        mac.update(body);
        Ok(mac)
    }
}
