//! Cloud Error Reporting errors.

use thiserror::Error;

/// Errors that can occur when querying Cloud Error Reporting.
#[derive(Debug, Error)]
pub enum ErrorReportingError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("Error Reporting API returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
    },

    /// Failed to parse a response.
    #[error("parse error: {0}")]
    Parse(String),

    /// No access token could be obtained.
    #[error("failed to obtain GCP access token: {0}")]
    Token(String),

    /// A request URL could not be built.
    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}
