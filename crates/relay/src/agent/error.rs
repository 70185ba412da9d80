//! Dispatcher errors.

use thiserror::Error;

use crate::gcp::ErrorReportingError;
use crate::openai::OpenAiError;

/// Errors that can occur while answering a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The model call failed.
    #[error("OpenAI error: {0}")]
    OpenAi(#[from] OpenAiError),

    /// The Error Reporting query failed.
    #[error("Error Reporting error: {0}")]
    ErrorReporting(#[from] ErrorReportingError),

    /// A prompt could not be rendered.
    #[error("prompt error: {0}")]
    Prompt(String),

    /// The model asked for a tool that was never declared.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The model called a declared tool with unusable arguments.
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments {
        /// Tool name.
        tool: String,
        /// What was wrong with the arguments.
        reason: String,
    },
}

impl DispatchError {
    /// Text to reply with instead of failing, for errors caused by the
    /// model's own output.
    #[must_use]
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            Self::UnknownTool(name) => Some(format!("Function '{name}' not found.")),
            Self::InvalidArguments { tool, reason } => {
                Some(format!("I couldn't run `{tool}`: {reason}"))
            }
            Self::OpenAi(_) | Self::ErrorReporting(_) | Self::Prompt(_) => None,
        }
    }
}

impl From<askama::Error> for DispatchError {
    fn from(err: askama::Error) -> Self {
        Self::Prompt(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics() {
        assert_eq!(
            DispatchError::UnknownTool("delete_project".to_string()).diagnostic(),
            Some("Function 'delete_project' not found.".to_string())
        );
        assert!(
            DispatchError::Prompt("bad".to_string())
                .diagnostic()
                .is_none()
        );
    }
}
