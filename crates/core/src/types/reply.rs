//! The agent's answer to one user request.

use serde::{Deserialize, Serialize};

use super::error_report::ErrorReport;
use super::project::ProjectId;

/// Result of dispatching a user request.
///
/// The variant tag alone decides how the reply is rendered: plain text is
/// passed through, structured results become a rich message (or a text
/// fallback when empty).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    /// Free-text answer from the model, or a diagnostic string.
    PlainText {
        /// The text to send.
        text: String,
    },
    /// Error reports collected for a project by the error reporting tool.
    StructuredResult {
        /// Project the reports were collected for.
        project_id: ProjectId,
        /// One report per open error group, possibly empty.
        reports: Vec<ErrorReport>,
    },
}

impl Reply {
    /// Create a plain text reply.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::PlainText { text: text.into() }
    }

    /// Whether this is a structured result.
    #[must_use]
    pub const fn is_structured(&self) -> bool {
        matches!(self, Self::StructuredResult { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_serializes_with_kind_tag() {
        let reply = Reply::text("hello");
        let json = serde_json::to_value(&reply).expect("serialize");
        assert_eq!(json["kind"], "plain_text");
        assert_eq!(json["text"], "hello");
        assert!(!reply.is_structured());
    }
}
