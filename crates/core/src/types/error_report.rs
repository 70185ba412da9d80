//! Error reports produced from Cloud Error Reporting groups.
//!
//! A [`RawError`] is the relay's flattened view of one open error group. The
//! summarisation model turns each into an [`ErrorReport`]. Model output is
//! untrusted, so every report field is optional and the accessors fall back
//! to the [`sentinel`] values instead of failing.

use serde::{Deserialize, Serialize};

/// Placeholder text rendered in place of missing report fields.
pub mod sentinel {
    /// Generic placeholder for summary fields.
    pub const NOT_AVAILABLE: &str = "N/A";
    /// Placeholder for a missing error description.
    pub const NO_DESCRIPTION: &str = "No description provided.";
    /// Placeholder for a missing suggested action.
    pub const NO_ACTION: &str = "No action suggested.";
    /// Placeholder for a missing code snippet.
    pub const NO_CODE: &str = "# No code provided.";
    /// Placeholder for a missing additional tip.
    pub const NO_TIP: &str = "No additional tips.";
}

/// One open error group, flattened for the summarisation prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawError {
    /// Project the group belongs to.
    pub project_id: String,
    /// Full resource name of the group.
    pub group_name: String,
    /// Resolution status (always `OPEN` once filtered).
    pub resolution_status: String,
    /// Number of occurrences in the reporting window.
    pub count: u64,
    /// Services affected by this group, as reported by the API.
    pub affected_services: serde_json::Value,
    /// Service context of the representative event.
    pub service_context: serde_json::Value,
    /// Message of the representative event (usually a stack trace).
    pub error_message: String,
}

impl RawError {
    /// Service name from the representative event's service context.
    #[must_use]
    pub fn service(&self) -> Option<&str> {
        self.service_context_field("service")
    }

    /// Service version from the representative event's service context.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.service_context_field("version")
    }

    /// Monitored resource type from the representative event's service context.
    #[must_use]
    pub fn resource_type(&self) -> Option<&str> {
        self.service_context_field("resourceType")
    }

    fn service_context_field(&self, key: &str) -> Option<&str> {
        self.service_context
            .get(key)
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

/// Summary half of an error report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSummary {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub affected_service: Option<String>,
    #[serde(default)]
    pub service_version: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
}

/// Solution half of an error report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PotentialSolution {
    #[serde(default)]
    pub suggested_action: Option<String>,
    #[serde(default)]
    pub code_snippet: Option<String>,
    #[serde(default)]
    pub additional_tip: Option<String>,
}

/// A model-written summary of one error group plus a proposed fix.
///
/// The wire names (`error_summary`, `potential_solution`) match the JSON
/// schema the summarisation model is asked to fill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    #[serde(rename = "error_summary", default)]
    pub summary: ErrorSummary,
    #[serde(rename = "potential_solution", default)]
    pub solution: PotentialSolution,
}

/// Treat blank strings the same as absent values.
fn present(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.trim().is_empty())
}

impl ErrorSummary {
    #[must_use]
    pub fn project_id(&self) -> &str {
        present(self.project_id.as_ref()).unwrap_or(sentinel::NOT_AVAILABLE)
    }

    #[must_use]
    pub fn affected_service(&self) -> &str {
        present(self.affected_service.as_ref()).unwrap_or(sentinel::NOT_AVAILABLE)
    }

    #[must_use]
    pub fn service_version(&self) -> &str {
        present(self.service_version.as_ref()).unwrap_or(sentinel::NOT_AVAILABLE)
    }

    #[must_use]
    pub fn error_type(&self) -> &str {
        present(self.error_type.as_ref()).unwrap_or(sentinel::NOT_AVAILABLE)
    }

    #[must_use]
    pub fn error_description(&self) -> &str {
        present(self.error_description.as_ref()).unwrap_or(sentinel::NO_DESCRIPTION)
    }

    #[must_use]
    pub fn resource_type(&self) -> &str {
        present(self.resource_type.as_ref()).unwrap_or(sentinel::NOT_AVAILABLE)
    }
}

impl PotentialSolution {
    #[must_use]
    pub fn suggested_action(&self) -> &str {
        present(self.suggested_action.as_ref()).unwrap_or(sentinel::NO_ACTION)
    }

    #[must_use]
    pub fn code_snippet(&self) -> &str {
        present(self.code_snippet.as_ref()).unwrap_or(sentinel::NO_CODE)
    }

    #[must_use]
    pub fn additional_tip(&self) -> &str {
        present(self.additional_tip.as_ref()).unwrap_or(sentinel::NO_TIP)
    }
}

impl ErrorReport {
    /// Build a report straight from the raw group, without model help.
    ///
    /// Used when the summarisation output cannot be parsed, so the group is
    /// still shown to the user.
    #[must_use]
    pub fn from_raw(raw: &RawError) -> Self {
        let description = raw
            .error_message
            .lines()
            .find(|line| !line.trim().is_empty())
            .map(|line| line.trim().to_owned());

        Self {
            summary: ErrorSummary {
                project_id: Some(raw.project_id.clone()),
                affected_service: raw.service().map(String::from),
                service_version: raw.version().map(String::from),
                error_type: None,
                error_description: description,
                resource_type: raw.resource_type().map(String::from),
            },
            solution: PotentialSolution::default(),
        }
    }

    /// Names of required fields that are missing or blank.
    ///
    /// `code_snippet` is optional and never reported.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let s = &self.summary;
        let p = &self.solution;
        [
            ("project_id", &s.project_id),
            ("affected_service", &s.affected_service),
            ("service_version", &s.service_version),
            ("error_type", &s.error_type),
            ("error_description", &s.error_description),
            ("resource_type", &s.resource_type),
            ("suggested_action", &p.suggested_action),
            ("additional_tip", &p.additional_tip),
        ]
        .into_iter()
        .filter(|(_, value)| present(Option::as_ref(value)).is_none())
        .map(|(name, _)| name)
        .collect()
    }

    /// Whether every required field is present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}
