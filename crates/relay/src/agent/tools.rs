//! Tools the model may call.
//!
//! The set is closed: every declared tool is a [`ToolCall`] variant with a
//! typed argument struct, and dispatch is a single match.

use chatops_core::ProjectId;
use serde::Deserialize;
use serde_json::json;

use crate::openai::Tool;

use super::error::DispatchError;

/// Name of the Error Reporting tool.
pub const GET_ERROR_REPORTING: &str = "get_error_reporting";

/// A validated tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    /// List the open error groups of a project.
    GetErrorReporting {
        /// Project to query.
        project_id: ProjectId,
    },
}

#[derive(Deserialize)]
struct GetErrorReportingArgs {
    project_id: ProjectId,
}

impl ToolCall {
    /// Parse a tool invocation from the model's function name and
    /// JSON-encoded arguments.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTool` for undeclared names and `InvalidArguments`
    /// when the arguments do not match the tool's schema.
    pub fn parse(name: &str, arguments: &str) -> Result<Self, DispatchError> {
        match name {
            GET_ERROR_REPORTING => {
                let args: GetErrorReportingArgs =
                    serde_json::from_str(arguments).map_err(|e| DispatchError::InvalidArguments {
                        tool: name.to_string(),
                        reason: e.to_string(),
                    })?;
                Ok(Self::GetErrorReporting {
                    project_id: args.project_id,
                })
            }
            other => Err(DispatchError::UnknownTool(other.to_string())),
        }
    }

    /// The tool's declared name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GetErrorReporting { .. } => GET_ERROR_REPORTING,
        }
    }
}

/// Declarations of every tool, as sent to the model.
#[must_use]
pub fn declared_tools() -> Vec<Tool> {
    vec![Tool::function(
        GET_ERROR_REPORTING,
        "List the open errors reported in Cloud Error Reporting for a GCP project, with a summary and a suggested fix for each.",
        json!({
            "type": "object",
            "properties": {
                "project_id": {
                    "type": "string",
                    "description": "The GCP project ID, e.g. 'my-project-123'."
                }
            },
            "required": ["project_id"],
            "additionalProperties": false
        }),
    )]
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_reporting_call() {
        let call = ToolCall::parse(GET_ERROR_REPORTING, r#"{"project_id":"proj-1"}"#).unwrap();
        assert_eq!(
            call,
            ToolCall::GetErrorReporting {
                project_id: ProjectId::parse("proj-1").unwrap()
            }
        );
        assert_eq!(call.name(), GET_ERROR_REPORTING);
    }

    #[test]
    fn test_parse_unknown_tool() {
        let err = ToolCall::parse("get_error_reporting_gcp", "{}").unwrap_err();
        assert!(matches!(err, DispatchError::UnknownTool(name) if name == "get_error_reporting_gcp"));
    }

    #[test]
    fn test_parse_invalid_arguments() {
        for args in ["", "{}", r#"{"project_id": 7}"#, r#"{"project_id": "../../etc"}"#] {
            let err = ToolCall::parse(GET_ERROR_REPORTING, args).unwrap_err();
            assert!(
                matches!(err, DispatchError::InvalidArguments { .. }),
                "arguments {args:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_declared_tools_require_project_id() {
        let tools = declared_tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].function.name, GET_ERROR_REPORTING);
        assert_eq!(tools[0].function.parameters["required"][0], "project_id");
    }
}
