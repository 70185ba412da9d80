//! Prompt templates and the structured output schema.

use askama::Template;
use chatops_core::RawError;
use serde_json::json;

use super::error::DispatchError;

/// System preamble shared by both phases.
#[derive(Template)]
#[template(path = "prompts/system.txt")]
struct SystemPrompt;

/// Instruction for summarising one error group.
#[derive(Template)]
#[template(path = "prompts/summarize_error.txt")]
struct SummarizeErrorPrompt<'a> {
    error_json: &'a str,
}

/// Render the system preamble.
///
/// # Errors
///
/// Returns `Prompt` if the template fails to render.
pub fn system_prompt() -> Result<String, DispatchError> {
    Ok(SystemPrompt.render()?)
}

/// Render the summarisation instruction for one raw error.
///
/// # Errors
///
/// Returns `Prompt` if the error cannot be serialized or the template fails.
pub fn summarize_error_prompt(raw: &RawError) -> Result<String, DispatchError> {
    let error_json =
        serde_json::to_string_pretty(raw).map_err(|e| DispatchError::Prompt(e.to_string()))?;
    Ok(SummarizeErrorPrompt {
        error_json: &error_json,
    }
    .render()?)
}

/// JSON Schema of an error report, in the strict structured-output dialect
/// (every property required, `null` allowed where a value is optional).
#[must_use]
pub fn error_report_schema() -> serde_json::Value {
    let text = json!({"type": "string"});
    json!({
        "type": "object",
        "properties": {
            "error_summary": {
                "type": "object",
                "properties": {
                    "project_id": text,
                    "affected_service": text,
                    "service_version": text,
                    "error_type": text,
                    "error_description": text,
                    "resource_type": text
                },
                "required": [
                    "project_id",
                    "affected_service",
                    "service_version",
                    "error_type",
                    "error_description",
                    "resource_type"
                ],
                "additionalProperties": false
            },
            "potential_solution": {
                "type": "object",
                "properties": {
                    "suggested_action": text,
                    "code_snippet": {"type": ["string", "null"]},
                    "additional_tip": text
                },
                "required": ["suggested_action", "code_snippet", "additional_tip"],
                "additionalProperties": false
            }
        },
        "required": ["error_summary", "potential_solution"],
        "additionalProperties": false
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_mentions_tool() {
        let prompt = system_prompt().unwrap();
        assert!(prompt.contains("get_error_reporting"));
    }

    #[test]
    fn test_summarize_prompt_embeds_error_unescaped() {
        let raw = RawError {
            project_id: "proj-1".to_string(),
            group_name: "projects/proj-1/groups/g1".to_string(),
            resolution_status: "OPEN".to_string(),
            count: 4,
            affected_services: json!([]),
            service_context: json!({"service": "api"}),
            error_message: "ValueError: x < 0 & y > 1".to_string(),
        };

        let prompt = summarize_error_prompt(&raw).unwrap();
        assert!(prompt.contains("\"group_name\": \"projects/proj-1/groups/g1\""));
        assert!(prompt.contains("x < 0 & y > 1"));
    }

    #[test]
    fn test_schema_requires_every_field() {
        let schema = error_report_schema();
        let summary = &schema["properties"]["error_summary"];
        assert_eq!(
            summary["required"].as_array().unwrap().len(),
            summary["properties"].as_object().unwrap().len()
        );
        assert_eq!(
            schema["properties"]["potential_solution"]["properties"]["code_snippet"]["type"][1],
            "null"
        );
    }
}
