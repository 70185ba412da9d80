//! Two-phase request handling.
//!
//! Phase 1 asks the model to either answer or call a declared tool. When it
//! calls `get_error_reporting`, phase 2 summarises each open error group
//! into an [`ErrorReport`] with a separate, stateless model call. Only the
//! groups a Slack message can show are summarised; the rest are reported
//! from their raw data.

use chatops_core::{ErrorReport, RawError, Reply};
use tracing::{debug, info, instrument, warn};

use crate::gcp::ErrorReportingClient;
use crate::openai::{
    ChatRequest, JsonSchema, Message, OpenAiClient, ResponseFormat, ResponseMessage,
};
use crate::slack::MAX_REPORTS;

use super::error::DispatchError;
use super::prompts::{error_report_schema, summarize_error_prompt, system_prompt};
use super::tools::{ToolCall, declared_tools};

/// Reply used when the model returns neither text nor a tool call.
const EMPTY_ANSWER: &str = "Sorry, I don't have an answer for that.";

/// Routes user requests through the model and the declared tools.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    openai: OpenAiClient,
    error_reporting: ErrorReportingClient,
}

impl Dispatcher {
    /// Create a dispatcher over the given clients.
    #[must_use]
    pub const fn new(openai: OpenAiClient, error_reporting: ErrorReportingClient) -> Self {
        Self {
            openai,
            error_reporting,
        }
    }

    /// Answer a free-text request.
    ///
    /// Unknown tools and malformed tool arguments are answered with a
    /// diagnostic text instead of an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the model or the Error Reporting API fails, or a
    /// prompt cannot be rendered.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn handle(&self, text: &str) -> Result<Reply, DispatchError> {
        let request = ChatRequest {
            model: self.openai.model().to_string(),
            messages: vec![Message::system(system_prompt()?), Message::user(text)],
            tools: Some(declared_tools()),
            tool_choice: Some("auto".to_string()),
            response_format: None,
        };
        let message = self.openai.complete(&request).await?;

        let Some(call) = message.first_tool_call() else {
            debug!("Model answered without a tool call");
            return Ok(Reply::text(answer_text(message)));
        };

        let tool = match ToolCall::parse(&call.function.name, &call.function.arguments) {
            Ok(tool) => tool,
            Err(err) => {
                return match err.diagnostic() {
                    Some(diagnostic) => {
                        warn!(tool = %call.function.name, error = %err, "Rejected tool call");
                        Ok(Reply::text(diagnostic))
                    }
                    None => Err(err),
                };
            }
        };

        self.execute(tool).await
    }

    async fn execute(&self, tool: ToolCall) -> Result<Reply, DispatchError> {
        info!(tool = tool.name(), "Executing tool");
        match tool {
            ToolCall::GetErrorReporting { project_id } => {
                let raw_errors = self.error_reporting.list_open_errors(&project_id).await?;
                info!(project_id = %project_id, count = raw_errors.len(), "Summarising open errors");

                let mut reports = Vec::with_capacity(raw_errors.len());
                for raw in raw_errors.iter().take(MAX_REPORTS) {
                    reports.push(self.summarize(raw).await?);
                }
                reports.extend(raw_errors.iter().skip(MAX_REPORTS).map(ErrorReport::from_raw));

                Ok(Reply::StructuredResult {
                    project_id,
                    reports,
                })
            }
        }
    }

    /// Summarise one error group. Falls back to a report built from the raw
    /// data when the model call fails or its output cannot be parsed.
    #[instrument(skip(self, raw), fields(group = %raw.group_name))]
    async fn summarize(&self, raw: &RawError) -> Result<ErrorReport, DispatchError> {
        let request = ChatRequest {
            model: self.openai.summary_model().to_string(),
            messages: vec![
                Message::system(system_prompt()?),
                Message::user(summarize_error_prompt(raw)?),
            ],
            tools: None,
            tool_choice: None,
            response_format: Some(ResponseFormat::JsonSchema {
                json_schema: JsonSchema {
                    name: "error_report".to_string(),
                    strict: true,
                    schema: error_report_schema(),
                },
            }),
        };

        let message = match self.openai.complete(&request).await {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "Summary request failed, using raw error");
                return Ok(ErrorReport::from_raw(raw));
            }
        };

        let Some(content) = message.content.as_deref() else {
            warn!(refusal = ?message.refusal, "Summary had no content, using raw error");
            return Ok(ErrorReport::from_raw(raw));
        };

        match serde_json::from_str::<ErrorReport>(strip_code_fence(content)) {
            Ok(report) => {
                if !report.is_complete() {
                    warn!(missing = ?report.missing_fields(), "Summary is missing fields");
                }
                Ok(report)
            }
            Err(err) => {
                warn!(error = %err, "Summary is not a valid error report, using raw error");
                Ok(ErrorReport::from_raw(raw))
            }
        }
    }
}

/// Text of a free-form answer, falling back when the model said nothing.
fn answer_text(message: ResponseMessage) -> String {
    message
        .content
        .or(message.refusal)
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| EMPTY_ANSWER.to_string())
}

/// Remove a surrounding Markdown code fence, if any.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map_or(trimmed, str::trim)
}
