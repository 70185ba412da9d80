//! Types for the `OpenAI` Chat Completions API.
//!
//! Only the fields the relay sends or reads are modelled.

use serde::{Deserialize, Serialize};

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in a chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Author role.
    pub role: Role,
    /// Text content.
    pub content: String,
}

impl Message {
    /// System message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// User message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A function the model may call.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    /// Always `function`.
    #[serde(rename = "type")]
    pub tool_type: &'static str,
    /// Function declaration.
    pub function: FunctionDefinition,
}

impl Tool {
    /// Declare a function tool.
    #[must_use]
    pub fn function(name: &str, description: &str, parameters: serde_json::Value) -> Self {
        Self {
            tool_type: "function",
            function: FunctionDefinition {
                name: name.to_string(),
                description: description.to_string(),
                parameters,
            },
        }
    }
}

/// Function declaration.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    /// Function name.
    pub name: String,
    /// What the function does, shown to the model.
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: serde_json::Value,
}

/// Structured output constraint.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Output must validate against the given schema.
    JsonSchema { json_schema: JsonSchema },
}

/// Named JSON Schema for structured output.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSchema {
    /// Schema name.
    pub name: String,
    /// Enforce the schema exactly.
    pub strict: bool,
    /// The schema.
    pub schema: serde_json::Value,
}

/// Request body for `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model to use (e.g., "gpt-4o").
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<Message>,
    /// Functions the model may call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    /// `auto`, `none` or `required`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
    /// Structured output constraint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

/// Response body of `POST /chat/completions`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// Response ID.
    #[serde(default)]
    pub id: Option<String>,
    /// Model that produced the response.
    #[serde(default)]
    pub model: Option<String>,
    /// Completion choices; the relay only reads the first.
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// One completion choice.
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    /// Generated message.
    pub message: ResponseMessage,
    /// Why generation stopped (`stop`, `tool_calls`, ...).
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Assistant message in a response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMessage {
    /// Text content, absent when the model calls a tool.
    #[serde(default)]
    pub content: Option<String>,
    /// Tool invocations requested by the model.
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Refusal message for structured output requests.
    #[serde(default)]
    pub refusal: Option<String>,
}

impl ResponseMessage {
    /// The first requested tool invocation, if any.
    #[must_use]
    pub fn first_tool_call(&self) -> Option<&ToolCall> {
        self.tool_calls.as_deref().and_then(<[ToolCall]>::first)
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    /// Call ID.
    #[serde(default)]
    pub id: String,
    /// Function and arguments.
    pub function: FunctionCall,
}

/// Function name and JSON-encoded arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    /// Function name.
    pub name: String,
    /// Arguments as a JSON string.
    #[serde(default)]
    pub arguments: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "gpt-4o".to_string(),
            messages: vec![Message::system("sys"), Message::user("hi")],
            tools: Some(vec![Tool::function(
                "get_error_reporting",
                "List errors",
                json!({"type": "object"}),
            )]),
            tool_choice: Some("auto".to_string()),
            response_format: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0], json!({"role": "system", "content": "sys"}));
        assert_eq!(json["tools"][0]["type"], "function");
        assert_eq!(json["tools"][0]["function"]["name"], "get_error_reporting");
        assert_eq!(json["tool_choice"], "auto");
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn test_null_tool_calls() {
        let message: ResponseMessage =
            serde_json::from_value(json!({"content": "hi", "tool_calls": null})).unwrap();
        assert!(message.first_tool_call().is_none());
    }

    #[test]
    fn test_response_format_serialization() {
        let format = ResponseFormat::JsonSchema {
            json_schema: JsonSchema {
                name: "error_report".to_string(),
                strict: true,
                schema: json!({"type": "object"}),
            },
        };
        let json = serde_json::to_value(format).unwrap();
        assert_eq!(json["type"], "json_schema");
        assert_eq!(json["json_schema"]["name"], "error_report");
        assert_eq!(json["json_schema"]["strict"], true);
    }

    #[test]
    fn test_tool_call_response() {
        let response: ChatResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "get_error_reporting",
                            "arguments": "{\"project_id\":\"proj-1\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();

        let message = &response.choices[0].message;
        assert!(message.content.is_none());
        let call = message.first_tool_call().unwrap();
        assert_eq!(call.function.name, "get_error_reporting");
        assert_eq!(call.function.arguments, r#"{"project_id":"proj-1"}"#);
    }
}
