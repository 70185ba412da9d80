//! `OpenAI` Chat Completions integration.
//!
//! Used by the agent for tool selection and for structured error summaries.

mod client;
mod error;
mod types;

pub use client::OpenAiClient;
pub use error::OpenAiError;
pub use types::{
    ChatRequest, ChatResponse, Choice, FunctionCall, FunctionDefinition, JsonSchema, Message,
    ResponseFormat, ResponseMessage, Role, Tool, ToolCall,
};
