//! The tool-calling agent behind the relay.
//!
//! [`Dispatcher::handle`] turns a user's message into a [`chatops_core::Reply`]:
//! either the model's own answer or the result of a declared tool.

mod dispatcher;
mod error;
mod prompts;
mod tools;

pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use prompts::{error_report_schema, summarize_error_prompt, system_prompt};
pub use tools::{GET_ERROR_REPORTING, ToolCall, declared_tools};
