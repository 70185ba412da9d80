//! Business logic behind the webhook.
//!
//! # Services
//!
//! - `intake` - Decides which verified events are acted on
//! - `pipeline` - Background dispatch, formatting and delivery of a reply

pub mod intake;
pub mod pipeline;

pub use intake::{Intake, Job, classify};
pub use pipeline::{Draining, FAILURE_TEXT, PipelineTasks, process_event};
