//! Slack integration.
//!
//! This module provides:
//! - [`SignatureVerifier`] for authenticating inbound webhooks
//! - Events API and Block Kit types
//! - [`format_reply`] for turning agent replies into messages
//! - [`SlackClient`] for delivering messages with bounded retries
//!
//! # Flow
//!
//! 1. Slack posts an event to `/slack/events`; the signature is verified
//! 2. Qualifying messages are handed to the agent in the background
//! 3. The reply is formatted and posted back to the originating channel

mod client;
mod error;
mod messages;
mod signature;
mod types;

pub use client::{RETRY_ATTEMPT_HEADER, SlackClient};
pub use error::SlackError;
pub use messages::{
    MAX_BLOCKS, MAX_REPORTS, MAX_SECTION_TEXT, error_report_blocks, format_reply, no_errors_text,
};
pub use signature::{SIGNATURE_HEADER, SignatureError, SignatureVerifier, TIMESTAMP_HEADER};
pub use types::{
    Ack, Block, EventPayload, EventType, InboundEvent, OutboundMessage, PostMessage,
    PostMessageResponse, Text,
};
