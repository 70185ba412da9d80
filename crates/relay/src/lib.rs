//! ChatOps relay library.
//!
//! Receives Slack Events API webhooks, verifies them, and answers user
//! messages with a tool-calling model that can list the open errors of a
//! GCP project. The library form lets the binary, the CLI and the
//! integration tests share one router and one set of clients.
//!
//! # Security
//!
//! The relay holds three credentials: the Slack bot token, the `OpenAI` key
//! and a GCP access token (static or from the metadata server). Inbound
//! requests are only trusted after their HMAC signature and timestamp are
//! checked.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod agent;
pub mod config;
pub mod error;
pub mod gcp;
pub mod openai;
pub mod routes;
pub mod services;
pub mod slack;
pub mod state;

pub use routes::app;
pub use state::AppState;
