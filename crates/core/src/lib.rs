//! ChatOps Core - Shared types library.
//!
//! This crate provides the domain types used across the ChatOps components:
//! - `relay` - Slack webhook service that answers requests via a tool-calling model
//! - `cli` - Operator tooling for running the agent locally and signing test payloads
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and lets the formatter and dispatcher share one vocabulary.
//!
//! # Modules
//!
//! - [`types`] - Slack identifiers, GCP project ids, error reports and agent replies

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
