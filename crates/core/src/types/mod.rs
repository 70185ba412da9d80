//! Core types for the ChatOps relay.
//!
//! This module provides type-safe wrappers for the relay's domain concepts.

pub mod error_report;
pub mod id;
pub mod project;
pub mod reply;

pub use error_report::{ErrorReport, ErrorSummary, PotentialSolution, RawError, sentinel};
pub use id::*;
pub use project::{ProjectId, ProjectIdError};
pub use reply::Reply;
