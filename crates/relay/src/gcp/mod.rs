//! Google Cloud integration.
//!
//! - [`ErrorReportingClient`] lists open error groups for a project
//! - [`TokenProvider`] supplies bearer tokens from config or the metadata server

mod client;
mod error;
mod token;

pub use client::ErrorReportingClient;
pub use error::ErrorReportingError;
pub use token::TokenProvider;
