//! Sora MCP Common Library
//!
//! Configuration, error handling, input validation, tracing and transport
//! plumbing shared by the Sora MCP server.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod error;
pub mod server;
pub mod tracing;
pub mod transport;
pub mod validation;

#[cfg(test)]
mod config_test;
#[cfg(test)]
mod transport_test;
#[cfg(test)]
mod validation_test;

pub use config::Config;
pub use error::{ConfigError, Error, Result};
pub use server::{McpServerBuilder, ServerError, shutdown_channel};
pub use transport::{Transport, TransportArgs, TransportMode};
pub use validation::{FileMetadata, ParamsValidation, ValidationResult, VideoParams};
