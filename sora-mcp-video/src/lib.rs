//! Sora MCP Video Server Library
//!
//! This library exposes OpenAI Sora video generation as MCP tools.

pub mod handler;
pub mod resources;
pub mod server;

pub use handler::{DownloadOutcome, GenerateVideoParams, ReferenceVideoParams, RemixParams, SoraHandler, VideoJob};
pub use server::SoraServer;
