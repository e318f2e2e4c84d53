//! Sora MCP Video Server
//!
//! MCP server for video generation using the OpenAI Sora API.

use anyhow::Result;
use clap::Parser;
use sora_mcp_common::tracing::{DEFAULT_LOG_LEVEL, init_tracing};
use sora_mcp_common::{Config, McpServerBuilder, TransportArgs};
use sora_mcp_video::SoraServer;

/// Command-line arguments for the video server.
#[derive(Parser, Debug)]
#[command(name = "sora-mcp-video")]
#[command(version, about = "MCP server for video generation using OpenAI Sora")]
struct Args {
    /// Transport configuration
    #[command(flatten)]
    transport: TransportArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(DEFAULT_LOG_LEVEL);

    let args = Args::parse();

    let config = Config::from_env()?;
    if config.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; video tools will report an error until it is configured");
    }
    tracing::info!(
        api_base = %config.api_base,
        timeout_secs = config.timeout_secs,
        "Configuration loaded"
    );

    let server = SoraServer::new(config);

    McpServerBuilder::new(server)
        .with_transport(args.transport.into_transport())
        .run()
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
