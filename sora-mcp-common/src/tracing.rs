//! Tracing initialization for the Sora MCP server.
//!
//! Log output always goes to stderr: with the stdio transport, stdout
//! carries the MCP JSON-RPC stream and must not be interleaved with logs.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls the log level and filtering. Examples:
//!   - `RUST_LOG=debug` - Enable debug logging for all modules
//!   - `RUST_LOG=sora_mcp_video=debug` - Enable debug for the server crate
//!   - `RUST_LOG=warn,sora_mcp_common=debug` - Warn by default, debug for common

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

/// Default filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Registry with the `RUST_LOG` filter and a plain-text stderr layer.
fn subscriber(default_level: &str) -> impl ::tracing::Subscriber + Send + Sync + 'static {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(fmt_layer)
}

/// Initialize the global tracing subscriber.
///
/// Filtering comes from `RUST_LOG`, falling back to `default_level`.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
///
/// ```no_run
/// use sora_mcp_common::tracing::init_tracing;
///
/// init_tracing("info");
/// tracing::info!("Server starting");
/// ```
pub fn init_tracing(default_level: &str) {
    subscriber(default_level).init();
}

/// Try to initialize tracing, returning `false` if a subscriber was
/// already set.
///
/// Safe to call from tests that may run in any order.
pub fn try_init_tracing() -> bool {
    subscriber(DEFAULT_LOG_LEVEL).try_init().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_try_init_tracing_does_not_panic() {
        // First call may or may not win depending on test order; a second
        // call must always report the subscriber as already set.
        let _ = try_init_tracing();
        assert!(!try_init_tracing());
    }

    #[test]
    fn test_default_level_is_info() {
        let filter = EnvFilter::new(DEFAULT_LOG_LEVEL);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_module_directive_raises_max_level() {
        let filter = EnvFilter::new("warn,sora_mcp_common=debug");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }
}
