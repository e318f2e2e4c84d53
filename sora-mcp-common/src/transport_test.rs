//! Unit tests for transport configuration.

use clap::Parser;

use super::transport::{Transport, TransportArgs, TransportMode};

#[derive(Parser, Debug)]
struct TestCli {
    #[command(flatten)]
    transport: TransportArgs,
}

#[test]
fn test_transport_default_is_stdio() {
    let transport = Transport::default();
    assert!(transport.is_stdio());
    assert_eq!(transport.port(), None);
    assert_eq!(transport.to_string(), "stdio");
}

#[test]
fn test_transport_http_constructor() {
    let transport = Transport::http(3000);
    assert!(!transport.is_stdio());
    assert_eq!(transport.port(), Some(3000));
    assert_eq!(transport.to_string(), "http (port 3000)");
}

#[test]
fn test_transport_args_default() {
    let args = TransportArgs::default();
    assert_eq!(args.transport, TransportMode::Stdio);
    assert_eq!(args.port, 8080);
}

#[test]
fn test_transport_args_into_transport_stdio_ignores_port() {
    let args = TransportArgs {
        transport: TransportMode::Stdio,
        port: 9000,
    };
    assert_eq!(args.into_transport(), Transport::Stdio);
}

#[test]
fn test_transport_args_into_transport_http() {
    let args = TransportArgs {
        transport: TransportMode::Http,
        port: 3000,
    };
    assert_eq!(args.into_transport(), Transport::Http { port: 3000 });
}

#[test]
fn test_cli_parses_http_with_port() {
    let cli = TestCli::try_parse_from(["sora-mcp-video", "--transport", "HTTP", "--port", "9123"]).unwrap();
    assert_eq!(cli.transport.into_transport(), Transport::http(9123));
}

#[test]
fn test_cli_rejects_unknown_transport() {
    let result = TestCli::try_parse_from(["sora-mcp-video", "--transport", "carrier-pigeon"]);
    assert!(result.is_err());
}
