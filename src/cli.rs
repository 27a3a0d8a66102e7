//! Command line interface for the `chainwire` binary.
//!
//! Connects to a node, runs one call and prints the JSON result. The
//! definition is shared with the build script, which renders it as a man
//! page, so it depends on nothing but `clap`.

use std::net::SocketAddr;

use clap::Parser;

/// Command line arguments for the `chainwire` binary.
#[derive(Debug, Parser)]
#[command(
    name = "chainwire",
    version,
    about = "Run one RPC call against a Graphene-style node"
)]
pub struct Cli {
    /// Websocket address of the node.
    #[arg(short, long, default_value = "ws://127.0.0.1:8090")]
    pub url: String,
    /// API to request during the handshake. Repeat for several; defaults to
    /// every API.
    #[arg(short = 'a', long = "api", value_name = "API")]
    pub apis: Vec<String>,
    /// Connection and call timeout in milliseconds.
    #[arg(long, default_value_t = 5000)]
    pub timeout_ms: u64,
    /// Reconnect attempts after the node closes the connection.
    #[arg(long, default_value_t = 5)]
    pub max_retries: u32,
    /// Log every frame sent and received.
    #[arg(long)]
    pub debug: bool,
    /// Serve Prometheus metrics on this address while the call runs.
    #[arg(long, value_name = "ADDR")]
    pub metrics_addr: Option<SocketAddr>,
    /// API that owns the method.
    #[arg(value_name = "TARGET_API")]
    pub target: String,
    /// Method to call.
    pub method: String,
    /// Method parameters as a JSON array.
    #[arg(default_value = "[]")]
    pub params: String,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;

    #[test]
    fn parses_repeated_apis_and_positionals() {
        let cli = Cli::parse_from([
            "chainwire",
            "--api",
            "database",
            "-a",
            "history",
            "database",
            "get_block",
            "[1]",
        ]);
        assert_eq!(cli.apis, ["database", "history"]);
        assert_eq!(cli.target, "database");
        assert_eq!(cli.method, "get_block");
        assert_eq!(cli.params, "[1]");
        assert_eq!(cli.timeout_ms, 5000);
    }

    #[test]
    fn params_default_to_an_empty_array() {
        let cli = Cli::parse_from(["chainwire", "database", "get_chain_properties"]);
        assert_eq!(cli.params, "[]");
        assert!(cli.apis.is_empty());
        assert!(cli.metrics_addr.is_none());
    }
}
