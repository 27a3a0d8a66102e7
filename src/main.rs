//! Command line client for Graphene-style nodes.
//!
//! Parses CLI arguments, runs one call and prints the result.

mod cli;

use std::{error::Error, process::ExitCode, time::Duration};

use chainwire::{ApiName, Client, ConnectionOptions};
use clap::Parser;
use serde_json::Value;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    tokio::select! {
        result = run(cli) => match result {
            Ok(value) => {
                println!("{value:#}");
                ExitCode::SUCCESS
            }
            Err(error) => {
                eprintln!("error: {error}");
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: cli::Cli) -> Result<Value, Box<dyn Error>> {
    install_metrics(&cli)?;
    let target: ApiName = cli.target.parse()?;
    let params: Vec<Value> = serde_json::from_str(&cli.params)?;
    let mut options = ConnectionOptions::default()
        .connection_timeout(Duration::from_millis(cli.timeout_ms))
        .max_retries(cli.max_retries)
        .debug(cli.debug);
    if !cli.apis.is_empty() {
        options = options.api_names(cli.apis);
    }

    let client = Client::new();
    client.connect(&cli.url, options).await?;
    let result = client.api(target).exec(cli.method, params).await;
    if let Err(error) = client.close().await {
        warn!(%error, "failed to close connection");
    }
    Ok(result?)
}

#[cfg(feature = "metrics")]
fn install_metrics(cli: &cli::Cli) -> Result<(), Box<dyn Error>> {
    if let Some(addr) = cli.metrics_addr {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!(%addr, "serving metrics");
    }
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn install_metrics(cli: &cli::Cli) -> Result<(), Box<dyn Error>> {
    if cli.metrics_addr.is_some() {
        warn!("built without the metrics feature; ignoring --metrics-addr");
    }
    Ok(())
}
