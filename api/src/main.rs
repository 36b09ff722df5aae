// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # CONDUIT API Server
//!
//! Entry point for the `conduit-api` binary. Parses CLI arguments,
//! initializes logging and metrics, constructs the gateway client, and
//! serves the HTTP API.
//!
//! The binary supports two subcommands:
//!
//! - `serve`   — start the HTTP gateway
//! - `version` — print build version information
//!
//! All configuration is validated before the listener binds: a count
//! mismatch between peers and TLS certificates, an unreadable identity
//! file, or an empty peer list kills the process at startup rather than
//! surfacing one request at a time.

mod cli;
mod logging;
mod metrics;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use cli::{Commands, ConduitApiCli};
use conduit_gateway::GatewayClient;
use logging::LogFormat;
use metrics::ApiMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ConduitApiCli::parse();

    match cli.command {
        Commands::Serve(args) => run_server(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the HTTP gateway: validates configuration, builds the client,
/// and serves until interrupted.
async fn run_server(args: cli::ServeArgs) -> Result<()> {
    logging::init_logging(
        logging::DEFAULT_DIRECTIVES,
        LogFormat::from_str_lossy(&args.log_format),
    );

    let config = args
        .gateway_config()
        .context("invalid gateway configuration")?;

    tracing::info!(
        msp_id = %config.msp_id,
        channel = %config.channel_name,
        chaincode = %config.chaincode_name,
        peers = config.peers.len(),
        "starting conduit-api"
    );

    // Loads and validates the signing identity once, up front. A broken
    // certificate or key is a startup failure, not a request failure.
    let client = Arc::new(GatewayClient::new(config).context("failed to build gateway client")?);

    let state = server::AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        client,
        metrics: Arc::new(ApiMetrics::new()),
    };
    let router = server::create_router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind listener on {addr}"))?;
    tracing::info!("API server listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    tracing::info!("conduit-api stopped");
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("conduit-api {}", env!("CARGO_PKG_VERSION"));
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
