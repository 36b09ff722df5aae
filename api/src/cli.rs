//! # CLI Interface
//!
//! Command-line argument structure for `conduit-api` using `clap`
//! derive. Two subcommands: `serve` and `version`.
//!
//! Every connection parameter is also settable through a `CONDUIT_*`
//! environment variable, which is how container deployments feed it.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use conduit_gateway::config::{GatewayConfig, Timeouts};
use conduit_gateway::error::GatewayResult;

/// CONDUIT gateway API server.
///
/// Exposes chaincode invoke/evaluate over HTTP, load-balancing each
/// request across the configured ledger peers.
#[derive(Parser, Debug)]
#[command(
    name = "conduit-api",
    about = "HTTP gateway for chaincode transactions",
    version,
    propagate_version = true
)]
pub struct ConduitApiCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the CONDUIT API binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the API server.
    Serve(ServeArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `serve` subcommand.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Port to serve the HTTP API on.
    #[arg(long, short = 'p', env = "CONDUIT_PORT", default_value_t = 8080)]
    pub port: u16,

    /// MSP ID of the organization the client identity belongs to.
    #[arg(long = "mspid", env = "CONDUIT_MSP_ID")]
    pub msp_id: String,

    /// Path to the client enrollment certificate (PEM).
    #[arg(long, env = "CONDUIT_CERT")]
    pub cert: PathBuf,

    /// Path to the client private key (PKCS#8 PEM).
    #[arg(long, env = "CONDUIT_KEY")]
    pub key: PathBuf,

    /// Comma-separated list of peer endpoints (host:port).
    #[arg(long, env = "CONDUIT_PEERS")]
    pub peers: String,

    /// Comma-separated list of TLS certificate paths, one per peer, in
    /// the same order as --peers.
    #[arg(long = "tlscerts", env = "CONDUIT_TLS_CERTS")]
    pub tls_certs: String,

    /// Channel name the chaincode is deployed on.
    #[arg(long, env = "CONDUIT_CHANNEL")]
    pub channel: String,

    /// Default chaincode name (requests may override per call).
    #[arg(long, env = "CONDUIT_CHAINCODE")]
    pub chaincode: String,

    /// Timeout for the read-only evaluate phase, in seconds.
    #[arg(long, env = "CONDUIT_EVALUATE_TIMEOUT", default_value_t = 30)]
    pub evaluate_timeout: u64,

    /// Timeout for the endorsement phase, in seconds.
    #[arg(long, env = "CONDUIT_ENDORSE_TIMEOUT", default_value_t = 30)]
    pub endorse_timeout: u64,

    /// Timeout for the ordering-submission phase, in seconds.
    #[arg(long, env = "CONDUIT_SUBMIT_TIMEOUT", default_value_t = 30)]
    pub submit_timeout: u64,

    /// Timeout for the commit-status wait, in seconds. Exceeding this
    /// reports the transaction outcome as unknown, not failed.
    #[arg(long, env = "CONDUIT_COMMIT_TIMEOUT", default_value_t = 30)]
    pub commit_timeout: u64,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "CONDUIT_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

impl ServeArgs {
    /// Builds the validated gateway configuration from the raw flags.
    ///
    /// The comma-separated peer and certificate lists are split here; a
    /// count mismatch or empty list fails with the same `ConfigError` the
    /// library reports, before any server socket is bound.
    pub fn gateway_config(&self) -> GatewayResult<GatewayConfig> {
        let endpoints: Vec<String> = split_csv(&self.peers);
        let tls_certs: Vec<PathBuf> = split_csv(&self.tls_certs)
            .into_iter()
            .map(PathBuf::from)
            .collect();

        GatewayConfig::from_parts(
            &self.msp_id,
            &self.cert,
            &self.key,
            endpoints,
            tls_certs,
            &self.channel,
            &self.chaincode,
            Timeouts {
                evaluate: Duration::from_secs(self.evaluate_timeout),
                endorse: Duration::from_secs(self.endorse_timeout),
                submit: Duration::from_secs(self.submit_timeout),
                commit_status: Duration::from_secs(self.commit_timeout),
            },
        )
    }
}

/// Splits a comma-separated flag value, trimming whitespace and dropping
/// empty segments (a trailing comma should not invent a phantom peer).
fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
