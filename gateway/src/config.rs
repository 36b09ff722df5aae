//! # Gateway Configuration
//!
//! The immutable configuration struct the client is constructed from.
//! There is deliberately no global, mutable, or lazily-initialized
//! configuration state anywhere in this crate: the boundary layer parses
//! whatever it parses (flags, environment), builds one [`GatewayConfig`],
//! and hands it to [`crate::client::GatewayClient::new`]. After that the
//! configuration is plain shared data.
//!
//! Validation happens here, once, at startup. Count mismatches between
//! peer endpoints and TLS certificates are a fatal configuration error —
//! catching that at runtime, one unlucky request at a time, would be
//! strictly worse.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{GatewayError, GatewayResult};
use crate::registry::PeerEndpoint;
use crate::select::QUARANTINE_THRESHOLD;

// ---------------------------------------------------------------------------
// Timeouts
// ---------------------------------------------------------------------------

/// Default bound for each protocol phase.
pub const DEFAULT_PHASE_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on connection establishment, separate from the protocol
/// phases — a peer that cannot finish a TLS handshake in this window is
/// treated as down.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Independent per-phase timeouts for the transaction protocol.
///
/// Each phase gets its own budget rather than one shared deadline: a slow
/// endorsement should not eat into the time allowed for commit
/// confirmation. The commit-status bound is special — exceeding it yields
/// [`GatewayError::CommitTimeout`], not an ordinary failure, because the
/// ledger write may already have happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeouts {
    /// Read-only query phase (the whole of an evaluate call).
    pub evaluate: Duration,
    /// Proposal endorsement phase of a submit.
    pub endorse: Duration,
    /// Handing the endorsed envelope to the ordering service.
    pub submit: Duration,
    /// Waiting for the commit confirmation.
    pub commit_status: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            evaluate: DEFAULT_PHASE_TIMEOUT,
            endorse: DEFAULT_PHASE_TIMEOUT,
            submit: DEFAULT_PHASE_TIMEOUT,
            commit_status: DEFAULT_PHASE_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Everything the gateway client needs, fixed at construction.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Organization (MSP) identifier the identity is enrolled under.
    pub msp_id: String,
    /// Path to the client's PEM enrollment certificate.
    pub cert_path: PathBuf,
    /// Path to the client's PKCS#8 PEM private key.
    pub key_path: PathBuf,
    /// Configured peers, in order. Never empty once validated.
    pub peers: Vec<PeerEndpoint>,
    /// Channel the target chaincode is deployed on.
    pub channel_name: String,
    /// Default chaincode name; individual calls may name another.
    pub chaincode_name: String,
    /// Per-phase protocol timeouts.
    pub timeouts: Timeouts,
    /// Consecutive transport failures before a peer stops receiving
    /// traffic (see [`crate::select`]). `u32::MAX` disables quarantining,
    /// leaving selection purely uniform.
    pub quarantine_threshold: u32,
}

impl GatewayConfig {
    /// Builds a configuration from parallel endpoint and certificate-path
    /// lists, enforcing the count invariant.
    ///
    /// This mirrors how the configuration arrives from the CLI: two
    /// comma-separated lists that must line up one-to-one.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        msp_id: impl Into<String>,
        cert_path: impl Into<PathBuf>,
        key_path: impl Into<PathBuf>,
        endpoints: Vec<String>,
        tls_cert_paths: Vec<PathBuf>,
        channel_name: impl Into<String>,
        chaincode_name: impl Into<String>,
        timeouts: Timeouts,
    ) -> GatewayResult<Self> {
        if endpoints.len() != tls_cert_paths.len() {
            return Err(GatewayError::Config(format!(
                "number of peer endpoints ({}) must match number of TLS certificates ({})",
                endpoints.len(),
                tls_cert_paths.len()
            )));
        }

        let peers = endpoints
            .into_iter()
            .zip(tls_cert_paths)
            .map(|(endpoint, cert)| PeerEndpoint::new(endpoint.trim(), cert))
            .collect();

        let config = Self {
            msp_id: msp_id.into(),
            cert_path: cert_path.into(),
            key_path: key_path.into(),
            peers,
            channel_name: channel_name.into(),
            chaincode_name: chaincode_name.into(),
            timeouts,
            quarantine_threshold: QUARANTINE_THRESHOLD,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants that make the rest of the crate panic-free:
    /// non-empty peer list, non-empty identifiers.
    pub fn validate(&self) -> GatewayResult<()> {
        if self.peers.is_empty() {
            return Err(GatewayError::Config(
                "at least one peer must be configured".into(),
            ));
        }
        for (field, value) in [
            ("msp_id", &self.msp_id),
            ("channel_name", &self.channel_name),
            ("chaincode_name", &self.chaincode_name),
        ] {
            if value.trim().is_empty() {
                return Err(GatewayError::Config(format!("{field} must not be empty")));
            }
        }
        if let Some(peer) = self.peers.iter().find(|p| p.address.trim().is_empty()) {
            return Err(GatewayError::Config(format!(
                "peer endpoint with TLS certificate {} has an empty address",
                peer.tls_cert_path.display()
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn valid() -> GatewayResult<GatewayConfig> {
        GatewayConfig::from_parts(
            "Org1MSP",
            "/identity/cert.pem",
            "/identity/key.pem",
            vec!["peer0:7051".into(), "peer1:7051".into()],
            vec!["/tls/peer0.pem".into(), "/tls/peer1.pem".into()],
            "mychannel",
            "asset-transfer",
            Timeouts::default(),
        )
    }

    #[test]
    fn valid_config_passes() {
        let config = valid().unwrap();
        assert_eq!(config.peers.len(), 2);
        assert_eq!(config.peers[1].address, "peer1:7051");
    }

    // Any nonzero mismatch must fail, in either direction.
    #[test]
    fn count_mismatch_is_a_config_error() {
        for (endpoints, certs) in [
            (vec!["a:1", "b:2"], vec!["/tls/a.pem"]),
            (vec!["a:1"], vec!["/tls/a.pem", "/tls/b.pem"]),
            (vec!["a:1", "b:2", "c:3"], vec![]),
        ] {
            let err = GatewayConfig::from_parts(
                "Org1MSP",
                "/c.pem",
                "/k.pem",
                endpoints.into_iter().map(String::from).collect(),
                certs.into_iter().map(PathBuf::from).collect(),
                "mychannel",
                "cc",
                Timeouts::default(),
            )
            .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Config);
        }
    }

    #[test]
    fn zero_peers_is_a_config_error() {
        let err = GatewayConfig::from_parts(
            "Org1MSP",
            "/c.pem",
            "/k.pem",
            vec![],
            vec![],
            "mychannel",
            "cc",
            Timeouts::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn empty_identifiers_are_rejected() {
        let mut config = valid().unwrap();
        config.channel_name = "  ".into();
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::Config);

        let mut config = valid().unwrap();
        config.msp_id.clear();
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::Config);
    }

    #[test]
    fn endpoints_are_trimmed() {
        let config = GatewayConfig::from_parts(
            "Org1MSP",
            "/c.pem",
            "/k.pem",
            vec![" peer0:7051 ".into()],
            vec!["/tls/a.pem".into()],
            "mychannel",
            "cc",
            Timeouts::default(),
        )
        .unwrap();
        assert_eq!(config.peers[0].address, "peer0:7051");
    }

    #[test]
    fn default_timeouts_are_thirty_seconds() {
        let t = Timeouts::default();
        assert_eq!(t.evaluate, Duration::from_secs(30));
        assert_eq!(t.endorse, Duration::from_secs(30));
        assert_eq!(t.submit, Duration::from_secs(30));
        assert_eq!(t.commit_status, Duration::from_secs(30));
    }
}
