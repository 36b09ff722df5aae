//! Peer registry: the fixed, ordered set of gateway peers.
//!
//! Built once at startup from validated configuration and never mutated
//! afterwards — the registry is plain shared data, safe to read from any
//! number of concurrent calls without locking.

use std::path::PathBuf;

use crate::error::{GatewayError, GatewayResult};

/// One configured peer: a reachable endpoint plus the path of the TLS
/// certificate that pins it.
///
/// The certificate is the peer's OWN trust root — connections to this
/// endpoint trust exactly this certificate, not a shared CA bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEndpoint {
    /// `host:port` address of the peer's gateway service.
    pub address: String,
    /// Path to the peer's PEM-encoded TLS certificate.
    pub tls_cert_path: PathBuf,
}

impl PeerEndpoint {
    pub fn new(address: impl Into<String>, tls_cert_path: impl Into<PathBuf>) -> Self {
        Self {
            address: address.into(),
            tls_cert_path: tls_cert_path.into(),
        }
    }
}

/// Immutable, index-addressable sequence of configured peers.
///
/// The constructor re-asserts the non-empty invariant even though the
/// config layer validates it first; an empty registry is a fatal
/// configuration error, never a runtime condition.
#[derive(Debug, Clone)]
pub struct PeerRegistry {
    peers: Vec<PeerEndpoint>,
}

impl PeerRegistry {
    /// Builds a registry from an already-validated, non-empty peer list.
    pub fn new(peers: Vec<PeerEndpoint>) -> GatewayResult<Self> {
        if peers.is_empty() {
            return Err(GatewayError::Config(
                "at least one peer must be configured".into(),
            ));
        }
        Ok(Self { peers })
    }

    /// Number of configured peers. Always at least one.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Always `false` — construction rejects empty lists. Present so the
    /// type reads like the container it is.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// The peer at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<&PeerEndpoint> {
        self.peers.get(index)
    }

    /// Iterates peers in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &PeerEndpoint> {
        self.peers.iter()
    }
}
