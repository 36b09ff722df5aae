//! # Transport
//!
//! Opens the secured connection an operation runs over. One connection per
//! operation, owned by the call that opened it, released when the call's
//! session drops — on every exit path, because dropping IS the release.
//!
//! Trust is pinned per peer: the connection to a peer trusts exactly the
//! certificate configured for that peer, never a shared CA bundle. A
//! compromised or misconfigured peer can therefore impersonate nobody but
//! itself.
//!
//! The [`Connector`] trait exists so the client composes against an
//! interface: production uses [`TlsConnector`]; tests plug in doubles that
//! fail on cue or count open handles.

use async_trait::async_trait;
use tonic::transport::{Certificate, Channel, ClientTlsConfig};

use crate::config::CONNECT_TIMEOUT;
use crate::error::{GatewayError, GatewayResult};
use crate::identity::first_certificate_der;
use crate::registry::PeerEndpoint;
use crate::wire::{GatewayRpc, GrpcGateway};

/// An open, secured connection to exactly one peer.
///
/// Owned by the call that created it and dropped before that call
/// returns; never shared, never cached, never reused.
pub struct Connection {
    address: String,
    rpc: Box<dyn GatewayRpc>,
}

impl Connection {
    /// Wraps an RPC handle as a connection to `address`.
    pub fn new(address: impl Into<String>, rpc: Box<dyn GatewayRpc>) -> Self {
        Self {
            address: address.into(),
            rpc,
        }
    }

    /// The peer endpoint this connection is bound to.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub(crate) fn rpc(&self) -> &dyn GatewayRpc {
        self.rpc.as_ref()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Opens connections to peers. Implementations must not retry — retry
/// policy belongs to the caller.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establishes a connection to `peer`.
    ///
    /// Errors:
    /// - [`GatewayError::Config`] — the peer's TLS certificate file is
    ///   unreadable or not PEM.
    /// - [`GatewayError::Transport`] — DNS, refused connection, or TLS
    ///   handshake failure.
    async fn connect(&self, peer: &PeerEndpoint) -> GatewayResult<Connection>;
}

/// Production connector: gRPC over TLS, trust root pinned to the peer's
/// own configured certificate.
#[derive(Debug, Default)]
pub struct TlsConnector;

#[async_trait]
impl Connector for TlsConnector {
    async fn connect(&self, peer: &PeerEndpoint) -> GatewayResult<Connection> {
        let pem = tokio::fs::read(&peer.tls_cert_path).await.map_err(|e| {
            GatewayError::Config(format!(
                "failed to read TLS certificate {} for peer {}: {e}",
                peer.tls_cert_path.display(),
                peer.address
            ))
        })?;
        // A TLS cert that is not PEM is a configuration mistake, not a
        // network condition; fail it as one before touching the wire.
        first_certificate_der(&pem).map_err(|reason| {
            GatewayError::Config(format!(
                "TLS certificate {} for peer {}: {reason}",
                peer.tls_cert_path.display(),
                peer.address
            ))
        })?;

        let tls = ClientTlsConfig::new()
            .ca_certificate(Certificate::from_pem(pem))
            .domain_name(host_of(&peer.address));

        let endpoint = Channel::from_shared(format!("https://{}", peer.address))
            .map_err(|e| {
                GatewayError::Config(format!("peer address {} is not a valid URI: {e}", peer.address))
            })?
            .tls_config(tls)
            .map_err(|e| transport_error(&peer.address, &format!("TLS configuration: {e}")))?
            .connect_timeout(CONNECT_TIMEOUT);

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| transport_error(&peer.address, &e.to_string()))?;

        tracing::debug!(peer = %peer.address, "connection established");
        Ok(Connection::new(
            peer.address.clone(),
            Box::new(GrpcGateway::new(channel)),
        ))
    }
}

fn transport_error(peer: &str, reason: &str) -> GatewayError {
    GatewayError::Transport {
        peer: peer.to_string(),
        reason: reason.to_string(),
    }
}

/// Host part of a `host:port` endpoint, used as the TLS server name.
fn host_of(address: &str) -> &str {
    match address.rsplit_once(':') {
        Some((host, _port)) => host,
        None => address,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
