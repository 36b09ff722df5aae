//! # Transaction Client
//!
//! The public face of the crate. `invoke` submits a state-changing
//! transaction; `evaluate` runs a read-only query. Every call is fully
//! independent: it draws its own random peer, opens its own connection,
//! builds its own session, and tears both down before returning. Nothing
//! is reused across calls — a broken peer hurts only the calls routed to
//! it, and no stale connection state can bleed between transactions.
//!
//! The client never retries. One failed attempt is one terminal error for
//! that call; the boundary layer decides whether to call again (see
//! [`crate::retry`] for the explicit policy wrapper).
//!
//! Shared state is exactly three things, all safe without locks: the
//! immutable peer registry, the immutable identity behind an `Arc`, and
//! the atomic health counters.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::error::{ErrorKind, GatewayResult};
use crate::identity::ClientIdentity;
use crate::registry::PeerRegistry;
use crate::select::{self, PeerHealth};
use crate::session::{Session, TransactionResult};
use crate::transport::{Connector, TlsConnector};

/// Gateway client for one channel of one ledger network.
///
/// Construct once at startup, share behind an `Arc`, call from as many
/// concurrent tasks as you like.
pub struct GatewayClient {
    config: GatewayConfig,
    registry: PeerRegistry,
    identity: Arc<ClientIdentity>,
    health: PeerHealth,
    connector: Arc<dyn Connector>,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient").finish_non_exhaustive()
    }
}

impl GatewayClient {
    /// Builds a client over the production TLS transport.
    ///
    /// Validates the configuration, builds the registry, and loads the
    /// signing identity ONCE — the identity is immutable and shared across
    /// all subsequent calls rather than re-read per operation.
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        Self::with_connector(config, Arc::new(TlsConnector))
    }

    /// As [`new`](Self::new) with a caller-supplied transport. This is the
    /// seam tests use to substitute failing or counting connectors.
    pub fn with_connector(
        config: GatewayConfig,
        connector: Arc<dyn Connector>,
    ) -> GatewayResult<Self> {
        config.validate()?;
        let registry = PeerRegistry::new(config.peers.clone())?;
        let identity = Arc::new(ClientIdentity::load(
            &config.msp_id,
            &config.cert_path,
            &config.key_path,
        )?);
        let health = PeerHealth::with_threshold(registry.len(), config.quarantine_threshold);
        Ok(Self {
            config,
            registry,
            identity,
            health,
            connector,
        })
    }

    /// Submits a state-changing transaction and waits for its commit
    /// outcome.
    pub async fn invoke(
        &self,
        chaincode: &str,
        function: &str,
        args: &[String],
    ) -> GatewayResult<TransactionResult> {
        let session = self.open_session(chaincode).await?;
        let peer = session.peer_address().to_string();
        let result = session.submit(function, args).await;
        match &result {
            Ok(r) => {
                tracing::info!(tx_id = %r.tx_id, block = r.block_number, peer = %peer, "transaction committed")
            }
            Err(e) => {
                tracing::warn!(kind = %e.kind(), peer = %peer, "invoke failed: {e}")
            }
        }
        result
        // Session and connection drop here, on every path.
    }

    /// Runs a read-only query and returns the chaincode payload.
    pub async fn evaluate(
        &self,
        chaincode: &str,
        function: &str,
        args: &[String],
    ) -> GatewayResult<Vec<u8>> {
        let session = self.open_session(chaincode).await?;
        let peer = session.peer_address().to_string();
        let result = session.evaluate(function, args).await;
        if let Err(e) = &result {
            tracing::warn!(kind = %e.kind(), peer = %peer, "evaluate failed: {e}");
        }
        result
    }

    /// Selects a peer, opens a connection to it, and binds a session.
    ///
    /// Connection outcomes feed the health oracle: a successful connect
    /// wipes the peer's failure count, a transport failure raises it.
    /// Configuration mistakes (unreadable TLS cert) say nothing about the
    /// peer's health and are not counted against it.
    async fn open_session(&self, chaincode: &str) -> GatewayResult<Session> {
        let (index, peer) = select::select_peer(&self.registry, &self.health);
        tracing::debug!(peer = %peer.address, "peer selected");

        let connection = match self.connector.connect(peer).await {
            Ok(connection) => {
                self.health.record_success(index);
                connection
            }
            Err(e) => {
                if e.kind() == ErrorKind::Transport {
                    self.health.record_failure(index);
                }
                return Err(e);
            }
        };

        Session::open(
            Arc::clone(&self.identity),
            connection,
            &self.config.channel_name,
            chaincode,
            self.config.timeouts.clone(),
        )
    }

    /// Number of configured peers.
    pub fn peer_count(&self) -> usize {
        self.registry.len()
    }

    /// The channel this client is scoped to.
    pub fn channel_name(&self) -> &str {
        &self.config.channel_name
    }

    /// The default chaincode name from configuration.
    pub fn chaincode_name(&self) -> &str {
        &self.config.chaincode_name
    }

    /// The health oracle, exposed read-only for status reporting.
    pub fn peer_health(&self) -> &PeerHealth {
        &self.health
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
