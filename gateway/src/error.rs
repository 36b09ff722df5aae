//! # Error Taxonomy
//!
//! Every failure the gateway client can surface, in one enum. The variants
//! map one-to-one onto the operational questions a caller actually has:
//! is my configuration broken, are my credentials garbage, did the wire
//! fail, or did the network itself reject the transaction?
//!
//! The one variant that deserves special attention is [`CommitTimeout`].
//! It means the transaction was endorsed and submitted for ordering, but
//! the commit confirmation never arrived. The ledger write MAY have
//! happened. Treat it as *unknown outcome*, not failure — resubmitting
//! blindly risks a duplicate write. Query commit status out-of-band first.
//!
//! [`CommitTimeout`]: GatewayError::CommitTimeout

use std::time::Duration;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failures surfaced by the gateway client.
///
/// No variant is ever swallowed internally: whatever a phase produces is
/// propagated to the caller with enough context to tell the kinds apart.
/// The client performs no retries of its own — see [`crate::retry`] for
/// the explicit policy wrapper.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed or missing startup configuration: unreadable file, empty
    /// peer list, endpoint/certificate count mismatch. Fatal at startup,
    /// never recovered at runtime.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed certificate or key material. Fatal for the call (or the
    /// startup) that triggered it; other calls are unaffected.
    #[error("credential parse error: {0}")]
    Parse(String),

    /// Connection establishment to a specific peer failed: DNS, refused
    /// connection, TLS handshake. Local to the call that selected the
    /// peer; a later call may be routed elsewhere.
    #[error("transport failure to peer {peer}: {reason}")]
    Transport {
        /// Endpoint address of the peer that failed.
        peer: String,
        /// Underlying connect/handshake error.
        reason: String,
    },

    /// The signing identity could not be used.
    #[error("identity error: {0}")]
    Identity(String),

    /// Remote-side failure: channel/chaincode resolution, proposal
    /// evaluation, endorsement, or submission rejected by the network.
    #[error("network error: {0}")]
    Network(String),

    /// The commit confirmation did not arrive within the commit-status
    /// timeout. The transaction outcome is UNKNOWN — it may have been
    /// committed. Carries the transaction ID so the caller can reconcile
    /// out-of-band before deciding whether to resubmit.
    #[error(
        "commit status for transaction {tx_id} not resolved within {timeout:?}; outcome unknown"
    )]
    CommitTimeout {
        /// ID of the transaction whose outcome is unresolved.
        tx_id: String,
        /// The commit-status timeout that elapsed.
        timeout: Duration,
    },
}

/// Coarse classification of a [`GatewayError`], stable across message
/// wording changes. This is what the HTTP boundary and the retry policy
/// switch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Config,
    Parse,
    Transport,
    Identity,
    Network,
    CommitTimeout,
}

impl ErrorKind {
    /// Stable lowercase label, suitable for log fields, metric labels,
    /// and HTTP error payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::Parse => "parse",
            ErrorKind::Transport => "transport",
            ErrorKind::Identity => "identity",
            ErrorKind::Network => "network",
            ErrorKind::CommitTimeout => "commit_timeout",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl GatewayError {
    /// Returns the taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Config(_) => ErrorKind::Config,
            GatewayError::Parse(_) => ErrorKind::Parse,
            GatewayError::Transport { .. } => ErrorKind::Transport,
            GatewayError::Identity(_) => ErrorKind::Identity,
            GatewayError::Network(_) => ErrorKind::Network,
            GatewayError::CommitTimeout { .. } => ErrorKind::CommitTimeout,
        }
    }

    /// Whether retrying the failed call is safe without further thought.
    ///
    /// Only transport failures qualify unconditionally: the connection
    /// never came up, so nothing reached the network. Network failures are
    /// safe for read-only (evaluate) calls but need an idempotency
    /// argument for submits, so they are not included here — opt in via
    /// [`crate::retry::RetryPolicy::retry_network`]. A commit timeout is
    /// NEVER safe to retry.
    pub fn is_safe_to_retry(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct_and_stable() {
        let errors = [
            GatewayError::Config("x".into()),
            GatewayError::Parse("x".into()),
            GatewayError::Transport {
                peer: "p:7051".into(),
                reason: "refused".into(),
            },
            GatewayError::Identity("x".into()),
            GatewayError::Network("x".into()),
            GatewayError::CommitTimeout {
                tx_id: "ab".into(),
                timeout: Duration::from_secs(30),
            },
        ];
        let labels: Vec<_> = errors.iter().map(|e| e.kind().as_str()).collect();
        let mut deduped = labels.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), labels.len(), "labels must be unique");
    }

    #[test]
    fn commit_timeout_is_distinct_from_network() {
        let commit = GatewayError::CommitTimeout {
            tx_id: "deadbeef".into(),
            timeout: Duration::from_secs(30),
        };
        let network = GatewayError::Network("endorse failed".into());
        assert_ne!(commit.kind(), network.kind());
        assert!(commit.to_string().contains("outcome unknown"));
        assert!(commit.to_string().contains("deadbeef"));
    }

    #[test]
    fn only_transport_is_unconditionally_retryable() {
        assert!(GatewayError::Transport {
            peer: "p:7051".into(),
            reason: "refused".into(),
        }
        .is_safe_to_retry());

        assert!(!GatewayError::Network("x".into()).is_safe_to_retry());
        assert!(!GatewayError::CommitTimeout {
            tx_id: "ab".into(),
            timeout: Duration::from_secs(1),
        }
        .is_safe_to_retry());
        assert!(!GatewayError::Config("x".into()).is_safe_to_retry());
    }
}
