//! # Peer Selection
//!
//! Uniform random choice over the configured peers, one independent draw
//! per operation. No round-robin, no affinity, no state carried between
//! selections: over many calls the load spreads evenly, and no caller can
//! predict or pin which peer serves it.
//!
//! Layered on top of the random draw — not replacing it — is a small
//! health oracle. A peer that keeps failing at the transport level stops
//! receiving traffic until it answers a connection again; a peer that
//! works keeps its clean slate. The oracle is a row of atomic counters,
//! so concurrent calls never contend on a lock, and the randomness comes
//! from the thread-local RNG, which needs no synchronization either.

use std::sync::atomic::{AtomicU32, Ordering};

use rand::Rng;

use crate::registry::{PeerEndpoint, PeerRegistry};

/// Consecutive transport failures after which a peer is quarantined.
pub const QUARANTINE_THRESHOLD: u32 = 3;

/// Per-peer consecutive-transport-failure counters.
///
/// Shared read-mostly state: every call records one success or failure
/// for the peer it dialed, and reads the counters of all peers during
/// selection. `Relaxed` ordering is enough — the counters steer load, they
/// do not synchronize memory.
#[derive(Debug)]
pub struct PeerHealth {
    failures: Vec<AtomicU32>,
    threshold: u32,
}

impl PeerHealth {
    /// Creates an all-healthy oracle for `peer_count` peers.
    pub fn new(peer_count: usize) -> Self {
        Self::with_threshold(peer_count, QUARANTINE_THRESHOLD)
    }

    /// As [`new`](Self::new) with a custom quarantine threshold.
    pub fn with_threshold(peer_count: usize, threshold: u32) -> Self {
        Self {
            failures: (0..peer_count).map(|_| AtomicU32::new(0)).collect(),
            threshold: threshold.max(1),
        }
    }

    /// Records a successful connection: the peer's slate is wiped clean.
    pub fn record_success(&self, index: usize) {
        if let Some(counter) = self.failures.get(index) {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Records a transport failure against the peer.
    pub fn record_failure(&self, index: usize) {
        if let Some(counter) = self.failures.get(index) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Whether the peer is currently excluded from selection.
    pub fn is_quarantined(&self, index: usize) -> bool {
        self.failures
            .get(index)
            .map(|c| c.load(Ordering::Relaxed) >= self.threshold)
            .unwrap_or(false)
    }

    /// Current consecutive-failure count for the peer.
    pub fn consecutive_failures(&self, index: usize) -> u32 {
        self.failures
            .get(index)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

/// Selects a peer uniformly at random among those not quarantined.
///
/// If every peer is quarantined the draw falls back to plain uniform over
/// all of them — guessing at a dead peer beats refusing service outright,
/// and a success will lift the quarantine.
///
/// Returns the registry index along with the endpoint so the caller can
/// report the outcome back to the oracle.
pub fn select_peer<'a>(registry: &'a PeerRegistry, health: &PeerHealth) -> (usize, &'a PeerEndpoint) {
    let mut rng = rand::thread_rng();

    let eligible: Vec<usize> = (0..registry.len())
        .filter(|&i| !health.is_quarantined(i))
        .collect();

    let index = if eligible.is_empty() {
        rng.gen_range(0..registry.len())
    } else {
        eligible[rng.gen_range(0..eligible.len())]
    };

    // Index is always in range by construction.
    (index, registry.get(index).expect("index within registry"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(n: usize) -> PeerRegistry {
        PeerRegistry::new(
            (0..n)
                .map(|i| PeerEndpoint::new(format!("peer{i}:7051"), format!("/tls/{i}.pem")))
                .collect(),
        )
        .unwrap()
    }

    // -- 1. Statistical uniformity -------------------------------------------

    #[test]
    fn selection_is_approximately_uniform() {
        let registry = registry(3);
        let health = PeerHealth::new(3);
        const DRAWS: usize = 30_000;

        let mut counts = [0usize; 3];
        for _ in 0..DRAWS {
            let (i, _) = select_peer(&registry, &health);
            counts[i] += 1;
        }

        // Expected 10_000 each; ±15% is ~18 standard deviations of slack,
        // so a failure here means the distribution, not the dice.
        let expected = DRAWS / 3;
        for (i, &count) in counts.iter().enumerate() {
            assert!(
                count > expected * 85 / 100 && count < expected * 115 / 100,
                "peer {i} drawn {count} times, expected ~{expected}"
            );
        }
    }

    #[test]
    fn single_peer_is_always_selected() {
        let registry = registry(1);
        let health = PeerHealth::new(1);
        for _ in 0..100 {
            let (i, peer) = select_peer(&registry, &health);
            assert_eq!(i, 0);
            assert_eq!(peer.address, "peer0:7051");
        }
    }

    // -- 2. Quarantine behavior ----------------------------------------------

    #[test]
    fn quarantine_starts_at_threshold() {
        let health = PeerHealth::new(2);
        for _ in 0..QUARANTINE_THRESHOLD - 1 {
            health.record_failure(0);
        }
        assert!(!health.is_quarantined(0));
        health.record_failure(0);
        assert!(health.is_quarantined(0));
        assert!(!health.is_quarantined(1));
    }

    #[test]
    fn success_lifts_quarantine() {
        let health = PeerHealth::new(1);
        for _ in 0..QUARANTINE_THRESHOLD {
            health.record_failure(0);
        }
        assert!(health.is_quarantined(0));
        health.record_success(0);
        assert!(!health.is_quarantined(0));
        assert_eq!(health.consecutive_failures(0), 0);
    }

    #[test]
    fn quarantined_peer_receives_no_traffic() {
        let registry = registry(3);
        let health = PeerHealth::new(3);
        for _ in 0..QUARANTINE_THRESHOLD {
            health.record_failure(1);
        }

        for _ in 0..2_000 {
            let (i, _) = select_peer(&registry, &health);
            assert_ne!(i, 1, "quarantined peer must not be selected");
        }
    }

    #[test]
    fn all_quarantined_falls_back_to_uniform() {
        let registry = registry(2);
        let health = PeerHealth::new(2);
        for i in 0..2 {
            for _ in 0..QUARANTINE_THRESHOLD {
                health.record_failure(i);
            }
        }

        let mut seen = [false; 2];
        for _ in 0..200 {
            let (i, _) = select_peer(&registry, &health);
            seen[i] = true;
        }
        assert!(seen[0] && seen[1], "fallback must still spread load");
    }
}
