// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # CONDUIT — Gateway Client Library
//!
//! A load-balancing gateway client for Hyperledger-style distributed
//! ledger networks. CONDUIT signs chaincode transactions with a
//! file-based identity and drives them through the gateway protocol —
//! propose, endorse, order, commit — against one of several redundant
//! peers, chosen fresh for every call.
//!
//! The design bet is radical per-call isolation: a call owns its peer
//! choice, its TLS connection, and its session outright, and gives all
//! three back before returning. That costs a connection handshake per
//! operation and buys something better — no pooled state to corrupt, no
//! stale connections to drain, and a dead peer degrades throughput
//! instead of correctness.
//!
//! ## Architecture
//!
//! The modules mirror the stations a transaction passes through:
//!
//! - **config** — the immutable configuration everything is built from.
//! - **identity** — enrollment certificate + Ed25519 signing key, loaded
//!   once, shared read-only.
//! - **registry** — the fixed, ordered peer list.
//! - **select** — uniform random peer choice plus the health oracle that
//!   steers traffic away from dead peers.
//! - **transport** — per-peer pinned TLS connections over gRPC.
//! - **wire** — the gateway protobuf contract and the RPC seam tests
//!   substitute doubles through.
//! - **session** — one call's binding of identity, connection, channel,
//!   and chaincode; the four-phase submit protocol lives here.
//! - **client** — the public `invoke`/`evaluate` surface.
//! - **retry** — the explicit retry policy callers may wrap around the
//!   client. The client itself never retries; a commit timeout is never
//!   retried by anyone.
//!
//! ## Design Philosophy
//!
//! 1. Configuration errors die at startup, not at request forty-seven.
//! 2. Everything mutable is call-local; everything shared is immutable
//!    or atomic.
//! 3. Errors keep their taxonomy all the way to the boundary — an
//!    ambiguous commit is not "an error", it is *unknown outcome*, and
//!    the type system says so.
//! 4. If it signs, submits, or releases a resource, it has tests.

pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod registry;
pub mod retry;
pub mod select;
pub mod session;
pub mod transport;
pub mod wire;

pub use client::GatewayClient;
pub use config::{GatewayConfig, Timeouts};
pub use error::{ErrorKind, GatewayError, GatewayResult};
pub use identity::ClientIdentity;
pub use registry::{PeerEndpoint, PeerRegistry};
pub use retry::RetryPolicy;
pub use session::TransactionResult;
