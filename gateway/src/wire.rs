//! # Gateway Wire Protocol
//!
//! Message types and transport client for the gateway gRPC contract — the
//! four unary calls that carry a chaincode transaction through its
//! lifecycle. The ledger network behind the gateway service is opaque to
//! this crate; these types are the entire surface we speak to it.
//!
//! ## Method Index
//!
//! | RPC            | Phase                                    | Timeout key     |
//! |----------------|------------------------------------------|-----------------|
//! | `Evaluate`     | read-only query against one peer         | `evaluate`      |
//! | `Endorse`      | collect signed endorsements              | `endorse`       |
//! | `Submit`       | hand the endorsed envelope to ordering   | `submit`        |
//! | `CommitStatus` | wait for the commit result of a tx       | `commit_status` |
//!
//! The message structs are prost derives maintained by hand, mirroring
//! `conduit/gateway/v1/gateway.proto`. Field numbers are part of the wire
//! contract — never renumber, only append.
//!
//! [`GatewayRpc`] is the seam between the transaction protocol and the
//! transport: production code goes through [`GrpcGateway`] over a TLS
//! channel, tests substitute in-memory doubles.

use async_trait::async_trait;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;

use crate::error::GatewayError;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// The client identity presented to the network: an MSP (organization)
/// identifier plus the enrollment credentials (PEM certificate bytes).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WireIdentity {
    /// Organization (membership service provider) identifier.
    #[prost(string, tag = "1")]
    pub msp_id: String,
    /// PEM-encoded enrollment certificate.
    #[prost(bytes = "vec", tag = "2")]
    pub credentials: Vec<u8>,
}

/// A chaincode invocation proposal, before signing.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Proposal {
    /// Client-derived transaction ID: `hex(sha256(nonce ‖ credentials))`.
    #[prost(string, tag = "1")]
    pub transaction_id: String,
    /// Channel the chaincode is deployed on.
    #[prost(string, tag = "2")]
    pub channel_id: String,
    /// Name of the chaincode to invoke.
    #[prost(string, tag = "3")]
    pub chaincode_id: String,
    /// Chaincode function name.
    #[prost(string, tag = "4")]
    pub function: String,
    /// Positional string arguments for the function.
    #[prost(string, repeated, tag = "5")]
    pub args: Vec<String>,
    /// Identity of the proposing client.
    #[prost(message, optional, tag = "6")]
    pub creator: Option<WireIdentity>,
    /// Random nonce; makes the transaction ID unique per proposal.
    #[prost(bytes = "vec", tag = "7")]
    pub nonce: Vec<u8>,
    /// Client wall-clock at proposal time, milliseconds since epoch.
    #[prost(int64, tag = "8")]
    pub timestamp_ms: i64,
}

/// A serialized [`Proposal`] plus the client signature over those bytes.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignedProposal {
    #[prost(bytes = "vec", tag = "1")]
    pub payload: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub signature: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EvaluateRequest {
    #[prost(string, tag = "1")]
    pub transaction_id: String,
    #[prost(string, tag = "2")]
    pub channel_id: String,
    #[prost(message, optional, tag = "3")]
    pub proposed_transaction: Option<SignedProposal>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EvaluateResponse {
    /// The chaincode's response payload.
    #[prost(bytes = "vec", tag = "1")]
    pub payload: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EndorseRequest {
    #[prost(string, tag = "1")]
    pub transaction_id: String,
    #[prost(string, tag = "2")]
    pub channel_id: String,
    #[prost(message, optional, tag = "3")]
    pub proposed_transaction: Option<SignedProposal>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EndorseResponse {
    /// The endorsed transaction envelope, ready to sign and submit.
    #[prost(bytes = "vec", tag = "1")]
    pub prepared_transaction: Vec<u8>,
    /// The chaincode's response payload, extracted from the endorsement.
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubmitRequest {
    #[prost(string, tag = "1")]
    pub transaction_id: String,
    #[prost(string, tag = "2")]
    pub channel_id: String,
    /// Endorsed envelope from [`EndorseResponse::prepared_transaction`].
    #[prost(bytes = "vec", tag = "3")]
    pub prepared_transaction: Vec<u8>,
    /// Client signature over the envelope bytes.
    #[prost(bytes = "vec", tag = "4")]
    pub signature: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubmitResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommitStatusRequest {
    #[prost(string, tag = "1")]
    pub transaction_id: String,
    #[prost(string, tag = "2")]
    pub channel_id: String,
    #[prost(message, optional, tag = "3")]
    pub identity: Option<WireIdentity>,
    /// Client signature over the transaction ID bytes.
    #[prost(bytes = "vec", tag = "4")]
    pub signature: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommitStatusResponse {
    /// Validation code assigned at commit. `0` means the transaction was
    /// validated and the ledger write applied.
    #[prost(uint32, tag = "1")]
    pub result_code: u32,
    /// Height of the block the transaction was committed in.
    #[prost(uint64, tag = "2")]
    pub block_number: u64,
}

/// Validation code for a successfully committed transaction.
pub const COMMIT_OK: u32 = 0;

// ---------------------------------------------------------------------------
// RPC Seam
// ---------------------------------------------------------------------------

/// The four gateway calls, abstracted over the transport.
///
/// One implementor exists per open [`crate::transport::Connection`]; the
/// object is scoped to a single peer and a single call's lifetime, so
/// implementations carry no cross-call state.
#[async_trait]
pub trait GatewayRpc: Send + Sync {
    async fn evaluate(&self, request: EvaluateRequest) -> Result<EvaluateResponse, GatewayError>;
    async fn endorse(&self, request: EndorseRequest) -> Result<EndorseResponse, GatewayError>;
    async fn submit(&self, request: SubmitRequest) -> Result<SubmitResponse, GatewayError>;
    async fn commit_status(
        &self,
        request: CommitStatusRequest,
    ) -> Result<CommitStatusResponse, GatewayError>;
}

// ---------------------------------------------------------------------------
// gRPC Client
// ---------------------------------------------------------------------------

const EVALUATE_PATH: &str = "/conduit.gateway.v1.Gateway/Evaluate";
const ENDORSE_PATH: &str = "/conduit.gateway.v1.Gateway/Endorse";
const SUBMIT_PATH: &str = "/conduit.gateway.v1.Gateway/Submit";
const COMMIT_STATUS_PATH: &str = "/conduit.gateway.v1.Gateway/CommitStatus";

/// [`GatewayRpc`] over a tonic [`Channel`].
///
/// The channel is already secured and connected by the time this exists
/// (see [`crate::transport::TlsConnector`]); all that remains here is
/// framing unary calls and translating `tonic::Status` into the error
/// taxonomy.
pub(crate) struct GrpcGateway {
    channel: Channel,
}

impl GrpcGateway {
    pub(crate) fn new(channel: Channel) -> Self {
        Self { channel }
    }

    async fn unary<Req, Resp>(&self, path: &'static str, request: Req) -> Result<Resp, GatewayError>
    where
        Req: prost::Message + 'static,
        Resp: prost::Message + Default + 'static,
    {
        let mut grpc = tonic::client::Grpc::new(self.channel.clone());
        grpc.ready()
            .await
            .map_err(|e| GatewayError::Network(format!("gateway service not ready: {e}")))?;

        let codec: tonic::codec::ProstCodec<Req, Resp> = tonic::codec::ProstCodec::default();
        let response = grpc
            .unary(
                tonic::Request::new(request),
                PathAndQuery::from_static(path),
                codec,
            )
            .await
            .map_err(status_to_error)?;
        Ok(response.into_inner())
    }
}

fn status_to_error(status: tonic::Status) -> GatewayError {
    GatewayError::Network(format!("{}: {}", status.code(), status.message()))
}

#[async_trait]
impl GatewayRpc for GrpcGateway {
    async fn evaluate(&self, request: EvaluateRequest) -> Result<EvaluateResponse, GatewayError> {
        self.unary(EVALUATE_PATH, request).await
    }

    async fn endorse(&self, request: EndorseRequest) -> Result<EndorseResponse, GatewayError> {
        self.unary(ENDORSE_PATH, request).await
    }

    async fn submit(&self, request: SubmitRequest) -> Result<SubmitResponse, GatewayError> {
        self.unary(SUBMIT_PATH, request).await
    }

    async fn commit_status(
        &self,
        request: CommitStatusRequest,
    ) -> Result<CommitStatusResponse, GatewayError> {
        self.unary(COMMIT_STATUS_PATH, request).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
