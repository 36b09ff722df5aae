//! # Gateway Session
//!
//! A session binds the four things a transaction needs — identity,
//! connection, channel, chaincode — for exactly one call. It is built,
//! used once, and dropped; nothing about it is cached or shared, so a
//! broken session can poison nothing but its own call.
//!
//! `submit` drives the full state-changing protocol: build and sign the
//! proposal, collect endorsements, hand the endorsed envelope to
//! ordering, wait for the commit confirmation. Each phase runs under its
//! own timeout. The commit-wait phase is the delicate one: when it times
//! out, the write may or may not have landed, so the failure is reported
//! as [`GatewayError::CommitTimeout`] and never folded into ordinary
//! network errors.
//!
//! `evaluate` runs only the read-only query phase against the one
//! connected peer; it never changes ledger state and is always safe to
//! retry.
//!
//! Cancellation: every phase boundary is an `.await`. Dropping the call
//! future — an HTTP client hanging up, a caller-side timeout — cancels
//! whichever phase is in flight.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::Timeouts;
use crate::error::{GatewayError, GatewayResult};
use crate::identity::ClientIdentity;
use crate::transport::Connection;
use crate::wire::{
    CommitStatusRequest, EndorseRequest, EvaluateRequest, Proposal, SignedProposal, SubmitRequest,
    COMMIT_OK,
};

use prost::Message;

/// Length of the random nonce mixed into every transaction ID.
const NONCE_LENGTH: usize = 24;

/// Outcome of a committed (state-changing) transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionResult {
    /// The chaincode's response payload.
    pub payload: Vec<u8>,
    /// Client-derived transaction ID.
    pub tx_id: String,
    /// Height of the block the transaction was committed in.
    pub block_number: u64,
    /// Validation code assigned at commit; `0` is success.
    pub result_code: u32,
    /// Whether the transaction was validated and applied.
    pub success: bool,
}

/// A single-call binding of identity + connection + channel + chaincode.
///
/// Owns its connection: when the session drops at the end of the call,
/// the connection beneath it is released too, in that order.
pub struct Session {
    identity: Arc<ClientIdentity>,
    channel_name: String,
    chaincode_name: String,
    timeouts: Timeouts,
    // Declared last: session state above drops before the transport.
    connection: Connection,
}

impl Session {
    /// Binds a session for one call.
    ///
    /// Fails with [`GatewayError::Identity`] if the identity cannot sign
    /// (empty credentials). Channel and chaincode existence is the
    /// network's knowledge, not ours — a peer that does not host the
    /// requested chaincode rejects the first request with a
    /// [`GatewayError::Network`].
    pub fn open(
        identity: Arc<ClientIdentity>,
        connection: Connection,
        channel_name: &str,
        chaincode_name: &str,
        timeouts: Timeouts,
    ) -> GatewayResult<Self> {
        if identity.credentials().is_empty() {
            return Err(GatewayError::Identity(
                "identity has no enrollment credentials to sign with".into(),
            ));
        }
        Ok(Self {
            identity,
            channel_name: channel_name.to_string(),
            chaincode_name: chaincode_name.to_string(),
            timeouts,
            connection,
        })
    }

    /// The peer this session is bound to.
    pub fn peer_address(&self) -> &str {
        self.connection.address()
    }

    /// Runs the full state-changing protocol for one transaction.
    pub async fn submit(&self, function: &str, args: &[String]) -> GatewayResult<TransactionResult> {
        let proposal = self.build_proposal(function, args);
        let tx_id = proposal.transaction_id.clone();
        let signed = self.sign_proposal(&proposal);

        // Phase 1: endorsement.
        let endorsement = phase(
            "endorse",
            self.timeouts.endorse,
            self.connection.rpc().endorse(EndorseRequest {
                transaction_id: tx_id.clone(),
                channel_id: self.channel_name.clone(),
                proposed_transaction: Some(signed),
            }),
        )
        .await?;

        // Phase 2: sign the endorsed envelope and submit it for ordering.
        let envelope_signature = self.identity.sign(&endorsement.prepared_transaction);
        phase(
            "submit",
            self.timeouts.submit,
            self.connection.rpc().submit(SubmitRequest {
                transaction_id: tx_id.clone(),
                channel_id: self.channel_name.clone(),
                prepared_transaction: endorsement.prepared_transaction.clone(),
                signature: envelope_signature,
            }),
        )
        .await?;

        // Phase 3: wait for the commit confirmation. Past this point the
        // transaction is in the network's hands; a timeout here is an
        // UNKNOWN outcome, not a failure.
        let status_signature = self.identity.sign(tx_id.as_bytes());
        let status_request = CommitStatusRequest {
            transaction_id: tx_id.clone(),
            channel_id: self.channel_name.clone(),
            identity: Some(self.identity.to_wire()),
            signature: status_signature,
        };
        let status = match tokio::time::timeout(
            self.timeouts.commit_status,
            self.connection.rpc().commit_status(status_request),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(GatewayError::CommitTimeout {
                    tx_id,
                    timeout: self.timeouts.commit_status,
                })
            }
        };

        Ok(TransactionResult {
            payload: endorsement.payload,
            tx_id,
            block_number: status.block_number,
            result_code: status.result_code,
            success: status.result_code == COMMIT_OK,
        })
    }

    /// Runs the read-only query phase and returns the chaincode payload.
    pub async fn evaluate(&self, function: &str, args: &[String]) -> GatewayResult<Vec<u8>> {
        let proposal = self.build_proposal(function, args);
        let tx_id = proposal.transaction_id.clone();
        let signed = self.sign_proposal(&proposal);

        let response = phase(
            "evaluate",
            self.timeouts.evaluate,
            self.connection.rpc().evaluate(EvaluateRequest {
                transaction_id: tx_id,
                channel_id: self.channel_name.clone(),
                proposed_transaction: Some(signed),
            }),
        )
        .await?;
        Ok(response.payload)
    }

    fn build_proposal(&self, function: &str, args: &[String]) -> Proposal {
        let nonce: [u8; NONCE_LENGTH] = rand::random();
        Proposal {
            transaction_id: transaction_id(&nonce, self.identity.credentials()),
            channel_id: self.channel_name.clone(),
            chaincode_id: self.chaincode_name.clone(),
            function: function.to_string(),
            args: args.to_vec(),
            creator: Some(self.identity.to_wire()),
            nonce: nonce.to_vec(),
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    fn sign_proposal(&self, proposal: &Proposal) -> SignedProposal {
        let payload = proposal.encode_to_vec();
        let signature = self.identity.sign(&payload);
        SignedProposal { payload, signature }
    }
}

/// Derives a transaction ID: `hex(sha256(nonce ‖ credentials))`.
///
/// The fresh nonce makes IDs unique per proposal even for identical
/// invocations from the same identity.
pub(crate) fn transaction_id(nonce: &[u8], credentials: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(nonce);
    hasher.update(credentials);
    hex::encode(hasher.finalize())
}

/// Bounds one protocol phase; a timeout surfaces as a network error
/// naming the phase. The commit-wait phase does NOT use this — its
/// timeout has different semantics (see [`Session::submit`]).
async fn phase<T>(
    name: &'static str,
    limit: Duration,
    fut: impl Future<Output = GatewayResult<T>>,
) -> GatewayResult<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Network(format!(
            "{name} phase timed out after {limit:?}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::wire::{
        CommitStatusResponse, EndorseResponse, EvaluateResponse, GatewayRpc, SubmitResponse,
    };
    use async_trait::async_trait;
    use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
    use ed25519_dalek::pkcs8::EncodePrivateKey;
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;
    use std::io::Write;

    const TEST_CERT_PEM: &str = "-----BEGIN CERTIFICATE-----\n\
AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA\n\
-----END CERTIFICATE-----\n";

    fn test_identity() -> Arc<ClientIdentity> {
        let mut cert = tempfile::NamedTempFile::new().unwrap();
        cert.write_all(TEST_CERT_PEM.as_bytes()).unwrap();
        cert.flush().unwrap();

        let key_pem = SigningKey::generate(&mut OsRng)
            .to_pkcs8_pem(LineEnding::LF)
            .unwrap();
        let mut key = tempfile::NamedTempFile::new().unwrap();
        key.write_all(key_pem.as_bytes()).unwrap();
        key.flush().unwrap();

        Arc::new(ClientIdentity::load("Org1MSP", cert.path(), key.path()).unwrap())
    }

    fn short_timeouts() -> Timeouts {
        Timeouts {
            evaluate: Duration::from_millis(50),
            endorse: Duration::from_millis(50),
            submit: Duration::from_millis(50),
            commit_status: Duration::from_millis(50),
        }
    }

    /// Scripted gateway double: healthy by default, with switches for the
    /// failure modes the protocol must distinguish.
    #[derive(Default)]
    struct ScriptedGateway {
        fail_endorse: bool,
        stall_commit: bool,
        result_code: u32,
    }

    #[async_trait]
    impl GatewayRpc for ScriptedGateway {
        async fn evaluate(&self, request: EvaluateRequest) -> GatewayResult<EvaluateResponse> {
            // Echo back the proposal's function so tests can assert the
            // request made it through intact.
            let proposal =
                Proposal::decode(request.proposed_transaction.unwrap().payload.as_slice())
                    .expect("well-formed proposal");
            Ok(EvaluateResponse {
                payload: format!("evaluated:{}", proposal.function).into_bytes(),
            })
        }

        async fn endorse(&self, _request: EndorseRequest) -> GatewayResult<EndorseResponse> {
            if self.fail_endorse {
                return Err(GatewayError::Network("endorsement rejected".into()));
            }
            Ok(EndorseResponse {
                prepared_transaction: b"envelope".to_vec(),
                payload: b"endorsed-payload".to_vec(),
            })
        }

        async fn submit(&self, _request: SubmitRequest) -> GatewayResult<SubmitResponse> {
            Ok(SubmitResponse {})
        }

        async fn commit_status(
            &self,
            _request: CommitStatusRequest,
        ) -> GatewayResult<CommitStatusResponse> {
            if self.stall_commit {
                // Stall far past any test timeout; the caller's timeout
                // cancels this sleep by dropping the future.
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(CommitStatusResponse {
                result_code: self.result_code,
                block_number: 42,
            })
        }
    }

    fn session_over(gateway: ScriptedGateway) -> Session {
        Session::open(
            test_identity(),
            Connection::new("peer0:7051", Box::new(gateway)),
            "mychannel",
            "asset-transfer",
            short_timeouts(),
        )
        .unwrap()
    }

    // -- 1. Transaction IDs --------------------------------------------------

    #[test]
    fn transaction_ids_are_sha256_hex() {
        let id = transaction_id(&[1, 2, 3], b"creds");
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        // Deterministic for fixed inputs...
        assert_eq!(id, transaction_id(&[1, 2, 3], b"creds"));
        // ...different for a different nonce.
        assert_ne!(id, transaction_id(&[9, 9, 9], b"creds"));
    }

    // -- 2. Submit protocol --------------------------------------------------

    #[tokio::test]
    async fn submit_happy_path_produces_full_result() {
        let session = session_over(ScriptedGateway::default());
        let result = session
            .submit("CreateAsset", &["asset1".into(), "blue".into()])
            .await
            .unwrap();

        assert_eq!(result.payload, b"endorsed-payload");
        assert_eq!(result.block_number, 42);
        assert_eq!(result.result_code, COMMIT_OK);
        assert!(result.success);
        assert_eq!(result.tx_id.len(), 64);
    }

    #[tokio::test]
    async fn nonzero_validation_code_is_not_success() {
        let session = session_over(ScriptedGateway {
            result_code: 11,
            ..Default::default()
        });
        let result = session.submit("CreateAsset", &[]).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.result_code, 11);
    }

    #[tokio::test]
    async fn endorsement_failure_is_a_network_error() {
        let session = session_over(ScriptedGateway {
            fail_endorse: true,
            ..Default::default()
        });
        let err = session.submit("CreateAsset", &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[tokio::test]
    async fn commit_stall_is_a_commit_timeout_not_a_network_error() {
        let session = session_over(ScriptedGateway {
            stall_commit: true,
            ..Default::default()
        });
        let err = session.submit("CreateAsset", &[]).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CommitTimeout);
        match err {
            GatewayError::CommitTimeout { tx_id, .. } => {
                assert_eq!(tx_id.len(), 64, "error must carry the tx id");
            }
            other => panic!("expected CommitTimeout, got {other:?}"),
        }
    }

    // -- 3. Evaluate ---------------------------------------------------------

    #[tokio::test]
    async fn evaluate_returns_the_payload() {
        let session = session_over(ScriptedGateway::default());
        let payload = session.evaluate("ReadAsset", &["asset1".into()]).await.unwrap();
        assert_eq!(payload, b"evaluated:ReadAsset");
    }

    #[tokio::test]
    async fn evaluate_is_idempotent_across_calls() {
        let session = session_over(ScriptedGateway::default());
        let first = session.evaluate("ReadAsset", &["asset1".into()]).await.unwrap();
        let second = session.evaluate("ReadAsset", &["asset1".into()]).await.unwrap();
        assert_eq!(first, second, "read-after-read must agree");
    }
}
