//! # Retry Policy
//!
//! Retry lives OUTSIDE the client, as a policy object the boundary layer
//! opts into — the client itself never retries, so every attempt the
//! network sees was deliberately requested by someone who could reason
//! about its safety.
//!
//! The safety table the policy enforces:
//!
//! | Error kind       | Retried?                                  |
//! |------------------|-------------------------------------------|
//! | `transport`      | yes — nothing reached the network          |
//! | `network`        | only if opted in (safe for evaluate calls) |
//! | `commit_timeout` | NEVER — the write may already be committed |
//! | everything else  | no — retrying config/credential errors is noise |
//!
//! Each retried attempt goes back through peer selection, so a retry is
//! also a fresh uniform draw — likely a different peer.

use std::future::Future;
use std::time::Duration;

use crate::error::{ErrorKind, GatewayError, GatewayResult};

/// Exponential-backoff retry policy over gateway calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. `1` disables retrying.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Ceiling for the doubling backoff.
    pub max_backoff: Duration,
    /// Whether `network` errors are retried. Enable for read-only
    /// (evaluate) flows; leave off for invokes unless the chaincode
    /// function is idempotent.
    pub retry_network: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            retry_network: false,
        }
    }
}

impl RetryPolicy {
    /// Policy with the given attempt budget and default backoff curve.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Opts `network` errors into the retryable set.
    pub fn retry_network(mut self, yes: bool) -> Self {
        self.retry_network = yes;
        self
    }

    /// Runs `op` until it succeeds, exhausts the attempt budget, or fails
    /// with a non-retryable error. The last error is returned as-is.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> GatewayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let mut backoff = self.initial_backoff;
        let mut attempt = 1u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && self.should_retry(&e) => {
                    tracing::debug!(
                        attempt,
                        kind = %e.kind(),
                        backoff_ms = backoff.as_millis() as u64,
                        "retrying after {e}"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(self.max_backoff);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn should_retry(&self, error: &GatewayError) -> bool {
        match error.kind() {
            ErrorKind::Transport => true,
            ErrorKind::Network => self.retry_network,
            // Unknown outcome: retrying risks a duplicate ledger write.
            ErrorKind::CommitTimeout => false,
            ErrorKind::Config | ErrorKind::Parse | ErrorKind::Identity => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            retry_network: false,
        }
    }

    fn transport_err() -> GatewayError {
        GatewayError::Transport {
            peer: "peer0:7051".into(),
            reason: "refused".into(),
        }
    }

    #[tokio::test]
    async fn transport_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let result = fast_policy(3)
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(transport_err())
                    } else {
                        Ok("made it")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "made it");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn attempt_budget_is_respected() {
        let calls = AtomicU32::new(0);
        let result: GatewayResult<()> = fast_policy(3)
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(transport_err()) }
            })
            .await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Transport);
        assert_eq!(calls.load(Ordering::SeqCst), 3, "exactly max_attempts calls");
    }

    #[tokio::test]
    async fn commit_timeout_is_never_retried() {
        let calls = AtomicU32::new(0);
        let result: GatewayResult<()> = fast_policy(5)
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(GatewayError::CommitTimeout {
                        tx_id: "ab".into(),
                        timeout: Duration::from_secs(30),
                    })
                }
            })
            .await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::CommitTimeout);
        assert_eq!(calls.load(Ordering::SeqCst), 1, "one attempt, no retries");
    }

    #[tokio::test]
    async fn network_errors_require_opt_in() {
        let calls = AtomicU32::new(0);
        let result: GatewayResult<()> = fast_policy(3)
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(GatewayError::Network("endorse failed".into())) }
            })
            .await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Network);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let calls = AtomicU32::new(0);
        let result: GatewayResult<()> = fast_policy(3)
            .retry_network(true)
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(GatewayError::Network("endorse failed".into())) }
            })
            .await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Network);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn config_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let result: GatewayResult<()> = fast_policy(5)
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(GatewayError::Config("bad".into())) }
            })
            .await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Config);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
