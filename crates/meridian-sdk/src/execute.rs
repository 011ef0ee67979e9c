//! Retry loop shared by transactions and queries
//!
//! One execution walks the operation's node list, dispatching at most one
//! request at a time. Transport failures feed node health and move on to the
//! next node without waiting; retryable statuses wait out an exponential delay
//! first. An expired transaction id is regenerated at most once per execution,
//! after which the attempt counter starts over.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use meridian_network::{Channel, TransportError};
use meridian_primitives::{AccountId, Status, TransactionId};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::wire::Response;
use crate::{Client, Error, Result};

/// How a response steers the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// Done: produce the output
    Accept,
    /// Transient: wait, then try again
    Retry,
    /// Transaction id expired: regenerate if allowed
    Expired,
    /// The node cannot serve this operation: try another
    BadNode,
    /// Terminal rejection
    Reject,
}

impl Verdict {
    /// Classification of a precheck status common to every operation
    pub(crate) fn for_precheck(status: Status) -> Self {
        match status {
            Status::Ok => Verdict::Accept,
            Status::TransactionExpired => Verdict::Expired,
            Status::InvalidNodeAccount => Verdict::BadNode,
            s if s.is_transient() => Verdict::Retry,
            _ => Verdict::Reject,
        }
    }
}

/// Per-operation overrides of the client's retry policy
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RetryOverrides {
    pub(crate) max_attempts: Option<u32>,
    pub(crate) min_backoff: Option<Duration>,
    pub(crate) max_backoff: Option<Duration>,
}

impl RetryOverrides {
    pub(crate) fn check(&self) -> Result<()> {
        if self.max_attempts == Some(0) {
            return Err(Error::Config("max attempts must be at least 1".into()));
        }
        if let (Some(min), Some(max)) = (self.min_backoff, self.max_backoff) {
            if min > max {
                return Err(Error::Config(format!(
                    "min backoff {min:?} exceeds max backoff {max:?}"
                )));
            }
        }
        Ok(())
    }
}

/// An operation the retry loop can drive
#[async_trait]
pub(crate) trait Execute: Send + Sync {
    type Output: Send;

    /// Candidate nodes in preference order. Fixed for the whole execution.
    fn node_account_ids(&self) -> &[AccountId];

    /// Service and method the request is sent to
    fn method(&self) -> (&'static str, &'static str);

    /// Transaction id reported in errors
    fn transaction_id(&self) -> Option<TransactionId>;

    fn retry_overrides(&self) -> RetryOverrides;

    /// Signed request bytes for the node at `index` in the node list
    async fn make_request(&mut self, client: &Client, index: usize) -> Result<Bytes>;

    fn classify(&self, response: &Response) -> Verdict;

    fn make_output(&self, response: Response, node_account_id: AccountId) -> Result<Self::Output>;

    fn make_error(&self, response: &Response) -> Error {
        Error::precheck(response.status, self.transaction_id())
    }

    /// Whether an expired id may be replaced
    fn can_regenerate(&self, _client: &Client) -> bool {
        false
    }

    /// Replace the expired id and rebuild everything derived from it
    fn regenerate(&mut self, _client: &Client) -> Result<()> {
        Ok(())
    }
}

/// Drive `op` to a result against `client`
pub(crate) async fn execute<E: Execute>(client: &Client, op: &mut E) -> Result<E::Output> {
    let network = client.network();
    let closed = network.closed();
    let policy = client.policy();
    let overrides = op.retry_overrides();
    let max_attempts = overrides.max_attempts.unwrap_or(policy.max_attempts);
    let min_backoff = overrides.min_backoff.unwrap_or(policy.min_backoff);
    let max_backoff = overrides.max_backoff.unwrap_or(policy.max_backoff);
    let (service, method) = op.method();

    let mut attempt = 0u32;
    let mut regenerated = false;
    let mut excluded: HashSet<AccountId> = HashSet::new();
    let mut last_error: Option<Error> = None;

    while attempt < max_attempts {
        if closed.is_cancelled() {
            return Err(Error::ClientClosed);
        }

        let node = match network.select_from(op.node_account_ids(), &excluded) {
            Ok(node) => node,
            Err(_) => return Err(last_error.unwrap_or(Error::NoNodes)),
        };
        let wait = node.next_eligible().saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            debug!(node = %node.account_id(), wait_ms = wait.as_millis() as u64, "Waiting for node");
            pause(&closed, wait).await?;
        }

        attempt += 1;
        let node_account_id = node.account_id();
        let index = op
            .node_account_ids()
            .iter()
            .position(|id| *id == node_account_id)
            .ok_or(Error::NoNodes)?;
        let request = op.make_request(client, index).await?;

        debug!(
            node = %node_account_id,
            attempt,
            max_attempts,
            method,
            "Dispatching request"
        );
        let sent = tokio::select! {
            _ = closed.cancelled() => return Err(Error::ClientClosed),
            sent = dispatch(node.channel().as_ref(), service, method, request, policy.request_timeout) => sent,
        };

        let bytes = match sent {
            Ok(bytes) => bytes,
            Err(e) => {
                if network.is_closed() {
                    return Err(Error::ClientClosed);
                }
                debug!(node = %node_account_id, attempt, error = %e, "Transport failure");
                // a channel closed by reconfiguration says nothing about the node's new endpoint
                if !matches!(e, TransportError::Closed) {
                    network.record_failure(&node_account_id);
                }
                last_error = Some(Error::Transport(e));
                continue;
            }
        };

        let response = match Response::from_bytes(&bytes) {
            Ok(response) => response,
            Err(e) => {
                warn!(node = %node_account_id, error = %e, "Undecodable response");
                network.record_failure(&node_account_id);
                last_error = Some(e);
                continue;
            }
        };
        network.record_success(&node_account_id);

        match op.classify(&response) {
            Verdict::Accept => return op.make_output(response, node_account_id),
            Verdict::Reject => return Err(op.make_error(&response)),
            Verdict::Retry => {
                debug!(node = %node_account_id, attempt, status = %response.status, "Retryable status");
                last_error = Some(op.make_error(&response));
                if attempt < max_attempts {
                    pause(&closed, retry_delay(attempt, min_backoff, max_backoff)).await?;
                }
            }
            Verdict::BadNode => {
                warn!(node = %node_account_id, status = %response.status, "Node rejected as target");
                network.record_failure(&node_account_id);
                excluded.insert(node_account_id);
                last_error = Some(op.make_error(&response));
            }
            Verdict::Expired => {
                if regenerated || !op.can_regenerate(client) {
                    return Err(op.make_error(&response));
                }
                op.regenerate(client)?;
                regenerated = true;
                attempt = 0;
                excluded.clear();
                debug!(transaction_id = ?op.transaction_id(), "Transaction id regenerated");
                last_error = Some(op.make_error(&response));
            }
        }
    }

    let last = last_error.unwrap_or(Error::NoNodes);
    warn!(attempts = attempt, error = %last, "Max attempts exceeded");
    Err(Error::MaxAttemptsExceeded {
        attempts: attempt,
        last: Box::new(last),
    })
}

/// Wait after the `attempt`-th (1-based) retryable status: `min * 2^attempt`, capped at `max`
pub(crate) fn retry_delay(attempt: u32, min: Duration, max: Duration) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    min.saturating_mul(factor).min(max)
}

async fn dispatch(
    channel: &dyn Channel,
    service: &str,
    method: &str,
    request: Bytes,
    timeout: Option<Duration>,
) -> std::result::Result<Bytes, TransportError> {
    let send = channel.send(service, method, request);
    match timeout {
        Some(limit) => tokio::time::timeout(limit, send)
            .await
            .unwrap_or(Err(TransportError::Timeout)),
        None => send.await,
    }
}

async fn pause(closed: &CancellationToken, delay: Duration) -> Result<()> {
    tokio::select! {
        _ = closed.cancelled() => Err(Error::ClientClosed),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_doubles_and_caps() {
        let min = Duration::from_millis(250);
        let max = Duration::from_secs(8);
        assert_eq!(retry_delay(1, min, max), Duration::from_millis(500));
        assert_eq!(retry_delay(2, min, max), Duration::from_secs(1));
        assert_eq!(retry_delay(4, min, max), Duration::from_secs(4));
        assert_eq!(retry_delay(5, min, max), max);
        assert_eq!(retry_delay(31, min, max), max);
        assert_eq!(retry_delay(40, min, max), max);
    }

    #[test]
    fn test_precheck_classification() {
        assert_eq!(Verdict::for_precheck(Status::Ok), Verdict::Accept);
        assert_eq!(Verdict::for_precheck(Status::Busy), Verdict::Retry);
        assert_eq!(Verdict::for_precheck(Status::PlatformNotActive), Verdict::Retry);
        assert_eq!(Verdict::for_precheck(Status::TransactionExpired), Verdict::Expired);
        assert_eq!(Verdict::for_precheck(Status::InvalidNodeAccount), Verdict::BadNode);
        assert_eq!(Verdict::for_precheck(Status::InvalidSignature), Verdict::Reject);
        assert_eq!(Verdict::for_precheck(Status::Other(9999)), Verdict::Reject);
    }

    #[test]
    fn test_overrides_checked() {
        let bad = RetryOverrides {
            min_backoff: Some(Duration::from_secs(2)),
            max_backoff: Some(Duration::from_secs(1)),
            ..Default::default()
        };
        assert!(matches!(bad.check(), Err(Error::Config(_))));
        assert!(RetryOverrides::default().check().is_ok());
    }
}
