//! Consensus node with health tracking
//!
//! Each node carries its own backoff state behind its own lock, so operations
//! dispatching to different nodes never contend.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use meridian_primitives::AccountId;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::Channel;

/// Default delay after a node's first failure is doubled from this
pub const DEFAULT_NODE_MIN_BACKOFF: Duration = Duration::from_millis(250);
/// Default cap on a node's backoff delay
pub const DEFAULT_NODE_MAX_BACKOFF: Duration = Duration::from_secs(8);

/// Snapshot of a node's health
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHealth {
    /// Current backoff delay
    pub backoff: Duration,
    /// Earliest instant the node may be dispatched to again
    pub next_eligible: Instant,
    /// Failures since the last success
    pub consecutive_failures: u32,
    /// Delay floor
    pub min_backoff: Duration,
    /// Delay cap
    pub max_backoff: Duration,
}

impl NodeHealth {
    /// Fresh state, eligible from `now`
    pub fn new(min_backoff: Duration, max_backoff: Duration, now: Instant) -> Self {
        Self {
            backoff: min_backoff,
            next_eligible: now,
            consecutive_failures: 0,
            min_backoff,
            max_backoff,
        }
    }

    fn record_failure(&mut self, now: Instant) {
        self.backoff = (self.backoff * 2).min(self.max_backoff);
        self.next_eligible = now + self.backoff;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    fn record_success(&mut self, now: Instant) {
        self.backoff = self.min_backoff;
        self.next_eligible = now;
        self.consecutive_failures = 0;
    }

    fn set_bounds(&mut self, min: Duration, max: Duration) {
        self.min_backoff = min;
        self.max_backoff = max;
        self.backoff = self.backoff.clamp(min, max);
    }
}

/// A consensus node: account id, addresses and the channel to reach it
pub struct Node {
    account_id: AccountId,
    endpoints: Vec<String>,
    channel: Arc<dyn Channel>,
    health: Mutex<NodeHealth>,
}

impl Node {
    /// Create a node whose requests go through `channel` (built for `endpoints[0]`)
    pub fn new(
        account_id: AccountId,
        endpoints: Vec<String>,
        channel: Arc<dyn Channel>,
        health: NodeHealth,
    ) -> Self {
        Self {
            account_id,
            endpoints,
            channel,
            health: Mutex::new(health),
        }
    }

    /// Node account id
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// Addresses, primary first
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Transport channel
    pub fn channel(&self) -> &Arc<dyn Channel> {
        &self.channel
    }

    /// Health snapshot
    pub fn health(&self) -> NodeHealth {
        *self.health.lock()
    }

    /// Current backoff delay
    pub fn backoff(&self) -> Duration {
        self.health.lock().backoff
    }

    /// Earliest instant the node may be dispatched to again
    pub fn next_eligible(&self) -> Instant {
        self.health.lock().next_eligible
    }

    /// Failures since the last success
    pub fn consecutive_failures(&self) -> u32 {
        self.health.lock().consecutive_failures
    }

    /// Whether the node may be dispatched to at `now`
    pub fn is_eligible_at(&self, now: Instant) -> bool {
        self.health.lock().next_eligible <= now
    }

    /// Double the backoff (capped) and push eligibility out by it.
    /// Returns the failure count after this failure.
    pub fn record_failure(&self) -> u32 {
        let mut health = self.health.lock();
        health.record_failure(Instant::now());
        health.consecutive_failures
    }

    /// Reset backoff to the floor
    pub fn record_success(&self) {
        self.health.lock().record_success(Instant::now());
    }

    pub(crate) fn set_backoff_bounds(&self, min: Duration, max: Duration) {
        self.health.lock().set_bounds(min, max);
    }

    pub(crate) fn close(&self) {
        self.channel.close();
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("account_id", &self.account_id)
            .field("endpoints", &self.endpoints)
            .field("health", &self.health())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockChannel;

    fn node() -> Node {
        let now = Instant::now();
        Node::new(
            AccountId::from_num(3),
            vec!["a:50211".into()],
            Arc::new(MockChannel::unreachable("a:50211")),
            NodeHealth::new(DEFAULT_NODE_MIN_BACKOFF, DEFAULT_NODE_MAX_BACKOFF, now),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles_and_caps() {
        let node = node();
        let min = DEFAULT_NODE_MIN_BACKOFF;
        for n in 1..=8u32 {
            node.record_failure();
            let expected = (min * 2u32.pow(n)).min(DEFAULT_NODE_MAX_BACKOFF);
            assert_eq!(node.backoff(), expected, "after {n} failures");
            assert_eq!(node.consecutive_failures(), n);
        }
        assert_eq!(node.backoff(), DEFAULT_NODE_MAX_BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets() {
        let node = node();
        node.record_failure();
        node.record_failure();
        assert!(!node.is_eligible_at(Instant::now()));

        node.record_success();
        assert_eq!(node.backoff(), DEFAULT_NODE_MIN_BACKOFF);
        assert_eq!(node.consecutive_failures(), 0);
        assert!(node.is_eligible_at(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_pushes_eligibility() {
        let node = node();
        let before = Instant::now();
        node.record_failure();
        assert_eq!(node.next_eligible(), before + DEFAULT_NODE_MIN_BACKOFF * 2);

        tokio::time::advance(DEFAULT_NODE_MIN_BACKOFF * 2).await;
        assert!(node.is_eligible_at(Instant::now()));
    }

    #[test]
    fn test_bounds_clamp_current_backoff() {
        let mut health = NodeHealth::new(
            Duration::from_millis(100),
            Duration::from_secs(10),
            Instant::now(),
        );
        health.backoff = Duration::from_secs(9);
        health.set_bounds(Duration::from_millis(100), Duration::from_secs(1));
        assert_eq!(health.backoff, Duration::from_secs(1));
    }
}
