//! Consensus node registry
//!
//! The node set is an immutable snapshot behind an `Arc`, swapped wholesale on
//! reconfiguration. Per-node health lives in each [`Node`], so selection and
//! health updates only ever take the registry lock for reading.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use meridian_primitives::{AccountId, LedgerId};
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{NetworkError, NetworkResult};
use crate::node::{Node, NodeHealth, DEFAULT_NODE_MAX_BACKOFF, DEFAULT_NODE_MIN_BACKOFF};
use crate::ChannelFactory;

/// Default cap on how many nodes an operation's node list is drawn from
pub const DEFAULT_MAX_NODES_PER_TRANSACTION: usize = 10;

#[derive(Debug, Clone, Copy)]
struct RegistryConfig {
    min_backoff: Duration,
    max_backoff: Duration,
    max_node_attempts: Option<u32>,
    max_nodes_per_transaction: Option<usize>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            min_backoff: DEFAULT_NODE_MIN_BACKOFF,
            max_backoff: DEFAULT_NODE_MAX_BACKOFF,
            max_node_attempts: None,
            max_nodes_per_transaction: None,
        }
    }
}

/// Live nodes, ordered by account id
#[derive(Default)]
struct NodeSet {
    ordered: Vec<Arc<Node>>,
    by_id: HashMap<AccountId, Arc<Node>>,
}

impl NodeSet {
    fn from_nodes(nodes: impl IntoIterator<Item = Arc<Node>>) -> Self {
        let mut ordered: Vec<Arc<Node>> = nodes.into_iter().collect();
        ordered.sort_by_key(|n| n.account_id());
        let by_id = ordered.iter().map(|n| (n.account_id(), n.clone())).collect();
        Self { ordered, by_id }
    }
}

/// Registry of consensus nodes
pub struct Network {
    nodes: RwLock<Arc<NodeSet>>,
    factory: ChannelFactory,
    config: RwLock<RegistryConfig>,
    ledger_id: RwLock<Option<LedgerId>>,
    closed: CancellationToken,
}

impl Network {
    /// Create an empty registry building channels with `factory`
    pub fn new(factory: ChannelFactory) -> Self {
        Self {
            nodes: RwLock::new(Arc::new(NodeSet::default())),
            factory,
            config: RwLock::new(RegistryConfig::default()),
            ledger_id: RwLock::new(None),
            closed: CancellationToken::new(),
        }
    }

    /// Create a registry holding `network` (address -> node account id)
    pub fn with_network(
        network: &HashMap<String, AccountId>,
        factory: ChannelFactory,
    ) -> NetworkResult<Self> {
        let registry = Self::new(factory);
        registry.set_network(network)?;
        Ok(registry)
    }

    /// Replace the node set.
    ///
    /// Nodes whose account id persists keep their backoff state; nodes whose
    /// endpoints are unchanged also keep their channel. Channels of dropped or
    /// re-addressed nodes are closed.
    pub fn set_network(&self, network: &HashMap<String, AccountId>) -> NetworkResult<()> {
        if self.is_closed() {
            return Err(NetworkError::Closed);
        }

        let mut grouped: BTreeMap<AccountId, Vec<String>> = BTreeMap::new();
        for (address, account_id) in network {
            grouped.entry(*account_id).or_default().push(address.clone());
        }

        let config = *self.config.read();
        let now = Instant::now();
        let mut guard = self.nodes.write();
        let previous = guard.clone();

        let mut next = Vec::with_capacity(grouped.len());
        for (account_id, mut endpoints) in grouped {
            endpoints.sort();
            match previous.by_id.get(&account_id) {
                Some(old) if old.endpoints() == endpoints.as_slice() => next.push(old.clone()),
                Some(old) => {
                    let channel = (self.factory)(&endpoints[0]);
                    next.push(Arc::new(Node::new(account_id, endpoints, channel, old.health())));
                }
                None => {
                    let channel = (self.factory)(&endpoints[0]);
                    let health = NodeHealth::new(config.min_backoff, config.max_backoff, now);
                    next.push(Arc::new(Node::new(account_id, endpoints, channel, health)));
                }
            }
        }

        let next = NodeSet::from_nodes(next);
        for old in &previous.ordered {
            let kept = next
                .by_id
                .get(&old.account_id())
                .is_some_and(|n| Arc::ptr_eq(n, old));
            if !kept {
                old.close();
            }
        }

        info!(
            nodes = next.ordered.len(),
            previous = previous.ordered.len(),
            "Node network updated"
        );
        *guard = Arc::new(next);
        Ok(())
    }

    /// Address book of the live set
    pub fn network(&self) -> HashMap<String, AccountId> {
        self.snapshot()
            .ordered
            .iter()
            .flat_map(|n| n.endpoints().iter().map(move |e| (e.clone(), n.account_id())))
            .collect()
    }

    fn snapshot(&self) -> Arc<NodeSet> {
        self.nodes.read().clone()
    }

    /// Live nodes ordered by account id
    pub fn nodes(&self) -> Vec<Arc<Node>> {
        self.snapshot().ordered.clone()
    }

    /// Look up a live node
    pub fn node(&self, account_id: &AccountId) -> Option<Arc<Node>> {
        self.snapshot().by_id.get(account_id).cloned()
    }

    /// Account ids of the live set
    pub fn account_ids(&self) -> Vec<AccountId> {
        self.snapshot().ordered.iter().map(|n| n.account_id()).collect()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.snapshot().ordered.len()
    }

    /// Whether the live set is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pick a node from the whole live set. See [`Network::select_from`].
    pub fn select_node(&self, excluding: &HashSet<AccountId>) -> NetworkResult<Arc<Node>> {
        let nodes = self.snapshot();
        pick(nodes.ordered.iter(), excluding)
    }

    /// Pick a node among `candidates`, in their order, skipping `excluding` and
    /// ids no longer live.
    ///
    /// Returns the node with the earliest eligibility time, which is an eligible
    /// node whenever one exists. When none is eligible yet the returned node is
    /// still in backoff and the caller waits until [`Node::next_eligible`]. Never
    /// blocks.
    pub fn select_from(
        &self,
        candidates: &[AccountId],
        excluding: &HashSet<AccountId>,
    ) -> NetworkResult<Arc<Node>> {
        let nodes = self.snapshot();
        pick(candidates.iter().filter_map(|id| nodes.by_id.get(id)), excluding)
    }

    /// Record a successful round trip to `account_id`
    pub fn record_success(&self, account_id: &AccountId) {
        if let Some(node) = self.node(account_id) {
            if node.consecutive_failures() > 0 {
                debug!(node = %account_id, "Node recovered");
            }
            node.record_success();
        }
    }

    /// Record a failed round trip to `account_id`. A node reaching the configured
    /// consecutive-failure limit leaves the live set.
    pub fn record_failure(&self, account_id: &AccountId) {
        let Some(node) = self.node(account_id) else {
            return;
        };
        let failures = node.record_failure();
        debug!(
            node = %account_id,
            failures,
            backoff_ms = node.backoff().as_millis() as u64,
            "Node marked unhealthy"
        );

        let limit = self.config.read().max_node_attempts;
        if limit.is_some_and(|limit| failures >= limit) {
            self.remove_node(account_id);
        }
    }

    fn remove_node(&self, account_id: &AccountId) {
        let mut guard = self.nodes.write();
        let Some(node) = guard.by_id.get(account_id).cloned() else {
            return;
        };
        warn!(node = %account_id, "Removing node after repeated failures");
        let remaining = guard
            .ordered
            .iter()
            .filter(|n| n.account_id() != *account_id)
            .cloned();
        *guard = Arc::new(NodeSet::from_nodes(remaining));
        node.close();
    }

    /// Floor of every node's backoff delay
    pub fn min_backoff(&self) -> Duration {
        self.config.read().min_backoff
    }

    /// Cap of every node's backoff delay
    pub fn max_backoff(&self) -> Duration {
        self.config.read().max_backoff
    }

    /// Set the backoff floor. Rejected if above the current cap.
    pub fn set_min_backoff(&self, min: Duration) -> NetworkResult<()> {
        let mut config = self.config.write();
        if min > config.max_backoff {
            return Err(NetworkError::InvalidBackoff {
                min,
                max: config.max_backoff,
            });
        }
        config.min_backoff = min;
        self.apply_bounds(&config);
        Ok(())
    }

    /// Set the backoff cap. Rejected if below the current floor.
    pub fn set_max_backoff(&self, max: Duration) -> NetworkResult<()> {
        let mut config = self.config.write();
        if max < config.min_backoff {
            return Err(NetworkError::InvalidBackoff {
                min: config.min_backoff,
                max,
            });
        }
        config.max_backoff = max;
        self.apply_bounds(&config);
        Ok(())
    }

    fn apply_bounds(&self, config: &RegistryConfig) {
        for node in &self.snapshot().ordered {
            node.set_backoff_bounds(config.min_backoff, config.max_backoff);
        }
    }

    /// Consecutive failures after which a node leaves the live set
    pub fn max_node_attempts(&self) -> Option<u32> {
        self.config.read().max_node_attempts
    }

    /// Set the consecutive-failure limit; `None` keeps failing nodes forever
    pub fn set_max_node_attempts(&self, attempts: Option<u32>) {
        self.config.write().max_node_attempts = attempts;
    }

    /// Cap on automatically generated node lists
    pub fn set_max_nodes_per_transaction(&self, max: usize) -> NetworkResult<()> {
        if max == 0 {
            return Err(NetworkError::InvalidMaxNodes);
        }
        self.config.write().max_nodes_per_transaction = Some(max);
        Ok(())
    }

    /// Length of automatically generated node lists for the current live set
    pub fn max_nodes_per_transaction(&self) -> usize {
        let size = self.len();
        let cap = self
            .config
            .read()
            .max_nodes_per_transaction
            .unwrap_or(DEFAULT_MAX_NODES_PER_TRANSACTION);
        cap.min(size)
    }

    /// Node list for a new operation: a random draw of
    /// [`Network::max_nodes_per_transaction`] nodes, eligible nodes first.
    pub fn node_account_ids_for_transaction(&self) -> NetworkResult<Vec<AccountId>> {
        let mut nodes = self.nodes();
        if nodes.is_empty() {
            return Err(NetworkError::NoNodes);
        }
        let count = self.max_nodes_per_transaction();

        nodes.shuffle(&mut rand::thread_rng());
        let now = Instant::now();
        // stable: shuffled order survives within each group
        nodes.sort_by_key(|n| !n.is_eligible_at(now));

        Ok(nodes.iter().take(count).map(|n| n.account_id()).collect())
    }

    /// Ledger the nodes belong to
    pub fn ledger_id(&self) -> Option<LedgerId> {
        self.ledger_id.read().clone()
    }

    /// Bind the ledger id
    pub fn set_ledger_id(&self, ledger_id: Option<LedgerId>) {
        *self.ledger_id.write() = ledger_id;
    }

    /// Close every node channel. Waiters on [`Network::closed`] wake up.
    pub fn close(&self) {
        if self.closed.is_cancelled() {
            return;
        }
        self.closed.cancel();
        for node in &self.snapshot().ordered {
            node.close();
        }
        info!("Node network closed");
    }

    /// Whether [`Network::close`] was called
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Token cancelled on close
    pub fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }
}

fn pick<'a>(
    nodes: impl Iterator<Item = &'a Arc<Node>>,
    excluding: &HashSet<AccountId>,
) -> NetworkResult<Arc<Node>> {
    let mut best: Option<(Instant, &Arc<Node>)> = None;
    for node in nodes.filter(|n| !excluding.contains(&n.account_id())) {
        let at = node.next_eligible();
        if best.map_or(true, |(t, _)| at < t) {
            best = Some((at, node));
        }
    }
    best.map(|(_, node)| node.clone()).ok_or(NetworkError::NoNodes)
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("nodes", &self.account_ids())
            .field("ledger_id", &self.ledger_id())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Channel, MockChannel};

    fn factory() -> ChannelFactory {
        Arc::new(|addr: &str| Arc::new(MockChannel::unreachable(addr)) as Arc<dyn Channel>)
    }

    fn book(n: u64) -> HashMap<String, AccountId> {
        (0..n)
            .map(|i| (format!("node{i}:50211"), AccountId::from_num(3 + i)))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_network_orders_nodes() {
        let network = Network::with_network(&book(3), factory()).unwrap();
        assert_eq!(
            network.account_ids(),
            vec![AccountId::from_num(3), AccountId::from_num(4), AccountId::from_num(5)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_prefers_list_order_on_tie() {
        let network = Network::with_network(&book(3), factory()).unwrap();
        let order = [AccountId::from_num(5), AccountId::from_num(3)];
        let node = network.select_from(&order, &HashSet::new()).unwrap();
        assert_eq!(node.account_id(), AccountId::from_num(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_skips_backed_off_node() {
        let network = Network::with_network(&book(2), factory()).unwrap();
        network.record_failure(&AccountId::from_num(3));
        let node = network.select_node(&HashSet::new()).unwrap();
        assert_eq!(node.account_id(), AccountId::from_num(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_returns_earliest_when_none_eligible() {
        let network = Network::with_network(&book(2), factory()).unwrap();
        network.record_failure(&AccountId::from_num(3));
        network.record_failure(&AccountId::from_num(4));
        network.record_failure(&AccountId::from_num(4));
        let node = network.select_node(&HashSet::new()).unwrap();
        assert_eq!(node.account_id(), AccountId::from_num(3));
        assert!(!node.is_eligible_at(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_excluding_everything() {
        let network = Network::with_network(&book(1), factory()).unwrap();
        let excluded: HashSet<_> = [AccountId::from_num(3)].into();
        assert_eq!(
            network.select_node(&excluded).unwrap_err(),
            NetworkError::NoNodes
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_bounds_enforced() {
        let network = Network::new(factory());
        assert!(network.set_min_backoff(Duration::from_secs(9)).is_err());
        assert!(network.set_max_backoff(Duration::from_millis(100)).is_err());
        assert!(network.set_max_backoff(Duration::from_secs(20)).is_ok());
        assert!(network.set_min_backoff(Duration::from_secs(9)).is_ok());
        assert_eq!(network.min_backoff(), Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_nodes_per_transaction_zero_rejected() {
        let network = Network::new(factory());
        assert_eq!(
            network.set_max_nodes_per_transaction(0),
            Err(NetworkError::InvalidMaxNodes)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_node_list_len() {
        let network = Network::with_network(&book(13), factory()).unwrap();
        assert_eq!(network.node_account_ids_for_transaction().unwrap().len(), 10);

        let small = Network::with_network(&book(4), factory()).unwrap();
        assert_eq!(small.node_account_ids_for_transaction().unwrap().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_node_attempts_removes_node() {
        let network = Network::with_network(&book(2), factory()).unwrap();
        network.set_max_node_attempts(Some(2));
        let bad = AccountId::from_num(3);
        let channel = network.node(&bad).unwrap().channel().clone();

        network.record_failure(&bad);
        assert!(network.node(&bad).is_some());
        network.record_failure(&bad);
        assert!(network.node(&bad).is_none());
        assert_eq!(network.len(), 1);
        assert_eq!(
            channel.send("s", "m", bytes::Bytes::new()).await,
            Err(crate::TransportError::Closed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_token() {
        let network = Network::with_network(&book(1), factory()).unwrap();
        let token = network.closed();
        network.close();
        assert!(token.is_cancelled());
        assert!(network.is_closed());
        assert_eq!(network.set_network(&book(1)), Err(NetworkError::Closed));
    }
}
