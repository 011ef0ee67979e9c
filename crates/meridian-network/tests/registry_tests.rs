//! Registry integration tests for meridian-network
//!
//! Backoff growth, node list bounds and reconfiguration.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use meridian_network::{Channel, ChannelFactory, MockChannel, Network, NetworkError};
use meridian_primitives::AccountId;
use tokio::time::Instant;

fn factory() -> ChannelFactory {
    Arc::new(|addr: &str| {
        Arc::new(MockChannel::new(addr, |_| Ok(bytes::Bytes::new()))) as Arc<dyn Channel>
    })
}

fn book(ids: &[u64]) -> HashMap<String, AccountId> {
    ids.iter()
        .map(|&i| (format!("10.0.0.{i}:50211"), AccountId::from_num(i)))
        .collect()
}

// ==================== Backoff Tests ====================

#[tokio::test(start_paused = true)]
async fn test_backoff_monotonic_over_failures() {
    let network = Network::with_network(&book(&[3]), factory()).unwrap();
    let id = AccountId::from_num(3);
    let min = network.min_backoff();
    let max = network.max_backoff();

    for n in 1..=10u32 {
        network.record_failure(&id);
        let node = network.node(&id).unwrap();
        let expected = min.saturating_mul(2u32.saturating_pow(n)).min(max);
        assert_eq!(node.backoff(), expected, "after {n} failures");
    }

    network.record_success(&id);
    let node = network.node(&id).unwrap();
    assert_eq!(node.backoff(), min);
    assert_eq!(node.consecutive_failures(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_custom_backoff_bounds_apply_to_nodes() {
    let network = Network::with_network(&book(&[3]), factory()).unwrap();
    network.set_min_backoff(Duration::from_millis(100)).unwrap();
    network.set_max_backoff(Duration::from_millis(300)).unwrap();
    let id = AccountId::from_num(3);

    network.record_failure(&id);
    network.record_failure(&id);
    network.record_failure(&id);
    assert_eq!(network.node(&id).unwrap().backoff(), Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_backoff_ordering_rejected_not_clamped() {
    let network = Network::new(factory());
    let before = (network.min_backoff(), network.max_backoff());

    let err = network.set_min_backoff(before.1 + Duration::from_millis(1));
    assert!(matches!(err, Err(NetworkError::InvalidBackoff { .. })));
    let err = network.set_max_backoff(before.0 - Duration::from_millis(1));
    assert!(matches!(err, Err(NetworkError::InvalidBackoff { .. })));

    assert_eq!((network.min_backoff(), network.max_backoff()), before);
}

#[tokio::test(start_paused = true)]
async fn test_node_becomes_eligible_after_backoff() {
    let network = Network::with_network(&book(&[3, 4]), factory()).unwrap();
    let a = AccountId::from_num(3);
    network.record_failure(&a);

    let picked = network.select_node(&HashSet::new()).unwrap();
    assert_eq!(picked.account_id(), AccountId::from_num(4));

    let excluded: HashSet<_> = [AccountId::from_num(4)].into();
    let waiting = network.select_node(&excluded).unwrap();
    assert_eq!(waiting.account_id(), a);
    assert!(!waiting.is_eligible_at(Instant::now()));

    tokio::time::advance(waiting.backoff()).await;
    assert!(waiting.is_eligible_at(Instant::now()));
}

// ==================== Node List Tests ====================

#[tokio::test(start_paused = true)]
async fn test_node_count_bound() {
    let ids: Vec<u64> = (3..20).collect();
    let network = Network::with_network(&book(&ids), factory()).unwrap();

    for k in [1usize, 3, 10, 17, 40] {
        network.set_max_nodes_per_transaction(k).unwrap();
        let list = network.node_account_ids_for_transaction().unwrap();
        assert_eq!(list.len(), k.min(ids.len()), "k = {k}");
        let unique: HashSet<_> = list.iter().collect();
        assert_eq!(unique.len(), list.len());
    }
}

#[tokio::test(start_paused = true)]
async fn test_node_list_prefers_healthy_nodes() {
    let network = Network::with_network(&book(&[3, 4, 5, 6]), factory()).unwrap();
    network.set_max_nodes_per_transaction(2).unwrap();
    network.record_failure(&AccountId::from_num(3));
    network.record_failure(&AccountId::from_num(4));

    for _ in 0..20 {
        let list = network.node_account_ids_for_transaction().unwrap();
        assert!(list.iter().all(|id| id.num == 5 || id.num == 6), "{list:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_empty_network_has_no_node_list() {
    let network = Network::new(factory());
    assert_eq!(
        network.node_account_ids_for_transaction(),
        Err(NetworkError::NoNodes)
    );
}

// ==================== Reconfiguration Tests ====================

#[tokio::test(start_paused = true)]
async fn test_set_network_preserves_persisting_health() {
    let network = Network::with_network(&book(&[3, 4]), factory()).unwrap();
    let kept = AccountId::from_num(4);
    network.record_failure(&kept);
    network.record_failure(&kept);
    let health = network.node(&kept).unwrap().health();

    network.set_network(&book(&[4, 5])).unwrap();

    assert!(network.node(&AccountId::from_num(3)).is_none());
    assert_eq!(network.node(&kept).unwrap().health(), health);
    let fresh = network.node(&AccountId::from_num(5)).unwrap();
    assert_eq!(fresh.backoff(), network.min_backoff());
    assert_eq!(fresh.consecutive_failures(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_set_network_readdressed_node_keeps_health() {
    let network = Network::with_network(&book(&[3]), factory()).unwrap();
    let id = AccountId::from_num(3);
    network.record_failure(&id);
    let old = network.node(&id).unwrap();

    let moved: HashMap<String, AccountId> = [("new-host:50211".to_string(), id)].into();
    network.set_network(&moved).unwrap();

    let new = network.node(&id).unwrap();
    assert_eq!(new.endpoints(), ["new-host:50211".to_string()]);
    assert_eq!(new.health(), old.health());
    assert_eq!(
        old.channel().send("s", "m", bytes::Bytes::new()).await,
        Err(meridian_network::TransportError::Closed)
    );
}

#[tokio::test(start_paused = true)]
async fn test_set_network_groups_endpoints() {
    let id = AccountId::from_num(3);
    let book: HashMap<String, AccountId> = [
        ("b:50211".to_string(), id),
        ("a:50211".to_string(), id),
    ]
    .into();
    let network = Network::with_network(&book, factory()).unwrap();
    assert_eq!(network.len(), 1);
    assert_eq!(
        network.node(&id).unwrap().endpoints(),
        ["a:50211".to_string(), "b:50211".to_string()]
    );
    assert_eq!(network.network(), book);
}
