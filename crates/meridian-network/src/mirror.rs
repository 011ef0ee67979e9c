//! Mirror node registry
//!
//! Mirrors serve read-only history. There is no backoff coupling with the
//! consensus nodes: a request walks the mirrors once, round-robin, and reports
//! the last failure if none answers.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{NetworkError, NetworkResult};
use crate::{Channel, ChannelFactory, TransportError};

struct Mirror {
    address: String,
    channel: Arc<dyn Channel>,
}

/// Registry of mirror nodes
pub struct MirrorNetwork {
    mirrors: RwLock<Arc<Vec<Mirror>>>,
    factory: ChannelFactory,
    cursor: AtomicUsize,
    closed: AtomicBool,
}

impl MirrorNetwork {
    /// Create an empty mirror registry
    pub fn new(factory: ChannelFactory) -> Self {
        Self {
            mirrors: RwLock::new(Arc::new(Vec::new())),
            factory,
            cursor: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Create a registry holding `addresses`
    pub fn with_network(addresses: &[String], factory: ChannelFactory) -> NetworkResult<Self> {
        let mirrors = Self::new(factory);
        mirrors.set_network(addresses)?;
        Ok(mirrors)
    }

    /// Replace the mirror set, keeping channels of addresses present before and after
    pub fn set_network(&self, addresses: &[String]) -> NetworkResult<()> {
        if self.is_closed() {
            return Err(NetworkError::Closed);
        }

        let mut guard = self.mirrors.write();
        let previous = guard.clone();

        let mut next = Vec::with_capacity(addresses.len());
        for address in addresses {
            if next.iter().any(|m: &Mirror| &m.address == address) {
                continue;
            }
            let channel = previous
                .iter()
                .find(|m| &m.address == address)
                .map(|m| m.channel.clone())
                .unwrap_or_else(|| (self.factory)(address));
            next.push(Mirror {
                address: address.clone(),
                channel,
            });
        }

        for old in previous.iter() {
            if !next.iter().any(|m| m.address == old.address) {
                old.channel.close();
            }
        }

        info!(mirrors = next.len(), "Mirror network updated");
        *guard = Arc::new(next);
        Ok(())
    }

    /// Mirror addresses in configured order
    pub fn addresses(&self) -> Vec<String> {
        self.mirrors.read().iter().map(|m| m.address.clone()).collect()
    }

    /// Whether no mirror is configured
    pub fn is_empty(&self) -> bool {
        self.mirrors.read().is_empty()
    }

    /// Send to the next mirror in rotation, moving on to the others on
    /// transport failure. Each mirror is tried at most once.
    pub async fn send(&self, service: &str, method: &str, request: Bytes) -> NetworkResult<Bytes> {
        if self.is_closed() {
            return Err(NetworkError::Closed);
        }
        let mirrors = self.mirrors.read().clone();
        if mirrors.is_empty() {
            return Err(NetworkError::NoNodes);
        }

        let start = self.cursor.fetch_add(1, Ordering::Relaxed);
        let mut last = TransportError::Closed;
        for i in 0..mirrors.len() {
            let mirror = &mirrors[(start + i) % mirrors.len()];
            match mirror.channel.send(service, method, request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    debug!(mirror = %mirror.address, error = %e, "Mirror request failed");
                    last = e;
                }
            }
        }
        Err(NetworkError::Transport(last))
    }

    /// Close every mirror channel
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        for mirror in self.mirrors.read().iter() {
            mirror.channel.close();
        }
    }

    /// Whether [`MirrorNetwork::close`] was called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for MirrorNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorNetwork")
            .field("addresses", &self.addresses())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockChannel;

    fn factory() -> ChannelFactory {
        Arc::new(|addr: &str| {
            let addr = addr.to_string();
            if addr.starts_with("down") {
                Arc::new(MockChannel::unreachable(addr)) as Arc<dyn Channel>
            } else {
                let reply = Bytes::from(addr.clone());
                Arc::new(MockChannel::new(addr, move |_| Ok(reply.clone()))) as Arc<dyn Channel>
            }
        })
    }

    #[tokio::test]
    async fn test_round_robin() {
        let mirrors =
            MirrorNetwork::with_network(&["m1:443".into(), "m2:443".into()], factory()).unwrap();
        let a = mirrors.send("s", "m", Bytes::new()).await.unwrap();
        let b = mirrors.send("s", "m", Bytes::new()).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_falls_through_to_healthy_mirror() {
        let mirrors =
            MirrorNetwork::with_network(&["down:443".into(), "up:443".into()], factory()).unwrap();
        for _ in 0..4 {
            let out = mirrors.send("s", "m", Bytes::new()).await.unwrap();
            assert_eq!(out, Bytes::from("up:443"));
        }
    }

    #[tokio::test]
    async fn test_all_down_reports_last_error() {
        let mirrors = MirrorNetwork::with_network(&["down:1".into()], factory()).unwrap();
        let err = mirrors.send("s", "m", Bytes::new()).await.unwrap_err();
        assert!(matches!(
            err,
            NetworkError::Transport(TransportError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_and_closed() {
        let mirrors = MirrorNetwork::new(factory());
        assert_eq!(
            mirrors.send("s", "m", Bytes::new()).await,
            Err(NetworkError::NoNodes)
        );
        mirrors.close();
        assert_eq!(
            mirrors.send("s", "m", Bytes::new()).await,
            Err(NetworkError::Closed)
        );
    }

    #[tokio::test]
    async fn test_set_network_dedups() {
        let mirrors = MirrorNetwork::new(factory());
        mirrors
            .set_network(&["a:1".into(), "a:1".into(), "b:1".into()])
            .unwrap();
        assert_eq!(mirrors.addresses(), vec!["a:1".to_string(), "b:1".to_string()]);
    }
}
