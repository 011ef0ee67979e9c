//! Transport channels
//!
//! A channel carries opaque request bytes to one node address and returns the
//! response bytes. The registry never looks inside either.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::TransportError;

/// Request/response transport to a single node (object-safe)
#[async_trait]
pub trait Channel: Send + Sync {
    /// Send `request` to `service`/`method` and wait for the response
    async fn send(&self, service: &str, method: &str, request: Bytes)
        -> Result<Bytes, TransportError>;

    /// Release the underlying connection. Later sends fail with `Closed`.
    fn close(&self) {}
}

/// Builds the channel for a node address
pub type ChannelFactory = Arc<dyn Fn(&str) -> Arc<dyn Channel> + Send + Sync>;

/// A request seen by a [`MockChannel`]
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// Address the channel was built for
    pub address: String,
    /// Service name
    pub service: String,
    /// Method name
    pub method: String,
    /// Raw request bytes
    pub body: Bytes,
}

/// Answers requests sent to a [`MockChannel`]
pub type MockHandler = Arc<dyn Fn(&MockRequest) -> Result<Bytes, TransportError> + Send + Sync>;

/// Scriptable in-process channel for testing
///
/// Every request is recorded before the handler runs, so tests can count
/// attempts per node even when the handler fails.
pub struct MockChannel {
    address: String,
    handler: MockHandler,
    delay: Option<Duration>,
    requests: Mutex<Vec<MockRequest>>,
    closed: AtomicBool,
}

impl MockChannel {
    /// Create a channel answering through `handler`
    pub fn new<F>(address: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&MockRequest) -> Result<Bytes, TransportError> + Send + Sync + 'static,
    {
        Self {
            address: address.into(),
            handler: Arc::new(handler),
            delay: None,
            requests: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Channel whose every request fails as unreachable
    pub fn unreachable(address: impl Into<String>) -> Self {
        let address = address.into();
        let reported = address.clone();
        Self::new(address, move |_| Err(TransportError::Unreachable(reported.clone())))
    }

    /// Answer only after `delay` (tokio time, so paused clocks apply)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Address this channel was built for
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Requests recorded so far
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests recorded so far
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Whether `close` was called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for MockChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockChannel")
            .field("address", &self.address)
            .field("requests", &self.request_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[async_trait]
impl Channel for MockChannel {
    async fn send(
        &self,
        service: &str,
        method: &str,
        request: Bytes,
    ) -> Result<Bytes, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let request = MockRequest {
            address: self.address.clone(),
            service: service.to_string(),
            method: method.to_string(),
            body: request,
        };
        self.requests.lock().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        (self.handler)(&request)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// HTTP channel: one POST per request to `http://{address}/{service}/{method}`
#[cfg(feature = "http")]
pub struct HttpChannel {
    client: reqwest::Client,
    address: String,
    closed: AtomicBool,
}

#[cfg(feature = "http")]
impl HttpChannel {
    /// Create a channel to `address` (`host:port`)
    pub fn new(address: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            address: address.to_string(),
            closed: AtomicBool::new(false),
        }
    }

    fn url(&self, service: &str, method: &str) -> String {
        format!("http://{}/{}/{}", self.address, service, method)
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl Channel for HttpChannel {
    async fn send(
        &self,
        service: &str,
        method: &str,
        request: Bytes,
    ) -> Result<Bytes, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        let response = self
            .client
            .post(self.url(service, method))
            .header("content-type", "application/octet-stream")
            .body(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Unreachable(format!("{}: {}", self.address, e))
                }
            })?;

        if !response.status().is_success() {
            return Err(TransportError::Protocol(format!(
                "{} answered HTTP {}",
                self.address,
                response.status()
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| TransportError::Protocol(e.to_string()))
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Factory building an [`HttpChannel`] per address
#[cfg(feature = "http")]
pub fn http_channel_factory() -> ChannelFactory {
    Arc::new(|address: &str| Arc::new(HttpChannel::new(address)) as Arc<dyn Channel>)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_channel_records_requests() {
        let channel = MockChannel::new("a:1", |req| Ok(req.body.clone()));
        let out = channel
            .send("CryptoService", "transfer", Bytes::from_static(b"abc"))
            .await
            .unwrap();
        assert_eq!(out, Bytes::from_static(b"abc"));
        assert_eq!(channel.request_count(), 1);

        let requests = channel.requests();
        assert_eq!(requests[0].service, "CryptoService");
        assert_eq!(requests[0].method, "transfer");
        assert_eq!(requests[0].address, "a:1");
    }

    #[tokio::test]
    async fn test_mock_channel_unreachable_still_records() {
        let channel = MockChannel::unreachable("b:2");
        let err = channel.send("s", "m", Bytes::new()).await.unwrap_err();
        assert_eq!(err, TransportError::Unreachable("b:2".into()));
        assert_eq!(channel.request_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_channel_closed() {
        let channel = MockChannel::new("c:3", |_| Ok(Bytes::new()));
        channel.close();
        assert!(channel.is_closed());
        assert_eq!(
            channel.send("s", "m", Bytes::new()).await,
            Err(TransportError::Closed)
        );
        assert_eq!(channel.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_channel_delay() {
        let channel = MockChannel::new("d:4", |_| Ok(Bytes::new())).with_delay(Duration::from_secs(5));
        let start = tokio::time::Instant::now();
        channel.send("s", "m", Bytes::new()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
    }
}
