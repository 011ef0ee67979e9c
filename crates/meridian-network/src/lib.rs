//! # meridian-network
//!
//! Node registry for Meridian ledger clients.
//!
//! - `Channel` transport abstraction with mock and HTTP implementations
//! - Per-node health and exponential backoff
//! - `Network`, the live consensus node set used for dispatch
//! - `MirrorNetwork`, the read-side mirror node set
//! - Built-in address books for the public ledgers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address_book;
mod channel;
mod error;
mod mirror;
mod network;
mod node;

pub use channel::{Channel, ChannelFactory, MockChannel, MockHandler, MockRequest};
#[cfg(feature = "http")]
pub use channel::{http_channel_factory, HttpChannel};
pub use error::{NetworkError, NetworkResult, TransportError};
pub use mirror::MirrorNetwork;
pub use network::{Network, DEFAULT_MAX_NODES_PER_TRANSACTION};
pub use node::{Node, NodeHealth, DEFAULT_NODE_MAX_BACKOFF, DEFAULT_NODE_MIN_BACKOFF};
