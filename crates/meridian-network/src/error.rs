//! Network error types

use std::time::Duration;

use meridian_primitives::AccountId;
use thiserror::Error;

/// Failure to complete one request over a channel
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Could not reach the remote end
    #[error("node unreachable: {0}")]
    Unreachable(String),

    /// No answer within the deadline
    #[error("request timed out")]
    Timeout,

    /// The channel was closed locally
    #[error("channel closed")]
    Closed,

    /// The remote end answered with something other than a response
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// Backoff bounds would violate `min <= max`
    #[error("invalid backoff bounds: min {min:?} exceeds max {max:?}")]
    InvalidBackoff {
        /// Requested or current minimum
        min: Duration,
        /// Requested or current maximum
        max: Duration,
    },

    /// A node count of zero was requested
    #[error("max nodes per transaction must be at least 1")]
    InvalidMaxNodes,

    /// No node available for selection
    #[error("no nodes available")]
    NoNodes,

    /// Node not part of the live set
    #[error("node not found: {0}")]
    NodeNotFound(AccountId),

    /// Unknown named network
    #[error("unknown network: {0}")]
    UnknownNetwork(String),

    /// Registry was closed
    #[error("network closed")]
    Closed,

    /// Every mirror failed; carries the last failure
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Result type for network operations
pub type NetworkResult<T> = Result<T, NetworkError>;
