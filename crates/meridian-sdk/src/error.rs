//! SDK error types

use meridian_crypto::CryptoError;
use meridian_network::{NetworkError, TransportError};
use meridian_primitives::{Amount, EntityIdError, PrimitiveError, Status, TransactionId};
use thiserror::Error;

/// SDK error type
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed identifier or key text
    #[error("parse error: {0}")]
    Parse(String),

    /// Entity id checksum does not match the bound ledger
    #[error("checksum mismatch for {id}: expected {expected}, present {present}")]
    ChecksumMismatch {
        /// `shard.realm.num`
        id: String,
        /// Checksum for the bound ledger
        expected: String,
        /// Checksum carried by the id
        present: String,
    },

    /// Mutation attempted after freeze
    #[error("operation is frozen and can no longer be modified")]
    FrozenState,

    /// Operation used before freeze where a frozen one is required
    #[error("operation must be frozen first")]
    NotFrozen,

    /// Invalid client or operation configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Node could not be reached
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Node rejected the request before consensus
    #[error("precheck failed with status {status}{}", fmt_tx(.transaction_id))]
    Precheck {
        /// Status returned by the node
        status: Status,
        /// Transaction concerned, if any
        transaction_id: Option<TransactionId>,
    },

    /// Ledger reached consensus on a failing status
    #[error("receipt for transaction {transaction_id} contained status {status}")]
    ReceiptStatus {
        /// Status in the receipt
        status: Status,
        /// Transaction concerned
        transaction_id: TransactionId,
    },

    /// Every attempt failed; carries the last failure only
    #[error("max attempts ({attempts}) exceeded; last error: {last}")]
    MaxAttemptsExceeded {
        /// Attempts made
        attempts: u32,
        /// Last observed failure
        last: Box<Error>,
    },

    /// Query cost is above what the caller allows
    #[error("query cost {cost} exceeds max query payment {max}")]
    MaxQueryPaymentExceeded {
        /// Cost reported by the node
        cost: Amount,
        /// Allowed maximum
        max: Amount,
    },

    /// The client was closed
    #[error("client closed")]
    ClientClosed,

    /// Signer failed
    #[error("signing failed: {0}")]
    Signing(#[from] CryptoError),

    /// Malformed wire data
    #[error("codec error: {0}")]
    Codec(String),

    /// No operator is configured and the operation needs one
    #[error("no operator configured; set a transaction id or call set_operator")]
    MissingOperator,

    /// No node is available for the operation
    #[error("no nodes available")]
    NoNodes,
}

fn fmt_tx(transaction_id: &Option<TransactionId>) -> String {
    match transaction_id {
        Some(id) => format!(" for transaction {id}"),
        None => String::new(),
    }
}

impl Error {
    /// Status behind this error, looking through attempt exhaustion
    pub fn status(&self) -> Option<Status> {
        match self {
            Error::Precheck { status, .. } | Error::ReceiptStatus { status, .. } => Some(*status),
            Error::MaxAttemptsExceeded { last, .. } => last.status(),
            _ => None,
        }
    }

    /// Precheck error for `status`
    pub(crate) fn precheck(status: Status, transaction_id: Option<TransactionId>) -> Self {
        Error::Precheck {
            status,
            transaction_id,
        }
    }
}

impl From<EntityIdError> for Error {
    fn from(e: EntityIdError) -> Self {
        match e {
            EntityIdError::ChecksumMismatch {
                id,
                expected,
                present,
            } => Error::ChecksumMismatch {
                id,
                expected,
                present,
            },
            other => Error::Parse(other.to_string()),
        }
    }
}

impl From<PrimitiveError> for Error {
    fn from(e: PrimitiveError) -> Self {
        match e {
            PrimitiveError::EntityId(inner) => inner.into(),
            other => Error::Parse(other.to_string()),
        }
    }
}

impl From<NetworkError> for Error {
    fn from(e: NetworkError) -> Self {
        match e {
            NetworkError::InvalidBackoff { .. }
            | NetworkError::InvalidMaxNodes
            | NetworkError::UnknownNetwork(_) => Error::Config(e.to_string()),
            NetworkError::NoNodes | NetworkError::NodeNotFound(_) => Error::NoNodes,
            NetworkError::Closed => Error::ClientClosed,
            NetworkError::Transport(TransportError::Closed) => Error::ClientClosed,
            NetworkError::Transport(inner) => Error::Transport(inner),
        }
    }
}

impl From<rlp::DecoderError> for Error {
    fn from(e: rlp::DecoderError) -> Self {
        Error::Codec(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, Error>;
