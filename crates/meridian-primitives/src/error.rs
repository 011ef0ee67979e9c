//! Common error types for primitives

use thiserror::Error;

/// Identifier parsing and validation error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityIdError {
    /// Text did not match `{num}`, `{shard}.{realm}.{num}` or `{shard}.{realm}.{num}-{checksum}`
    #[error("invalid entity id {0:?}")]
    Parse(String),

    /// A component was negative
    #[error("entity id components must be non-negative, got {0}")]
    Negative(i64),

    /// The checksum suffix does not belong to this id on the bound ledger
    #[error("checksum mismatch for {id}: expected {expected}, present {present}")]
    ChecksumMismatch {
        /// `shard.realm.num` without checksum
        id: String,
        /// Checksum computed for the bound ledger
        expected: String,
        /// Checksum carried by the id
        present: String,
    },
}

/// Error for the remaining primitive parsers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrimitiveError {
    /// Entity id error
    #[error("entity id error: {0}")]
    EntityId(#[from] EntityIdError),

    /// Ledger id was neither a known name nor hex
    #[error("invalid ledger id: {0}")]
    LedgerId(String),

    /// Transaction id was not `{account}@{seconds}.{nanos}`
    #[error("invalid transaction id: {0}")]
    TransactionId(String),
}
