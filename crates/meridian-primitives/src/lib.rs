//! # meridian-primitives
//!
//! Primitive types for Meridian ledger clients.
//!
//! This crate provides the identifiers, amounts and status codes shared by the
//! network registry and the SDK.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod amount;
pub mod checksum;
mod entity_id;
mod error;
mod ledger_id;
mod status;
mod transaction_id;

pub use amount::{Amount, TINY_PER_COIN};
pub use checksum::{Checksum, CHECKSUM_LEN};
pub use entity_id::{AccountId, EntityId, FileId, TokenId};
pub use error::{EntityIdError, PrimitiveError};
pub use ledger_id::LedgerId;
pub use status::Status;
pub use transaction_id::{Timestamp, TransactionId};
