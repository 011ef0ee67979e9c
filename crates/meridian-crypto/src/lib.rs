//! # meridian-crypto
//!
//! Cryptographic collaborators for Meridian ledger clients.
//!
//! - Ed25519 keys and signatures
//! - The asynchronous `Signer` capability used by operators
//! - SHA-384 transaction hashing
//! - Legacy mnemonic checksum arithmetic

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod hash;
mod keys;
pub mod legacy;
mod signer;

pub use error::CryptoError;
pub use hash::{sha384, transaction_hash, TRANSACTION_HASH_LEN};
pub use keys::{PrivateKey, PublicKey, SIGNATURE_LEN};
pub use signer::{FnSigner, Signer};
