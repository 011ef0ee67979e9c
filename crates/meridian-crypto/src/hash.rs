//! SHA-384 hashing

use sha2::{Digest, Sha384};

/// Length of a transaction hash in bytes
pub const TRANSACTION_HASH_LEN: usize = 48;

/// Compute SHA-384 of the input data
pub fn sha384(data: &[u8]) -> [u8; TRANSACTION_HASH_LEN] {
    let mut hasher = Sha384::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash of a signed transaction envelope, as reported back to callers
pub fn transaction_hash(envelope: &[u8]) -> Vec<u8> {
    sha384(envelope).to_vec()
}
