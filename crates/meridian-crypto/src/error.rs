//! Cryptographic errors

use thiserror::Error;

/// Cryptographic operation error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Signing failed
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// Signature did not verify
    #[error("signature verification failed")]
    VerificationFailed,

    /// Malformed signature bytes
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Invalid private key
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Invalid public key
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Legacy mnemonic failed its checksum
    #[error("legacy mnemonic fails the cyclic redundancy check")]
    LegacyChecksum,

    /// Legacy mnemonic had the wrong shape
    #[error("invalid legacy mnemonic: {0}")]
    InvalidLegacyMnemonic(String),
}
