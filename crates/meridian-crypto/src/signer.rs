//! Signing capability
//!
//! Operations never hold key material themselves: they ask a `Signer` for a
//! signature over the exact body bytes sent to each node. A signer may live
//! out of process (a hardware wallet, a remote service), hence the async API.

use std::fmt;

use async_trait::async_trait;

use crate::{CryptoError, PrivateKey, PublicKey};

/// Produces signatures for one public key
#[async_trait]
pub trait Signer: Send + Sync {
    /// Key the produced signatures verify against
    fn public_key(&self) -> PublicKey;

    /// Sign `message`
    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

#[async_trait]
impl Signer for PrivateKey {
    fn public_key(&self) -> PublicKey {
        PrivateKey::public_key(self)
    }

    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(PrivateKey::sign(self, message))
    }
}

/// Adapts a closure into a `Signer`
pub struct FnSigner<F> {
    public_key: PublicKey,
    sign: F,
}

impl<F> FnSigner<F>
where
    F: Fn(&[u8]) -> Result<Vec<u8>, CryptoError> + Send + Sync,
{
    /// Wrap `sign`, whose signatures verify against `public_key`
    pub fn new(public_key: PublicKey, sign: F) -> Self {
        Self { public_key, sign }
    }
}

impl<F> fmt::Debug for FnSigner<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSigner")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Signer for FnSigner<F>
where
    F: Fn(&[u8]) -> Result<Vec<u8>, CryptoError> + Send + Sync,
{
    fn public_key(&self) -> PublicKey {
        self.public_key
    }

    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        (self.sign)(message)
    }
}
