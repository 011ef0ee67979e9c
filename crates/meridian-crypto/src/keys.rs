//! Ed25519 keys
//!
//! String forms follow the ledger's convention: either the raw 32-byte key as hex,
//! or the DER-encoded key (fixed prefix plus raw key) as hex. `Display` always
//! writes the DER form.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use zeroize::Zeroize;

use crate::CryptoError;

/// Ed25519 signature length in bytes
pub const SIGNATURE_LEN: usize = 64;

const KEY_LEN: usize = 32;
const PRIVATE_DER_PREFIX: &str = "302e020100300506032b657004220420";
const PUBLIC_DER_PREFIX: &str = "302a300506032b6570032100";

/// Ed25519 private key
///
/// Clone is intentionally not implemented to prevent accidental key duplication.
/// The underlying signing key is wiped on drop.
pub struct PrivateKey {
    inner: SigningKey,
}

impl PrivateKey {
    /// Generate a new random key
    pub fn generate() -> Self {
        Self {
            inner: SigningKey::generate(&mut OsRng),
        }
    }

    /// Create from the 32-byte seed
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        // 64 bytes is seed || public key
        let seed = match bytes.len() {
            KEY_LEN | 64 => &bytes[..KEY_LEN],
            n => {
                return Err(CryptoError::InvalidPrivateKey(format!(
                    "expected 32 or 64 bytes, got {n}"
                )))
            }
        };
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(seed);
        let inner = SigningKey::from_bytes(&key);
        key.zeroize();
        Ok(Self { inner })
    }

    /// Create from DER bytes (fixed prefix followed by the seed)
    pub fn from_der(bytes: &[u8]) -> Result<Self, CryptoError> {
        let prefix = hex_prefix(PRIVATE_DER_PREFIX);
        match bytes.strip_prefix(prefix.as_slice()) {
            Some(seed) if seed.len() == KEY_LEN => Self::from_bytes(seed),
            _ => Err(CryptoError::InvalidPrivateKey("not a DER-encoded Ed25519 key".into())),
        }
    }

    /// Matching public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            inner: self.inner.verifying_key(),
        }
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.inner.sign(message).to_bytes().to_vec()
    }

    /// Raw 32-byte seed
    pub fn to_bytes(&self) -> [u8; KEY_LEN] {
        self.inner.to_bytes()
    }

    /// DER encoding
    pub fn to_der(&self) -> Vec<u8> {
        let mut out = hex_prefix(PRIVATE_DER_PREFIX);
        out.extend_from_slice(&self.inner.to_bytes());
        out
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut encoded = hex::encode(self.to_der());
        let result = f.write_str(&encoded);
        encoded.zeroize();
        result
    }
}

impl FromStr for PrivateKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes =
            hex::decode(s).map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
        let result = if s.starts_with(PRIVATE_DER_PREFIX) {
            Self::from_der(&bytes)
        } else {
            Self::from_bytes(&bytes)
        };
        bytes.zeroize();
        result
    }
}

/// Ed25519 public key
#[derive(Clone, Copy)]
pub struct PublicKey {
    inner: VerifyingKey,
}

impl PublicKey {
    /// Create from the raw 32 bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let raw: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidPublicKey(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        let inner = VerifyingKey::from_bytes(&raw)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Create from DER bytes
    pub fn from_der(bytes: &[u8]) -> Result<Self, CryptoError> {
        let prefix = hex_prefix(PUBLIC_DER_PREFIX);
        match bytes.strip_prefix(prefix.as_slice()) {
            Some(raw) => Self::from_bytes(raw),
            None => Err(CryptoError::InvalidPublicKey("not a DER-encoded Ed25519 key".into())),
        }
    }

    /// Raw 32 bytes
    pub fn to_bytes(&self) -> [u8; KEY_LEN] {
        self.inner.to_bytes()
    }

    /// DER encoding
    pub fn to_der(&self) -> Vec<u8> {
        let mut out = hex_prefix(PUBLIC_DER_PREFIX);
        out.extend_from_slice(self.inner.as_bytes());
        out
    }

    /// Verify `signature` over `message`
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        let signature = Signature::from_slice(signature)
            .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
        self.inner
            .verify(message, &signature)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.inner.as_bytes() == other.inner.as_bytes()
    }
}

impl Eq for PublicKey {}

impl std::hash::Hash for PublicKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.as_bytes().hash(state);
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.inner.as_bytes().cmp(other.inner.as_bytes())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.to_bytes()))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_der()))
    }
}

impl FromStr for PublicKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        if s.starts_with(PUBLIC_DER_PREFIX) {
            Self::from_der(&bytes)
        } else {
            Self::from_bytes(&bytes)
        }
    }
}

fn hex_prefix(prefix: &str) -> Vec<u8> {
    // prefixes are compile-time constants of valid hex
    hex::decode(prefix).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 8032 test 1
    const SEED: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";
    const PUBLIC: &str = "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";

    #[test]
    fn test_rfc8032_public_key() {
        let key: PrivateKey = SEED.parse().unwrap();
        assert_eq!(hex::encode(key.public_key().to_bytes()), PUBLIC);
    }

    #[test]
    fn test_rfc8032_empty_signature() {
        let key: PrivateKey = SEED.parse().unwrap();
        let sig = key.sign(&[]);
        assert_eq!(
            hex::encode(&sig),
            "e5564300c360ac729086e2cc806e828a84877f1eb8e5d974d873e065224901555fb8821590a33bacc61e39701cf9b46bd25bf5f0595bbe24655141438e7a100b"
        );
    }

    #[test]
    fn test_sign_verify() {
        let key = PrivateKey::generate();
        let sig = key.sign(b"hello");
        assert_eq!(sig.len(), SIGNATURE_LEN);
        assert!(key.public_key().verify(b"hello", &sig).is_ok());
        assert_eq!(
            key.public_key().verify(b"other", &sig),
            Err(CryptoError::VerificationFailed)
        );
    }

    #[test]
    fn test_der_string_roundtrip() {
        let key: PrivateKey = SEED.parse().unwrap();
        let text = key.to_string();
        assert!(text.starts_with(PRIVATE_DER_PREFIX));
        let back: PrivateKey = text.parse().unwrap();
        assert_eq!(back.to_bytes(), key.to_bytes());

        let public = key.public_key();
        let text = public.to_string();
        assert!(text.starts_with(PUBLIC_DER_PREFIX));
        assert_eq!(text.parse::<PublicKey>().unwrap(), public);
        assert_eq!(PUBLIC.parse::<PublicKey>().unwrap(), public);
    }

    #[test]
    fn test_debug_hides_secret() {
        let key: PrivateKey = SEED.parse().unwrap();
        let debug = format!("{key:?}");
        assert!(!debug.contains(SEED));
        assert!(debug.contains(PUBLIC));
    }

    #[test]
    fn test_invalid_lengths() {
        assert!(PrivateKey::from_bytes(&[0u8; 31]).is_err());
        assert!(PublicKey::from_bytes(&[0u8; 31]).is_err());
        assert!("zz".parse::<PrivateKey>().is_err());
    }
}
