//! Ledger identifier

use std::fmt;
use std::str::FromStr;

use crate::error::PrimitiveError;

/// Identifies which ledger a client talks to.
///
/// The bytes salt entity-id checksums, so the same `shard.realm.num` carries a
/// different checksum on every ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LedgerId {
    /// Production ledger (`0x00`)
    Mainnet,
    /// Public test ledger (`0x01`)
    Testnet,
    /// Preview ledger (`0x02`)
    Previewnet,
    /// Any other ledger, identified by raw bytes
    Other(Vec<u8>),
}

impl LedgerId {
    /// Raw identifier bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            LedgerId::Mainnet => vec![0x00],
            LedgerId::Testnet => vec![0x01],
            LedgerId::Previewnet => vec![0x02],
            LedgerId::Other(bytes) => bytes.clone(),
        }
    }

    /// Build from raw bytes, folding the well-known values back into named variants
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match bytes {
            [0x00] => LedgerId::Mainnet,
            [0x01] => LedgerId::Testnet,
            [0x02] => LedgerId::Previewnet,
            other => LedgerId::Other(other.to_vec()),
        }
    }

    /// Whether this is one of the named public ledgers
    pub fn is_named(&self) -> bool {
        !matches!(self, LedgerId::Other(_))
    }
}

impl fmt::Display for LedgerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerId::Mainnet => f.write_str("mainnet"),
            LedgerId::Testnet => f.write_str("testnet"),
            LedgerId::Previewnet => f.write_str("previewnet"),
            LedgerId::Other(bytes) => f.write_str(&hex::encode(bytes)),
        }
    }
}

impl FromStr for LedgerId {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(LedgerId::Mainnet),
            "testnet" => Ok(LedgerId::Testnet),
            "previewnet" => Ok(LedgerId::Previewnet),
            other => {
                let hex = other.strip_prefix("0x").unwrap_or(other);
                let bytes =
                    hex::decode(hex).map_err(|_| PrimitiveError::LedgerId(other.to_string()))?;
                if bytes.is_empty() {
                    return Err(PrimitiveError::LedgerId(other.to_string()));
                }
                Ok(LedgerId::from_bytes(&bytes))
            }
        }
    }
}
