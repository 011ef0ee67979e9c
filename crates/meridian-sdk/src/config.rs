//! Client configuration
//!
//! Loaded once from JSON or TOML. Only `network` is required:
//!
//! ```toml
//! network = "testnet"
//! max_attempts = 5
//!
//! [operator]
//! account_id = "0.0.1001"
//! private_key = "302e020100300506032b657004220420..."
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use meridian_primitives::{AccountId, Amount};
use serde::{Deserialize, Serialize};

use crate::client::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF, DEFAULT_MAX_QUERY_PAYMENT, DEFAULT_MIN_BACKOFF,
};
use crate::{Client, Error, Result};

/// Consensus nodes: a ledger name or an explicit address book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NetworkConfig {
    /// `mainnet`, `testnet` or `previewnet`
    Named(String),
    /// Address (`host:port`) to node account id
    Addresses(HashMap<String, AccountId>),
}

/// Mirror nodes: a ledger name or explicit addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MirrorNetworkConfig {
    /// `mainnet`, `testnet` or `previewnet`
    Named(String),
    /// `host:port` addresses
    Addresses(Vec<String>),
}

/// Operator credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Paying account
    pub account_id: AccountId,
    /// Hex or DER-hex Ed25519 private key
    pub private_key: String,
}

/// Everything needed to build a [`Client`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Consensus nodes
    pub network: NetworkConfig,
    /// Mirror nodes
    #[serde(default)]
    pub mirror_network: Option<MirrorNetworkConfig>,
    /// Default payer
    #[serde(default)]
    pub operator: Option<OperatorConfig>,
    /// Attempt cap per execution
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First retry wait in milliseconds
    #[serde(default = "default_min_backoff_ms")]
    pub min_backoff_ms: u64,
    /// Retry wait cap in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Per-attempt deadline in milliseconds
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    /// Query cost ceiling in the smallest currency unit
    #[serde(default = "default_max_query_payment_tiny")]
    pub max_query_payment_tiny: i64,
    /// Validate entity id checksums at freeze
    #[serde(default)]
    pub auto_validate_checksums: bool,
    /// Regenerate expired transaction ids
    #[serde(default = "default_regenerate_transaction_id")]
    pub regenerate_transaction_id: bool,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_min_backoff_ms() -> u64 {
    DEFAULT_MIN_BACKOFF.as_millis() as u64
}

fn default_max_backoff_ms() -> u64 {
    DEFAULT_MAX_BACKOFF.as_millis() as u64
}

fn default_max_query_payment_tiny() -> i64 {
    DEFAULT_MAX_QUERY_PAYMENT.to_tiny()
}

fn default_regenerate_transaction_id() -> bool {
    true
}

impl ClientConfig {
    /// Config for a named ledger with every policy at its default
    pub fn for_name(name: &str) -> Self {
        Self {
            network: NetworkConfig::Named(name.to_string()),
            mirror_network: None,
            operator: None,
            max_attempts: default_max_attempts(),
            min_backoff_ms: default_min_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            request_timeout_ms: None,
            max_query_payment_tiny: default_max_query_payment_tiny(),
            auto_validate_checksums: false,
            regenerate_transaction_id: default_regenerate_transaction_id(),
        }
    }

    /// Parse JSON
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse TOML
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a `.json` or `.toml` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&text),
            Some("toml") => Self::from_toml(&text),
            _ => Err(Error::Config(format!(
                "{}: expected a .json or .toml file",
                path.display()
            ))),
        }
    }

    pub(crate) fn apply_policy(&self, client: &Client) -> Result<()> {
        let min = Duration::from_millis(self.min_backoff_ms);
        let max = Duration::from_millis(self.max_backoff_ms);
        if min > max {
            return Err(Error::Config(format!(
                "min backoff {min:?} exceeds max backoff {max:?}"
            )));
        }
        // widen before narrowing so the ordering holds at every step
        if min > client.max_backoff() {
            client.set_max_backoff(max)?;
            client.set_min_backoff(min)?;
        } else {
            client.set_min_backoff(min)?;
            client.set_max_backoff(max)?;
        }

        client.set_max_attempts(self.max_attempts)?;
        client.set_request_timeout(self.request_timeout_ms.map(Duration::from_millis));
        client.set_max_query_payment(Amount::from_tiny(self.max_query_payment_tiny))?;
        client.set_auto_validate_checksums(self.auto_validate_checksums);
        client.set_default_regenerate_transaction_id(self.regenerate_transaction_id);
        Ok(())
    }
}
