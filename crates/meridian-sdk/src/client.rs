//! Client - entry point operations execute against

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use meridian_crypto::{CryptoError, FnSigner, PrivateKey, PublicKey, Signer};
use meridian_network::{address_book, ChannelFactory, MirrorNetwork, Network};
use meridian_primitives::{AccountId, Amount, LedgerId};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::{ClientConfig, MirrorNetworkConfig, NetworkConfig};
use crate::query::AccountBalanceQuery;
use crate::{Error, Operator, Result};

#[cfg(feature = "http")]
use meridian_network::http_channel_factory;

/// Default cap on dispatch attempts per execution
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
/// Default first wait after a retryable status
pub const DEFAULT_MIN_BACKOFF: Duration = Duration::from_millis(250);
/// Default cap on the wait after a retryable status
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(8);
/// Default most a query may cost without an explicit payment
pub const DEFAULT_MAX_QUERY_PAYMENT: Amount = Amount::from_coins(1);

/// Global execution policy
#[derive(Debug, Clone)]
pub(crate) struct ClientPolicy {
    pub(crate) max_attempts: u32,
    pub(crate) min_backoff: Duration,
    pub(crate) max_backoff: Duration,
    pub(crate) max_query_payment: Amount,
    pub(crate) request_timeout: Option<Duration>,
    pub(crate) regenerate_transaction_id: bool,
    pub(crate) default_max_transaction_fee: Option<Amount>,
    pub(crate) auto_validate_checksums: bool,
}

impl Default for ClientPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_backoff: DEFAULT_MIN_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            max_query_payment: DEFAULT_MAX_QUERY_PAYMENT,
            request_timeout: None,
            regenerate_transaction_id: true,
            default_max_transaction_fee: None,
            auto_validate_checksums: false,
        }
    }
}

struct ClientInner {
    network: Network,
    mirror_network: MirrorNetwork,
    operator: RwLock<Option<Arc<Operator>>>,
    policy: RwLock<ClientPolicy>,
}

/// Ledger client: node registry, mirror registry, operator and policy.
///
/// Cloning is cheap and every clone shares the same state, so one client can
/// drive many concurrent operations.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Create a client for `network` (address to node account id) whose
    /// channels come from `factory`
    pub fn with_channels(
        network: &HashMap<String, AccountId>,
        factory: ChannelFactory,
    ) -> Result<Self> {
        let nodes = Network::with_network(network, factory.clone())?;
        Ok(Self::from_parts(nodes, MirrorNetwork::new(factory)))
    }

    /// Create a client for a named ledger (`mainnet`, `testnet`, `previewnet`)
    /// whose channels come from `factory`
    pub fn for_name_with_channels(name: &str, factory: ChannelFactory) -> Result<Self> {
        let ledger = address_book::ledger_for_name(name)?;
        let client = Self::with_channels(&address_book::network_for(&ledger)?, factory)?;
        client.set_mirror_network(&address_book::mirror_network_for(&ledger)?)?;
        client.set_ledger_id(Some(ledger));
        Ok(client)
    }

    /// Create a client from configuration, with channels from `factory`
    pub fn from_config_with_channels(config: &ClientConfig, factory: ChannelFactory) -> Result<Self> {
        let client = match &config.network {
            NetworkConfig::Named(name) => Self::for_name_with_channels(name, factory)?,
            NetworkConfig::Addresses(addresses) => Self::with_channels(addresses, factory)?,
        };

        match &config.mirror_network {
            Some(MirrorNetworkConfig::Named(name)) => {
                let ledger = address_book::ledger_for_name(name)?;
                client.set_mirror_network(&address_book::mirror_network_for(&ledger)?)?;
            }
            Some(MirrorNetworkConfig::Addresses(addresses)) => client.set_mirror_network(addresses)?,
            None => {}
        }

        if let Some(operator) = &config.operator {
            let key: PrivateKey = operator
                .private_key
                .parse()
                .map_err(|e: CryptoError| Error::Parse(e.to_string()))?;
            client.set_operator(operator.account_id, key)?;
        }

        config.apply_policy(&client)?;
        Ok(client)
    }

    /// Create a client for `network` over HTTP
    #[cfg(feature = "http")]
    pub fn for_network(network: &HashMap<String, AccountId>) -> Result<Self> {
        Self::with_channels(network, http_channel_factory())
    }

    /// Create a client for a named ledger over HTTP
    #[cfg(feature = "http")]
    pub fn for_name(name: &str) -> Result<Self> {
        Self::for_name_with_channels(name, http_channel_factory())
    }

    /// Client for mainnet
    #[cfg(feature = "http")]
    pub fn for_mainnet() -> Result<Self> {
        Self::for_name("mainnet")
    }

    /// Client for testnet
    #[cfg(feature = "http")]
    pub fn for_testnet() -> Result<Self> {
        Self::for_name("testnet")
    }

    /// Client for previewnet
    #[cfg(feature = "http")]
    pub fn for_previewnet() -> Result<Self> {
        Self::for_name("previewnet")
    }

    /// Create a client from configuration over HTTP
    #[cfg(feature = "http")]
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::from_config_with_channels(config, http_channel_factory())
    }

    fn from_parts(network: Network, mirror_network: MirrorNetwork) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                network,
                mirror_network,
                operator: RwLock::new(None),
                policy: RwLock::new(ClientPolicy::default()),
            }),
        }
    }

    // ==================== Network ====================

    /// Consensus node registry
    pub fn network(&self) -> &Network {
        &self.inner.network
    }

    /// Mirror node registry
    pub fn mirror_network(&self) -> &MirrorNetwork {
        &self.inner.mirror_network
    }

    /// Ledger the client is bound to, if any
    pub fn ledger_id(&self) -> Option<LedgerId> {
        self.inner.network.ledger_id()
    }

    /// Switch the bound ledger. Checksums are validated against it from now on.
    pub fn set_ledger_id(&self, ledger_id: Option<LedgerId>) {
        info!(ledger = ?ledger_id, "Ledger id set");
        self.inner.network.set_ledger_id(ledger_id);
    }

    /// Replace the consensus node set. Nodes present before and after keep
    /// their health.
    pub fn set_network(&self, network: &HashMap<String, AccountId>) -> Result<()> {
        Ok(self.inner.network.set_network(network)?)
    }

    /// Replace the mirror node set
    pub fn set_mirror_network(&self, addresses: &[String]) -> Result<()> {
        Ok(self.inner.mirror_network.set_network(addresses)?)
    }

    // ==================== Operator ====================

    /// Pay and sign with `account_id` and `key` by default.
    ///
    /// When a ledger is bound, a checksum carried by `account_id` must match it.
    pub fn set_operator(&self, account_id: AccountId, key: PrivateKey) -> Result<()> {
        self.set_operator_signer(account_id, Arc::new(key))
    }

    /// Pay with `account_id`, signing through `sign` for `public_key`
    pub fn set_operator_with<F>(
        &self,
        account_id: AccountId,
        public_key: PublicKey,
        sign: F,
    ) -> Result<()>
    where
        F: Fn(&[u8]) -> std::result::Result<Vec<u8>, CryptoError> + Send + Sync + 'static,
    {
        self.set_operator_signer(account_id, Arc::new(FnSigner::new(public_key, sign)))
    }

    /// Pay with `account_id`, signing through any [`Signer`]
    pub fn set_operator_signer(&self, account_id: AccountId, signer: Arc<dyn Signer>) -> Result<()> {
        if let Some(ledger) = self.ledger_id() {
            account_id.validate_checksum(&ledger)?;
        }
        let operator = Operator::new(account_id, signer);
        info!(account = %account_id, public_key = %operator.public_key(), "Operator set");
        *self.inner.operator.write() = Some(Arc::new(operator));
        Ok(())
    }

    /// Current operator
    pub fn operator(&self) -> Option<Arc<Operator>> {
        self.inner.operator.read().clone()
    }

    /// Operator account, if set
    pub fn operator_account_id(&self) -> Option<AccountId> {
        self.inner.operator.read().as_ref().map(|op| op.account_id())
    }

    /// Operator public key, if set
    pub fn operator_public_key(&self) -> Option<PublicKey> {
        self.inner.operator.read().as_ref().map(|op| op.public_key())
    }

    // ==================== Policy ====================

    pub(crate) fn policy(&self) -> ClientPolicy {
        self.inner.policy.read().clone()
    }

    /// Cap on dispatch attempts per execution
    pub fn max_attempts(&self) -> u32 {
        self.inner.policy.read().max_attempts
    }

    /// Set the attempt cap. Zero is rejected.
    pub fn set_max_attempts(&self, max_attempts: u32) -> Result<()> {
        if max_attempts == 0 {
            return Err(Error::Config("max attempts must be at least 1".into()));
        }
        self.inner.policy.write().max_attempts = max_attempts;
        Ok(())
    }

    /// First wait after a retryable status
    pub fn min_backoff(&self) -> Duration {
        self.inner.policy.read().min_backoff
    }

    /// Set the first retry wait. Must not exceed [`Client::max_backoff`].
    pub fn set_min_backoff(&self, min_backoff: Duration) -> Result<()> {
        let mut policy = self.inner.policy.write();
        if min_backoff > policy.max_backoff {
            return Err(Error::Config(format!(
                "min backoff {min_backoff:?} exceeds max backoff {:?}",
                policy.max_backoff
            )));
        }
        policy.min_backoff = min_backoff;
        Ok(())
    }

    /// Cap on the retry wait
    pub fn max_backoff(&self) -> Duration {
        self.inner.policy.read().max_backoff
    }

    /// Set the retry wait cap. Must not be below [`Client::min_backoff`].
    pub fn set_max_backoff(&self, max_backoff: Duration) -> Result<()> {
        let mut policy = self.inner.policy.write();
        if max_backoff < policy.min_backoff {
            return Err(Error::Config(format!(
                "max backoff {max_backoff:?} is below min backoff {:?}",
                policy.min_backoff
            )));
        }
        policy.max_backoff = max_backoff;
        Ok(())
    }

    /// Most a query may cost without an explicit payment
    pub fn max_query_payment(&self) -> Amount {
        self.inner.policy.read().max_query_payment
    }

    /// Set the query cost ceiling
    pub fn set_max_query_payment(&self, max: Amount) -> Result<()> {
        if max.is_negative() {
            return Err(Error::Config(format!("max query payment {max} is negative")));
        }
        self.inner.policy.write().max_query_payment = max;
        Ok(())
    }

    /// Per-attempt deadline; `None` waits indefinitely
    pub fn request_timeout(&self) -> Option<Duration> {
        self.inner.policy.read().request_timeout
    }

    /// Set the per-attempt deadline
    pub fn set_request_timeout(&self, timeout: Option<Duration>) {
        self.inner.policy.write().request_timeout = timeout;
    }

    /// Whether expired transactions get a fresh id and another round
    pub fn default_regenerate_transaction_id(&self) -> bool {
        self.inner.policy.read().regenerate_transaction_id
    }

    /// Set whether expired transactions are regenerated
    pub fn set_default_regenerate_transaction_id(&self, regenerate: bool) {
        self.inner.policy.write().regenerate_transaction_id = regenerate;
    }

    /// Fee cap for transactions that set none; `None` uses each kind's own default
    pub fn default_max_transaction_fee(&self) -> Option<Amount> {
        self.inner.policy.read().default_max_transaction_fee
    }

    /// Set the default fee cap
    pub fn set_default_max_transaction_fee(&self, fee: Amount) -> Result<()> {
        if fee.is_negative() {
            return Err(Error::Config(format!("max transaction fee {fee} is negative")));
        }
        self.inner.policy.write().default_max_transaction_fee = Some(fee);
        Ok(())
    }

    /// Whether ids bound into operations are checksum-validated at freeze
    pub fn auto_validate_checksums(&self) -> bool {
        self.inner.policy.read().auto_validate_checksums
    }

    /// Enable or disable checksum validation at freeze
    pub fn set_auto_validate_checksums(&self, validate: bool) {
        self.inner.policy.write().auto_validate_checksums = validate;
    }

    // ==================== Node policy ====================

    /// Floor of each node's backoff delay
    pub fn set_node_min_backoff(&self, min: Duration) -> Result<()> {
        Ok(self.inner.network.set_min_backoff(min)?)
    }

    /// Cap of each node's backoff delay
    pub fn set_node_max_backoff(&self, max: Duration) -> Result<()> {
        Ok(self.inner.network.set_max_backoff(max)?)
    }

    /// Drop a node from the live set after this many consecutive failures.
    /// `None` never drops nodes.
    pub fn set_max_node_attempts(&self, attempts: Option<u32>) {
        self.inner.network.set_max_node_attempts(attempts);
    }

    /// Bound the automatically chosen node list of each operation
    pub fn set_max_nodes_per_transaction(&self, max: usize) -> Result<()> {
        Ok(self.inner.network.set_max_nodes_per_transaction(max)?)
    }

    // ==================== Liveness ====================

    /// Probe one node with a free query. Failures only feed node health.
    pub async fn ping(&self, node_account_id: AccountId) {
        let mut query = AccountBalanceQuery::new();
        query
            .set_account_id(node_account_id)
            .set_node_account_ids(vec![node_account_id]);
        match query.execute(self).await {
            Ok(_) => debug!(node = %node_account_id, "Ping ok"),
            Err(e) => debug!(node = %node_account_id, error = %e, "Ping failed"),
        }
    }

    /// Probe every node in turn
    pub async fn ping_all(&self) {
        for node_account_id in self.inner.network.account_ids() {
            self.ping(node_account_id).await;
        }
    }

    /// Close every node and mirror channel. Executions still running fail with
    /// [`Error::ClientClosed`].
    pub fn close(&self) {
        info!("Closing client");
        self.inner.network.close();
        self.inner.mirror_network.close();
    }

    /// Whether [`Client::close`] was called
    pub fn is_closed(&self) -> bool {
        self.inner.network.is_closed()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("network", &self.inner.network)
            .field("operator", &self.operator())
            .field("policy", &self.policy())
            .finish()
    }
}
