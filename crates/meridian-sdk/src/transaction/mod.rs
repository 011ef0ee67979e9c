//! State-changing operations
//!
//! A [`Transaction`] moves through `Building -> Frozen -> Executing -> Resolved`.
//! Freezing fixes the transaction id, the node list and the fee, and encodes one
//! body per node. Every setter fails with [`Error::FrozenState`] from then on.
//!
//! Signers are attached lazily: each node's body is signed the first time it is
//! needed, so a transaction fanned out to ten nodes but accepted by the first
//! one is only signed once per key.

mod account_create;
mod account_delete;
mod any;
mod file_append;
mod file_update;
mod token_unfreeze;
mod transfer;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use meridian_crypto::{transaction_hash, PrivateKey, PublicKey, Signer};
use meridian_primitives::{AccountId, Amount, LedgerId, TransactionId};
use rlp::RlpStream;
use tracing::debug;

use crate::execute::{self, Execute, RetryOverrides, Verdict};
use crate::wire::{
    append_amount, decode_transaction_list, encode_transaction_list, Response, SignaturePair,
    SignedTransaction, TransactionBody,
};
use crate::{Client, Error, Result, TransactionResponse};

pub use account_create::{AccountCreateTransaction, AccountCreateTransactionData};
pub use account_delete::{AccountDeleteTransaction, AccountDeleteTransactionData};
pub use any::{AnyTransaction, AnyTransactionData, TransactionKind};
pub use file_append::{
    FileAppendTransaction, FileAppendTransactionData, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CHUNKS,
};
pub use file_update::{FileUpdateTransaction, FileUpdateTransactionData};
pub use token_unfreeze::{TokenUnfreezeTransaction, TokenUnfreezeTransactionData};
pub use transfer::{TransferTransaction, TransferTransactionData};

/// Default validity window of a transaction
pub const DEFAULT_TRANSACTION_VALID_DURATION: Duration = Duration::from_secs(120);

/// Kind-specific part of a transaction
pub trait TransactionData: Clone + fmt::Debug + Send + Sync + 'static {
    /// Operation kind
    fn kind(&self) -> TransactionKind;

    /// Encode the kind-specific payload
    fn encode_body(&self) -> Vec<u8>;

    /// Fee cap used when neither the transaction nor the client sets one
    fn default_max_transaction_fee(&self) -> Amount;

    /// Check every entity id the payload carries against `ledger`
    fn validate_checksums(&self, _ledger: &LedgerId) -> Result<()> {
        Ok(())
    }

    /// Reject payloads that can never be submitted
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Number of transactions the payload is split into
    fn chunk_count(&self) -> usize {
        1
    }
}

/// Decode the kind-specific payload
pub(crate) trait FromBody: Sized {
    fn from_body(bytes: &[u8]) -> Result<Self>;
}

/// Where a transaction is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Properties may still change
    Building,
    /// Bodies are fixed; ready to sign and execute
    Frozen,
    /// Dispatch in progress
    Executing,
    /// Execution finished, successfully or not
    Resolved,
}

/// A transaction of kind `D`
#[derive(Clone)]
pub struct Transaction<D> {
    data: D,
    state: LifecycleState,
    node_account_ids: Vec<AccountId>,
    transaction_id: Option<TransactionId>,
    explicit_transaction_id: bool,
    max_transaction_fee: Option<Amount>,
    valid_duration: Duration,
    memo: String,
    regenerate_transaction_id: Option<bool>,
    overrides: RetryOverrides,
    signers: Vec<Arc<dyn Signer>>,
    // one encoded body per entry of `node_account_ids`, filled at freeze
    bodies: Vec<Vec<u8>>,
    signatures: BTreeMap<(usize, PublicKey), Vec<u8>>,
    has_raw_signatures: bool,
    last_envelope: Option<Bytes>,
}

impl<D: TransactionData + Default> Transaction<D> {
    /// Empty transaction
    pub fn new() -> Self {
        Self::from_data(D::default())
    }
}

impl<D: TransactionData + Default> Default for Transaction<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: TransactionData> Transaction<D> {
    pub(crate) fn from_data(data: D) -> Self {
        Self {
            data,
            state: LifecycleState::Building,
            node_account_ids: Vec::new(),
            transaction_id: None,
            explicit_transaction_id: false,
            max_transaction_fee: None,
            valid_duration: DEFAULT_TRANSACTION_VALID_DURATION,
            memo: String::new(),
            regenerate_transaction_id: None,
            overrides: RetryOverrides::default(),
            signers: Vec::new(),
            bodies: Vec::new(),
            signatures: BTreeMap::new(),
            has_raw_signatures: false,
            last_envelope: None,
        }
    }

    /// Kind-specific payload
    pub fn data(&self) -> &D {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> Result<&mut D> {
        self.require_not_frozen()?;
        Ok(&mut self.data)
    }

    fn require_not_frozen(&self) -> Result<()> {
        if self.is_frozen() {
            return Err(Error::FrozenState);
        }
        Ok(())
    }

    fn require_frozen(&self) -> Result<()> {
        if !self.is_frozen() {
            return Err(Error::NotFrozen);
        }
        Ok(())
    }

    /// Lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Whether the bodies are fixed
    pub fn is_frozen(&self) -> bool {
        self.state != LifecycleState::Building
    }

    // ==================== Properties ====================

    /// Nodes the transaction may be sent to, in preference order. Empty until
    /// frozen unless set explicitly.
    pub fn node_account_ids(&self) -> &[AccountId] {
        &self.node_account_ids
    }

    /// Send only to these nodes
    pub fn set_node_account_ids(&mut self, ids: Vec<AccountId>) -> Result<&mut Self> {
        self.require_not_frozen()?;
        if ids.is_empty() {
            return Err(Error::Config("node account id list is empty".into()));
        }
        self.node_account_ids = ids;
        Ok(self)
    }

    /// Transaction id, once set or generated
    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
    }

    /// Use an explicit transaction id. Explicit ids are never regenerated.
    pub fn set_transaction_id(&mut self, id: TransactionId) -> Result<&mut Self> {
        self.require_not_frozen()?;
        self.transaction_id = Some(id);
        self.explicit_transaction_id = true;
        Ok(self)
    }

    /// Fee cap, once set or resolved at freeze
    pub fn max_transaction_fee(&self) -> Option<Amount> {
        self.max_transaction_fee
    }

    /// Most the payer will pay in fees
    pub fn set_max_transaction_fee(&mut self, fee: Amount) -> Result<&mut Self> {
        self.require_not_frozen()?;
        if fee.is_negative() {
            return Err(Error::Config(format!("max transaction fee {fee} is negative")));
        }
        self.max_transaction_fee = Some(fee);
        Ok(self)
    }

    /// Validity window
    pub fn transaction_valid_duration(&self) -> Duration {
        self.valid_duration
    }

    /// Set the validity window (whole seconds)
    pub fn set_transaction_valid_duration(&mut self, duration: Duration) -> Result<&mut Self> {
        self.require_not_frozen()?;
        self.valid_duration = duration;
        Ok(self)
    }

    /// Memo
    pub fn transaction_memo(&self) -> &str {
        &self.memo
    }

    /// Set the memo
    pub fn set_transaction_memo(&mut self, memo: impl Into<String>) -> Result<&mut Self> {
        self.require_not_frozen()?;
        self.memo = memo.into();
        Ok(self)
    }

    /// Override the client's regeneration policy for this transaction
    pub fn set_regenerate_transaction_id(&mut self, regenerate: bool) -> Result<&mut Self> {
        self.require_not_frozen()?;
        self.regenerate_transaction_id = Some(regenerate);
        Ok(self)
    }

    /// Override the client's attempt cap
    pub fn set_max_attempts(&mut self, max_attempts: u32) -> Result<&mut Self> {
        self.require_not_frozen()?;
        self.overrides.max_attempts = Some(max_attempts);
        Ok(self)
    }

    /// Override the client's first retry wait
    pub fn set_min_backoff(&mut self, min_backoff: Duration) -> Result<&mut Self> {
        self.require_not_frozen()?;
        self.overrides.min_backoff = Some(min_backoff);
        Ok(self)
    }

    /// Override the client's retry wait cap
    pub fn set_max_backoff(&mut self, max_backoff: Duration) -> Result<&mut Self> {
        self.require_not_frozen()?;
        self.overrides.max_backoff = Some(max_backoff);
        Ok(self)
    }

    // ==================== Freeze ====================

    /// Freeze without a client. The transaction id and node list must be set.
    pub fn freeze(&mut self) -> Result<&mut Self> {
        if self.is_frozen() {
            return Ok(self);
        }
        self.data.validate()?;
        self.overrides.check()?;
        let transaction_id = self.transaction_id.ok_or(Error::MissingOperator)?;
        if self.node_account_ids.is_empty() {
            return Err(Error::Config(
                "node account ids must be set to freeze without a client".into(),
            ));
        }
        let fee = self
            .max_transaction_fee
            .unwrap_or_else(|| self.data.default_max_transaction_fee());
        let nodes = self.node_account_ids.clone();
        self.finish_freeze(transaction_id, nodes, fee);
        Ok(self)
    }

    /// Freeze, filling the transaction id from the operator, the node list from
    /// the registry and the fee from the client defaults
    pub fn freeze_with(&mut self, client: &Client) -> Result<&mut Self> {
        if self.is_frozen() {
            return Ok(self);
        }
        self.data.validate()?;
        self.overrides.check()?;
        if client.auto_validate_checksums() {
            if let Some(ledger) = client.ledger_id() {
                self.validate_checksums(&ledger)?;
            }
        }

        let transaction_id = match self.transaction_id {
            Some(id) => id,
            None => {
                let payer = client.operator_account_id().ok_or(Error::MissingOperator)?;
                TransactionId::generate(payer)
            }
        };
        let nodes = if self.node_account_ids.is_empty() {
            client.network().node_account_ids_for_transaction()?
        } else {
            self.node_account_ids.clone()
        };
        let fee = self
            .max_transaction_fee
            .or_else(|| client.default_max_transaction_fee())
            .unwrap_or_else(|| self.data.default_max_transaction_fee());

        self.finish_freeze(transaction_id, nodes, fee);
        Ok(self)
    }

    fn finish_freeze(&mut self, transaction_id: TransactionId, nodes: Vec<AccountId>, fee: Amount) {
        self.transaction_id = Some(transaction_id);
        self.node_account_ids = nodes;
        self.max_transaction_fee = Some(fee);
        self.build_bodies();
        self.state = LifecycleState::Frozen;
        debug!(
            kind = self.data.kind().name(),
            transaction_id = %transaction_id,
            nodes = self.node_account_ids.len(),
            "Transaction frozen"
        );
    }

    fn build_bodies(&mut self) {
        let (Some(transaction_id), Some(fee)) = (self.transaction_id, self.max_transaction_fee)
        else {
            return;
        };
        let data = self.data.encode_body();
        self.bodies = self
            .node_account_ids
            .iter()
            .map(|node| {
                TransactionBody {
                    kind: self.data.kind(),
                    transaction_id,
                    node_account_id: *node,
                    max_transaction_fee: fee,
                    valid_duration_secs: self.valid_duration.as_secs(),
                    memo: self.memo.clone(),
                    data: data.clone(),
                }
                .to_bytes()
            })
            .collect();
    }

    fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
        if let Some(id) = self.transaction_id {
            id.account_id.validate_checksum(ledger)?;
        }
        for node in &self.node_account_ids {
            node.validate_checksum(ledger)?;
        }
        self.data.validate_checksums(ledger)
    }

    /// Body in the form a scheduling transaction wraps: everything but the
    /// transaction id and node
    pub fn scheduled_body(&self) -> Vec<u8> {
        let fee = self
            .max_transaction_fee
            .unwrap_or_else(|| self.data.default_max_transaction_fee());
        let mut s = RlpStream::new_list(4);
        s.append(&self.data.kind().code());
        append_amount(&mut s, fee);
        s.append(&self.memo);
        s.append(&self.data.encode_body());
        s.out().to_vec()
    }

    // ==================== Signing ====================

    /// Sign with `key` for every node
    pub fn sign(&mut self, key: PrivateKey) -> Result<&mut Self> {
        self.sign_with(Arc::new(key))
    }

    /// Sign through `signer` for every node. Signatures are produced when a
    /// node's request is first built.
    pub fn sign_with(&mut self, signer: Arc<dyn Signer>) -> Result<&mut Self> {
        self.require_frozen()?;
        self.add_signer(signer);
        Ok(self)
    }

    /// Sign with the client's operator
    pub fn sign_with_operator(&mut self, client: &Client) -> Result<&mut Self> {
        let operator = client.operator().ok_or(Error::MissingOperator)?;
        self.freeze_with(client)?;
        self.add_signer(operator.signer().clone());
        Ok(self)
    }

    /// Attach a signature produced elsewhere for the body sent to `node_account_id`.
    /// The transaction id can no longer be regenerated afterwards.
    pub fn add_signature(
        &mut self,
        node_account_id: AccountId,
        public_key: PublicKey,
        signature: Vec<u8>,
    ) -> Result<&mut Self> {
        self.require_frozen()?;
        let index = self
            .node_account_ids
            .iter()
            .position(|id| *id == node_account_id)
            .ok_or_else(|| {
                Error::Config(format!("node {node_account_id} is not in the node list"))
            })?;
        self.signatures.insert((index, public_key), signature);
        self.has_raw_signatures = true;
        Ok(self)
    }

    /// Body bytes sent to `node_account_id`, for signing elsewhere
    pub fn body_bytes(&self, node_account_id: AccountId) -> Result<&[u8]> {
        self.require_frozen()?;
        self.node_account_ids
            .iter()
            .position(|id| *id == node_account_id)
            .and_then(|index| self.bodies.get(index))
            .map(Vec::as_slice)
            .ok_or_else(|| Error::Config(format!("node {node_account_id} is not in the node list")))
    }

    /// Signatures attached so far for `node_account_id`
    pub fn signatures_for(&self, node_account_id: AccountId) -> Vec<SignaturePair> {
        let Some(index) = self.node_account_ids.iter().position(|id| *id == node_account_id)
        else {
            return Vec::new();
        };
        self.pairs_for(index)
    }

    fn add_signer(&mut self, signer: Arc<dyn Signer>) {
        let public_key = signer.public_key();
        if !self.signers.iter().any(|s| s.public_key() == public_key) {
            self.signers.push(signer);
        }
    }

    fn pairs_for(&self, index: usize) -> Vec<SignaturePair> {
        self.signatures
            .iter()
            .filter(|((i, _), _)| *i == index)
            .map(|((_, public_key), signature)| SignaturePair {
                public_key: *public_key,
                signature: signature.clone(),
            })
            .collect()
    }

    async fn signed_envelope(&mut self, index: usize) -> Result<SignedTransaction> {
        let body = self.bodies.get(index).cloned().ok_or(Error::NotFrozen)?;
        for signer in self.signers.clone() {
            let key = (index, signer.public_key());
            if !self.signatures.contains_key(&key) {
                let signature = signer.sign(&body).await?;
                self.signatures.insert(key, signature);
            }
        }
        Ok(SignedTransaction {
            body_bytes: body,
            signatures: self.pairs_for(index),
        })
    }

    // ==================== Serialization ====================

    /// Every node's signed envelope, for hand-off to another party
    pub async fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.require_frozen()?;
        let mut envelopes = Vec::with_capacity(self.bodies.len());
        for index in 0..self.bodies.len() {
            envelopes.push(self.signed_envelope(index).await?);
        }
        Ok(encode_transaction_list(&envelopes))
    }

    /// SHA-384 of the envelope sent to the first node
    pub async fn transaction_hash(&mut self) -> Result<Vec<u8>> {
        self.require_frozen()?;
        let envelope = self.signed_envelope(0).await?;
        Ok(transaction_hash(&envelope.to_bytes()))
    }

    // ==================== Execution ====================

    /// Submit the transaction, retrying across nodes until one accepts it
    pub async fn execute(&mut self, client: &Client) -> Result<TransactionResponse> {
        if self.data.chunk_count() > 1 {
            return Err(Error::Config(format!(
                "payload spans {} transactions; execute each chunk with execute_all",
                self.data.chunk_count()
            )));
        }
        self.freeze_with(client)?;
        self.attach_operator(client);

        self.state = LifecycleState::Executing;
        let result = execute::execute(client, self).await;
        self.state = LifecycleState::Resolved;
        result
    }

    /// The operator signs whenever it pays
    fn attach_operator(&mut self, client: &Client) {
        let Some(operator) = client.operator() else {
            return;
        };
        if self.transaction_id.map(|id| id.account_id) == Some(operator.account_id()) {
            self.add_signer(operator.signer().clone());
        }
    }
}

#[async_trait]
impl<D: TransactionData> Execute for Transaction<D> {
    type Output = TransactionResponse;

    fn node_account_ids(&self) -> &[AccountId] {
        &self.node_account_ids
    }

    fn method(&self) -> (&'static str, &'static str) {
        self.data.kind().method()
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
    }

    fn retry_overrides(&self) -> RetryOverrides {
        self.overrides
    }

    async fn make_request(&mut self, _client: &Client, index: usize) -> Result<Bytes> {
        let envelope = Bytes::from(self.signed_envelope(index).await?.to_bytes());
        self.last_envelope = Some(envelope.clone());
        Ok(envelope)
    }

    fn classify(&self, response: &Response) -> Verdict {
        Verdict::for_precheck(response.status)
    }

    fn make_output(&self, _response: Response, node_account_id: AccountId) -> Result<TransactionResponse> {
        let transaction_id = self.transaction_id.ok_or(Error::NotFrozen)?;
        let hash = self
            .last_envelope
            .as_deref()
            .map(transaction_hash)
            .unwrap_or_default();
        Ok(TransactionResponse::new(node_account_id, transaction_id, hash))
    }

    fn can_regenerate(&self, client: &Client) -> bool {
        !self.explicit_transaction_id
            && !self.has_raw_signatures
            && self
                .regenerate_transaction_id
                .unwrap_or_else(|| client.default_regenerate_transaction_id())
    }

    fn regenerate(&mut self, _client: &Client) -> Result<()> {
        let payer = self.transaction_id.ok_or(Error::NotFrozen)?.account_id;
        self.transaction_id = Some(TransactionId::generate(payer));
        self.signatures.clear();
        self.build_bodies();
        Ok(())
    }
}

impl<D: TransactionData> fmt::Debug for Transaction<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("data", &self.data)
            .field("state", &self.state)
            .field("transaction_id", &self.transaction_id)
            .field("node_account_ids", &self.node_account_ids)
            .field("max_transaction_fee", &self.max_transaction_fee)
            .field("memo", &self.memo)
            .field("signers", &self.signers.len())
            .finish_non_exhaustive()
    }
}

impl Transaction<AnyTransactionData> {
    /// Rebuild a frozen transaction from [`Transaction::to_bytes`] output,
    /// signatures included
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let envelopes = decode_transaction_list(bytes)?;
        let first = envelopes
            .first()
            .ok_or_else(|| Error::Codec("empty transaction list".into()))?
            .body()?;

        let mut node_account_ids = Vec::with_capacity(envelopes.len());
        let mut bodies = Vec::with_capacity(envelopes.len());
        let mut signatures = BTreeMap::new();
        for (index, envelope) in envelopes.into_iter().enumerate() {
            let body = envelope.body()?;
            if body.kind != first.kind
                || body.transaction_id != first.transaction_id
                || body.data != first.data
            {
                return Err(Error::Codec(
                    "envelopes in one list must carry the same transaction".into(),
                ));
            }
            node_account_ids.push(body.node_account_id);
            for pair in envelope.signatures {
                signatures.insert((index, pair.public_key), pair.signature);
            }
            bodies.push(envelope.body_bytes);
        }

        let data = AnyTransactionData::decode(first.kind, &first.data)?;
        let mut tx = Transaction::from_data(data);
        tx.node_account_ids = node_account_ids;
        tx.transaction_id = Some(first.transaction_id);
        tx.explicit_transaction_id = true;
        tx.max_transaction_fee = Some(first.max_transaction_fee);
        tx.valid_duration = Duration::from_secs(first.valid_duration_secs);
        tx.memo = first.memo;
        tx.bodies = bodies;
        tx.has_raw_signatures = !signatures.is_empty();
        tx.signatures = signatures;
        tx.state = LifecycleState::Frozen;
        Ok(tx)
    }

    /// Narrow to a concrete kind
    pub fn downcast<D>(self) -> Result<Transaction<D>>
    where
        D: TransactionData + TryFrom<AnyTransactionData, Error = AnyTransactionData>,
    {
        let data = D::try_from(self.data).map_err(|other| {
            Error::Config(format!("transaction is a {}", other.kind().name()))
        })?;
        Ok(Transaction {
            data,
            state: self.state,
            node_account_ids: self.node_account_ids,
            transaction_id: self.transaction_id,
            explicit_transaction_id: self.explicit_transaction_id,
            max_transaction_fee: self.max_transaction_fee,
            valid_duration: self.valid_duration,
            memo: self.memo,
            regenerate_transaction_id: self.regenerate_transaction_id,
            overrides: self.overrides,
            signers: self.signers,
            bodies: self.bodies,
            signatures: self.signatures,
            has_raw_signatures: self.has_raw_signatures,
            last_envelope: self.last_envelope,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_primitives::Timestamp;

    fn frozen_transfer() -> TransferTransaction {
        let mut tx = TransferTransaction::new();
        tx.add_transfer(AccountId::from_num(2), Amount::from_tiny(-10))
            .unwrap()
            .add_transfer(AccountId::from_num(1001), Amount::from_tiny(10))
            .unwrap()
            .set_transaction_id(TransactionId::new(AccountId::from_num(2), Timestamp::new(100, 0)))
            .unwrap()
            .set_node_account_ids(vec![AccountId::from_num(3), AccountId::from_num(4)])
            .unwrap();
        tx.freeze().unwrap();
        tx
    }

    #[test]
    fn test_setters_guarded_after_freeze() {
        let mut tx = TransferTransaction::new();
        assert!(tx.set_transaction_memo("before").is_ok());

        let mut tx = frozen_transfer();
        assert_eq!(tx.state(), LifecycleState::Frozen);
        assert!(matches!(tx.set_transaction_memo("after"), Err(Error::FrozenState)));
        assert!(matches!(
            tx.set_max_transaction_fee(Amount::from_coins(1)),
            Err(Error::FrozenState)
        ));
        assert!(matches!(
            tx.add_transfer(AccountId::from_num(5), Amount::ZERO),
            Err(Error::FrozenState)
        ));
        assert!(matches!(tx.set_max_attempts(2), Err(Error::FrozenState)));
    }

    #[test]
    fn test_freeze_without_client_needs_id() {
        let mut tx = TransferTransaction::new();
        tx.set_node_account_ids(vec![AccountId::from_num(3)]).unwrap();
        assert!(matches!(tx.freeze(), Err(Error::MissingOperator)));
    }

    #[test]
    fn test_one_body_per_node() {
        let tx = frozen_transfer();
        let a = TransactionBody::from_bytes(tx.body_bytes(AccountId::from_num(3)).unwrap()).unwrap();
        let b = TransactionBody::from_bytes(tx.body_bytes(AccountId::from_num(4)).unwrap()).unwrap();
        assert_eq!(a.node_account_id, AccountId::from_num(3));
        assert_eq!(b.node_account_id, AccountId::from_num(4));
        assert_eq!(a.data, b.data);
        assert_eq!(a.max_transaction_fee, Amount::from_coins(1));
    }

    #[test]
    fn test_sign_requires_freeze() {
        let mut tx = TransferTransaction::new();
        assert!(matches!(tx.sign(PrivateKey::generate()), Err(Error::NotFrozen)));
    }

    #[tokio::test]
    async fn test_signatures_cover_each_node_body() {
        let key = PrivateKey::generate();
        let public = key.public_key();
        let mut tx = frozen_transfer();
        tx.sign(key).unwrap();

        let bytes = tx.to_bytes().await.unwrap();
        for envelope in decode_transaction_list(&bytes).unwrap() {
            assert_eq!(envelope.signatures.len(), 1);
            assert_eq!(envelope.signatures[0].public_key, public);
            envelope.verify().unwrap();
        }
    }

    #[tokio::test]
    async fn test_same_key_signs_once() {
        let key = PrivateKey::generate();
        let again = PrivateKey::from_bytes(&key.to_bytes()).unwrap();
        let mut tx = frozen_transfer();
        tx.sign(key).unwrap().sign(again).unwrap();
        tx.to_bytes().await.unwrap();
        assert_eq!(tx.signatures_for(AccountId::from_num(3)).len(), 1);
    }

    #[test]
    fn test_add_signature_unknown_node() {
        let key = PrivateKey::generate();
        let mut tx = frozen_transfer();
        let err = tx
            .add_signature(AccountId::from_num(99), key.public_key(), vec![0; 64])
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_transaction_hash_is_sha384() {
        let mut tx = frozen_transfer();
        assert_eq!(tx.transaction_hash().await.unwrap().len(), 48);
    }

    #[test]
    fn test_scheduled_body_excludes_id() {
        let a = frozen_transfer();
        let mut b = TransferTransaction::new();
        b.add_transfer(AccountId::from_num(2), Amount::from_tiny(-10))
            .unwrap()
            .add_transfer(AccountId::from_num(1001), Amount::from_tiny(10))
            .unwrap();
        assert_eq!(a.scheduled_body(), b.scheduled_body());
    }
}
