//! Read operations
//!
//! A [`Query`] runs through the same retry loop as transactions. Paid queries
//! first ask a node for their price (unless the caller fixed the payment), fail
//! with [`Error::MaxQueryPaymentExceeded`] when it is above the allowed maximum,
//! and then attach a per-node payment transfer from the operator.

mod account_balance;
mod account_records;
mod receipt;
mod record;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use meridian_primitives::{AccountId, Amount, LedgerId, Status, TransactionId};
use tracing::debug;

use crate::execute::{self, Execute, RetryOverrides, Verdict};
use crate::transaction::{
    TransactionData, TransactionKind, TransferTransactionData, DEFAULT_TRANSACTION_VALID_DURATION,
};
use crate::wire::{QueryRequest, Response, ResponseType, SignaturePair, SignedTransaction, TransactionBody};
use crate::{Client, Error, Operator, Result};

pub use account_balance::{AccountBalance, AccountBalanceQuery, AccountBalanceQueryData};
pub use account_records::{encode_records, AccountRecordsQuery, AccountRecordsQueryData};
pub use receipt::{TransactionReceiptQuery, TransactionReceiptQueryData};
pub use record::{TransactionRecordQuery, TransactionRecordQueryData};

/// Fee cap on query payment transfers when the client sets no default
const DEFAULT_PAYMENT_FEE: Amount = Amount::from_coins(1);

/// Kind-specific part of a query
pub trait QueryData: Clone + fmt::Debug + Send + Sync + 'static {
    /// Decoded answer
    type Output: Send;

    /// Service and method the query is sent to
    fn method(&self) -> (&'static str, &'static str);

    /// Encode the kind-specific query body
    fn encode_body(&self) -> Vec<u8>;

    /// Decode the answer
    fn decode_output(&self, response: Response) -> Result<Self::Output>;

    /// Whether the node charges for the answer
    fn is_payment_required(&self) -> bool {
        true
    }

    /// Check every entity id the query carries against `ledger`
    fn validate_checksums(&self, _ledger: &LedgerId) -> Result<()> {
        Ok(())
    }

    /// Transaction the query is about, if any
    fn transaction_id(&self) -> Option<TransactionId> {
        None
    }

    /// Extra precheck statuses worth retrying
    fn retry_precheck(&self, _status: Status) -> bool {
        false
    }

    /// Whether an accepted answer is not final yet
    fn retry_answer(&self, _response: &Response) -> bool {
        false
    }

    /// Status reported when the query fails on `response`
    fn error_status(&self, response: &Response) -> Status {
        response.status
    }
}

/// Statuses meaning the ledger does not know the outcome yet
pub(crate) fn is_pending(status: Status) -> bool {
    matches!(
        status,
        Status::Ok
            | Status::Unknown
            | Status::Busy
            | Status::ReceiptNotFound
            | Status::RecordNotFound
            | Status::PlatformNotActive
    )
}

#[derive(Clone)]
struct Payment {
    amount: Amount,
    payer: Arc<Operator>,
    fee: Amount,
}

/// A query of kind `D`
#[derive(Clone)]
pub struct Query<D> {
    data: D,
    node_account_ids: Vec<AccountId>,
    payment_amount: Option<Amount>,
    max_query_payment: Option<Amount>,
    payment_transaction_id: Option<TransactionId>,
    explicit_payment_id: bool,
    overrides: RetryOverrides,
    // per execution
    nodes: Vec<AccountId>,
    mode: ResponseType,
    payment: Option<Payment>,
}

impl<D: QueryData + Default> Query<D> {
    /// Empty query
    pub fn new() -> Self {
        Self {
            data: D::default(),
            node_account_ids: Vec::new(),
            payment_amount: None,
            max_query_payment: None,
            payment_transaction_id: None,
            explicit_payment_id: false,
            overrides: RetryOverrides::default(),
            nodes: Vec::new(),
            mode: ResponseType::Answer,
            payment: None,
        }
    }
}

impl<D: QueryData + Default> Default for Query<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: QueryData> Query<D> {
    /// Kind-specific part
    pub fn data(&self) -> &D {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut D {
        &mut self.data
    }

    // ==================== Properties ====================

    /// Explicit node list; empty means drawn from the registry
    pub fn node_account_ids(&self) -> &[AccountId] {
        &self.node_account_ids
    }

    /// Query only these nodes
    pub fn set_node_account_ids(&mut self, ids: Vec<AccountId>) -> &mut Self {
        self.node_account_ids = ids;
        self
    }

    /// Explicit payment, if set
    pub fn payment_amount(&self) -> Option<Amount> {
        self.payment_amount
    }

    /// Pay exactly `amount` and skip the cost lookup
    pub fn set_payment_amount(&mut self, amount: Amount) -> &mut Self {
        self.payment_amount = Some(amount);
        self
    }

    /// Per-query cost ceiling, overriding the client's
    pub fn set_max_query_payment(&mut self, max: Amount) -> &mut Self {
        self.max_query_payment = Some(max);
        self
    }

    /// Payment transaction id of the last paid execution
    pub fn payment_transaction_id(&self) -> Option<TransactionId> {
        self.payment_transaction_id
    }

    /// Use an explicit payment transaction id. Explicit ids are never regenerated.
    pub fn set_payment_transaction_id(&mut self, id: TransactionId) -> &mut Self {
        self.payment_transaction_id = Some(id);
        self.explicit_payment_id = true;
        self
    }

    /// Override the client's attempt cap
    pub fn set_max_attempts(&mut self, max_attempts: u32) -> &mut Self {
        self.overrides.max_attempts = Some(max_attempts);
        self
    }

    /// Override the client's first retry wait
    pub fn set_min_backoff(&mut self, min_backoff: Duration) -> &mut Self {
        self.overrides.min_backoff = Some(min_backoff);
        self
    }

    /// Override the client's retry wait cap
    pub fn set_max_backoff(&mut self, max_backoff: Duration) -> &mut Self {
        self.overrides.max_backoff = Some(max_backoff);
        self
    }

    // ==================== Execution ====================

    /// Price of the answer; zero for free queries
    pub async fn get_cost(&mut self, client: &Client) -> Result<Amount> {
        self.prepare(client)?;
        if !self.data.is_payment_required() {
            return Ok(Amount::ZERO);
        }
        self.fetch_cost(client).await
    }

    /// Run the query, paying for it first when required
    pub async fn execute(&mut self, client: &Client) -> Result<D::Output> {
        self.prepare(client)?;

        if self.data.is_payment_required() {
            let payer = client.operator().ok_or(Error::MissingOperator)?;
            let amount = match self.payment_amount {
                Some(amount) => amount,
                None => {
                    let cost = self.fetch_cost(client).await?;
                    let max = self
                        .max_query_payment
                        .unwrap_or_else(|| client.max_query_payment());
                    if cost > max {
                        return Err(Error::MaxQueryPaymentExceeded { cost, max });
                    }
                    cost
                }
            };
            if !self.explicit_payment_id {
                self.payment_transaction_id = Some(TransactionId::generate(payer.account_id()));
            }
            let fee = client
                .default_max_transaction_fee()
                .unwrap_or(DEFAULT_PAYMENT_FEE);
            self.payment = Some(Payment { amount, payer, fee });
        }

        self.mode = ResponseType::Answer;
        let response = execute::execute(client, self).await?;
        self.data.decode_output(response)
    }

    fn prepare(&mut self, client: &Client) -> Result<()> {
        self.overrides.check()?;
        if client.auto_validate_checksums() {
            if let Some(ledger) = client.ledger_id() {
                for node in &self.node_account_ids {
                    node.validate_checksum(&ledger)?;
                }
                self.data.validate_checksums(&ledger)?;
            }
        }
        self.nodes = if self.node_account_ids.is_empty() {
            client.network().node_account_ids_for_transaction()?
        } else {
            self.node_account_ids.clone()
        };
        self.payment = None;
        Ok(())
    }

    async fn fetch_cost(&mut self, client: &Client) -> Result<Amount> {
        self.mode = ResponseType::CostOnly;
        let response = execute::execute(client, self).await?;
        debug!(cost = %response.cost, "Query cost");
        Ok(response.cost)
    }

    async fn payment_envelope(&self, payment: &Payment, index: usize) -> Result<SignedTransaction> {
        let node = *self.nodes.get(index).ok_or(Error::NoNodes)?;
        let transaction_id = self.payment_transaction_id.ok_or(Error::MissingOperator)?;
        let payer = payment.payer.account_id();
        let transfer = TransferTransactionData::with_transfers(vec![
            (payer, -payment.amount),
            (node, payment.amount),
        ]);
        let body_bytes = TransactionBody {
            kind: TransactionKind::Transfer,
            transaction_id,
            node_account_id: node,
            max_transaction_fee: payment.fee,
            valid_duration_secs: DEFAULT_TRANSACTION_VALID_DURATION.as_secs(),
            memo: String::new(),
            data: transfer.encode_body(),
        }
        .to_bytes();
        let signature = payment.payer.signer().sign(&body_bytes).await?;
        Ok(SignedTransaction {
            body_bytes,
            signatures: vec![SignaturePair {
                public_key: payment.payer.public_key(),
                signature,
            }],
        })
    }
}

#[async_trait]
impl<D: QueryData> Execute for Query<D> {
    type Output = Response;

    fn node_account_ids(&self) -> &[AccountId] {
        &self.nodes
    }

    fn method(&self) -> (&'static str, &'static str) {
        self.data.method()
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        self.data.transaction_id().or(self.payment_transaction_id)
    }

    fn retry_overrides(&self) -> RetryOverrides {
        self.overrides
    }

    async fn make_request(&mut self, _client: &Client, index: usize) -> Result<Bytes> {
        let payment = match (self.mode, self.payment.as_ref()) {
            (ResponseType::Answer, Some(payment)) => Some(self.payment_envelope(payment, index).await?),
            _ => None,
        };
        let request = QueryRequest {
            response_type: self.mode,
            payment,
            body: self.data.encode_body(),
        };
        Ok(Bytes::from(request.to_bytes()))
    }

    fn classify(&self, response: &Response) -> Verdict {
        if response.status == Status::Ok {
            if self.mode == ResponseType::Answer && self.data.retry_answer(response) {
                return Verdict::Retry;
            }
            return Verdict::Accept;
        }
        if self.data.retry_precheck(response.status) {
            return Verdict::Retry;
        }
        Verdict::for_precheck(response.status)
    }

    fn make_output(&self, response: Response, _node_account_id: AccountId) -> Result<Response> {
        Ok(response)
    }

    fn make_error(&self, response: &Response) -> Error {
        Error::precheck(self.data.error_status(response), Execute::transaction_id(self))
    }

    fn can_regenerate(&self, client: &Client) -> bool {
        self.mode == ResponseType::Answer
            && self.payment.is_some()
            && !self.explicit_payment_id
            && client.default_regenerate_transaction_id()
    }

    fn regenerate(&mut self, _client: &Client) -> Result<()> {
        let payer = self
            .payment
            .as_ref()
            .map(|payment| payment.payer.account_id())
            .ok_or(Error::MissingOperator)?;
        self.payment_transaction_id = Some(TransactionId::generate(payer));
        Ok(())
    }
}

impl<D: QueryData> fmt::Debug for Query<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("data", &self.data)
            .field("node_account_ids", &self.node_account_ids)
            .field("payment_amount", &self.payment_amount)
            .field("max_query_payment", &self.max_query_payment)
            .finish_non_exhaustive()
    }
}
