//! Handle to a submitted transaction

use meridian_primitives::{AccountId, TransactionId};

use crate::query::{TransactionReceiptQuery, TransactionRecordQuery};
use crate::{Client, Result, TransactionReceipt, TransactionRecord};

/// A node accepted the transaction. Consensus may still be pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionResponse {
    /// Node that accepted the transaction
    pub node_id: AccountId,
    /// Transaction id
    pub transaction_id: TransactionId,
    /// SHA-384 of the envelope sent to `node_id`
    pub transaction_hash: Vec<u8>,
    validate: bool,
}

impl TransactionResponse {
    pub(crate) fn new(node_id: AccountId, transaction_id: TransactionId, hash: Vec<u8>) -> Self {
        Self {
            node_id,
            transaction_id,
            transaction_hash: hash,
            validate: true,
        }
    }

    /// Whether a non-`SUCCESS` receipt fails [`TransactionResponse::get_receipt`]
    /// (default `true`)
    pub fn validate_status(&mut self, validate: bool) -> &mut Self {
        self.validate = validate;
        self
    }

    /// Receipt query for this transaction, addressed to the accepting node
    pub fn get_receipt_query(&self) -> TransactionReceiptQuery {
        let mut query = TransactionReceiptQuery::new();
        query
            .set_transaction_id(self.transaction_id)
            .set_node_account_ids(vec![self.node_id]);
        query
    }

    /// Record query for this transaction, addressed to the accepting node
    pub fn get_record_query(&self) -> TransactionRecordQuery {
        let mut query = TransactionRecordQuery::new();
        query
            .set_transaction_id(self.transaction_id)
            .set_node_account_ids(vec![self.node_id]);
        query
    }

    /// Poll until the ledger reaches consensus on the transaction
    pub async fn get_receipt(&self, client: &Client) -> Result<TransactionReceipt> {
        let receipt = self.get_receipt_query().execute(client).await?;
        if self.validate {
            receipt.validate_status(self.transaction_id)?;
        }
        Ok(receipt)
    }

    /// Wait for the receipt, then fetch the full record
    pub async fn get_record(&self, client: &Client) -> Result<TransactionRecord> {
        self.get_receipt(client).await?;
        self.get_record_query().execute(client).await
    }
}
