//! Record lookup

use meridian_primitives::{Status, TransactionId};
use rlp::RlpStream;

use super::{is_pending, Query, QueryData};
use crate::wire::{append_optional, Response};
use crate::{Result, TransactionRecord};

/// Full record of a transaction. Paid.
pub type TransactionRecordQuery = Query<TransactionRecordQueryData>;

/// Payload of a [`TransactionRecordQuery`]
#[derive(Debug, Clone, Default)]
pub struct TransactionRecordQueryData {
    transaction_id: Option<TransactionId>,
}

impl TransactionRecordQuery {
    /// Transaction to look up
    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.data().transaction_id
    }

    /// Set the transaction to look up
    pub fn set_transaction_id(&mut self, transaction_id: TransactionId) -> &mut Self {
        self.data_mut().transaction_id = Some(transaction_id);
        self
    }
}

impl QueryData for TransactionRecordQueryData {
    type Output = TransactionRecord;

    fn method(&self) -> (&'static str, &'static str) {
        ("CryptoService", "getTxRecordByTxID")
    }

    fn encode_body(&self) -> Vec<u8> {
        let mut s = RlpStream::new_list(1);
        append_optional(&mut s, self.transaction_id.as_ref());
        s.out().to_vec()
    }

    fn decode_output(&self, response: Response) -> Result<TransactionRecord> {
        TransactionRecord::from_bytes(&response.payload)
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
    }

    fn retry_precheck(&self, status: Status) -> bool {
        is_pending(status)
    }

    fn retry_answer(&self, response: &Response) -> bool {
        TransactionRecord::from_bytes(&response.payload)
            .map(|record| is_pending(record.receipt.status))
            .unwrap_or(false)
    }
}
