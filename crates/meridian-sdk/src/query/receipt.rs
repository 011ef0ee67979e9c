//! Receipt polling

use meridian_primitives::{Status, TransactionId};
use rlp::RlpStream;

use super::{is_pending, Query, QueryData};
use crate::wire::{append_optional, Response};
use crate::{Result, TransactionReceipt};

/// Receipt of a transaction. Free, and retried while consensus is pending.
pub type TransactionReceiptQuery = Query<TransactionReceiptQueryData>;

/// Payload of a [`TransactionReceiptQuery`]
#[derive(Debug, Clone, Default)]
pub struct TransactionReceiptQueryData {
    transaction_id: Option<TransactionId>,
}

impl TransactionReceiptQuery {
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

fn receipt_status(response: &Response) -> Option<Status> {
    TransactionReceipt::from_bytes(&response.payload)
        .ok()
        .map(|receipt| receipt.status)
}

impl QueryData for TransactionReceiptQueryData {
    type Output = TransactionReceipt;

    fn method(&self) -> (&'static str, &'static str) {
        ("CryptoService", "getTransactionReceipts")
    }

    fn encode_body(&self) -> Vec<u8> {
        let mut s = RlpStream::new_list(1);
        append_optional(&mut s, self.transaction_id.as_ref());
        s.out().to_vec()
    }

    fn decode_output(&self, response: Response) -> Result<TransactionReceipt> {
        TransactionReceipt::from_bytes(&response.payload)
    }

    fn is_payment_required(&self) -> bool {
        false
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
    }

    fn retry_precheck(&self, status: Status) -> bool {
        is_pending(status)
    }

    fn retry_answer(&self, response: &Response) -> bool {
        receipt_status(response).is_some_and(is_pending)
    }

    fn error_status(&self, response: &Response) -> Status {
        if response.status == Status::Ok {
            return receipt_status(response).unwrap_or(response.status);
        }
        response.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execute::{Execute, Verdict};
    use meridian_primitives::AccountId;

    fn answer(status: Status) -> Response {
        Response::with_payload(Status::Ok, TransactionReceipt::new(status).to_bytes())
    }

    #[test]
    fn test_pending_receipts_retry() {
        let query = TransactionReceiptQuery::new();
        assert_eq!(query.classify(&answer(Status::Unknown)), Verdict::Retry);
        assert_eq!(query.classify(&Response::new(Status::ReceiptNotFound)), Verdict::Retry);
        assert_eq!(query.classify(&answer(Status::Success)), Verdict::Accept);
        // terminal failures are still answers
        assert_eq!(query.classify(&answer(Status::InvalidSignature)), Verdict::Accept);
    }

    #[test]
    fn test_error_reports_receipt_status() {
        let mut query = TransactionReceiptQuery::new();
        let id = TransactionId::generate(AccountId::from_num(2));
        query.set_transaction_id(id);
        match query.make_error(&answer(Status::Unknown)) {
            crate::Error::Precheck { status, transaction_id } => {
                assert_eq!(status, Status::Unknown);
                assert_eq!(transaction_id, Some(id));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
