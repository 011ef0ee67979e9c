//! Consensus outcomes: receipts and records

use meridian_primitives::{AccountId, Amount, FileId, Status, Timestamp, TransactionId};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

use crate::wire::{
    amount_at, append_amount, append_optional, append_transfers, expect_items, optional_at,
    transfers_at,
};
use crate::{Error, Result};

/// Outcome of a transaction once the ledger has reached consensus on it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    /// Consensus status. `UNKNOWN` until consensus is reached.
    pub status: Status,
    /// Account created by the transaction
    pub account_id: Option<AccountId>,
    /// File created by the transaction
    pub file_id: Option<FileId>,
}

impl TransactionReceipt {
    /// Receipt carrying only a status
    pub fn new(status: Status) -> Self {
        Self {
            status,
            account_id: None,
            file_id: None,
        }
    }

    /// Fail with [`Error::ReceiptStatus`] unless the status is `SUCCESS`
    pub fn validate_status(&self, transaction_id: TransactionId) -> Result<()> {
        if self.status != Status::Success {
            return Err(Error::ReceiptStatus {
                status: self.status,
                transaction_id,
            });
        }
        Ok(())
    }

    /// Encode to RLP
    pub fn to_bytes(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    /// Decode from RLP
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(rlp::decode(bytes)?)
    }
}

impl Encodable for TransactionReceipt {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.status);
        append_optional(s, self.account_id.as_ref());
        append_optional(s, self.file_id.as_ref());
    }
}

impl Decodable for TransactionReceipt {
    fn decode(rlp: &Rlp) -> std::result::Result<Self, DecoderError> {
        expect_items(rlp, 3)?;
        Ok(Self {
            status: rlp.val_at(0)?,
            account_id: optional_at(rlp, 1)?,
            file_id: optional_at(rlp, 2)?,
        })
    }
}

/// Full consensus record of a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    /// Receipt
    pub receipt: TransactionReceipt,
    /// SHA-384 of the submitted envelope
    pub transaction_hash: Vec<u8>,
    /// When consensus was reached
    pub consensus_timestamp: Timestamp,
    /// Transaction id
    pub transaction_id: TransactionId,
    /// Memo as submitted
    pub memo: String,
    /// Fee actually charged
    pub transaction_fee: Amount,
    /// Every balance change the transaction caused
    pub transfers: Vec<(AccountId, Amount)>,
}

impl TransactionRecord {
    /// Encode to RLP
    pub fn to_bytes(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    /// Decode from RLP
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(rlp::decode(bytes)?)
    }
}

impl Encodable for TransactionRecord {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(8);
        s.append(&self.receipt);
        s.append(&self.transaction_hash);
        s.append(&self.consensus_timestamp.seconds);
        s.append(&self.consensus_timestamp.nanos);
        s.append(&self.transaction_id);
        s.append(&self.memo);
        append_amount(s, self.transaction_fee);
        append_transfers(s, &self.transfers);
    }
}

impl Decodable for TransactionRecord {
    fn decode(rlp: &Rlp) -> std::result::Result<Self, DecoderError> {
        expect_items(rlp, 8)?;
        Ok(Self {
            receipt: rlp.val_at(0)?,
            transaction_hash: rlp.val_at(1)?,
            consensus_timestamp: Timestamp::new(rlp.val_at(2)?, rlp.val_at(3)?),
            transaction_id: rlp.val_at(4)?,
            memo: rlp.val_at(5)?,
            transaction_fee: amount_at(rlp, 6)?,
            transfers: transfers_at(rlp, 7)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_optional_ids() {
        let receipt = TransactionReceipt {
            account_id: Some(AccountId::from_num(1234)),
            ..TransactionReceipt::new(Status::Success)
        };
        let decoded = TransactionReceipt::from_bytes(&receipt.to_bytes()).unwrap();
        assert_eq!(decoded, receipt);
        assert!(decoded.file_id.is_none());
    }

    #[test]
    fn test_validate_status() {
        let id = TransactionId::new(AccountId::from_num(2), Timestamp::new(1, 0));
        assert!(TransactionReceipt::new(Status::Success).validate_status(id).is_ok());

        let err = TransactionReceipt::new(Status::InsufficientPayerBalance)
            .validate_status(id)
            .unwrap_err();
        assert_eq!(err.status(), Some(Status::InsufficientPayerBalance));
        assert!(matches!(err, Error::ReceiptStatus { .. }));
    }

    #[test]
    fn test_record_decode() {
        let record = TransactionRecord {
            receipt: TransactionReceipt::new(Status::Success),
            transaction_hash: vec![7; 48],
            consensus_timestamp: Timestamp::new(1_700_000_000, 42),
            transaction_id: TransactionId::new(AccountId::from_num(2), Timestamp::new(1, 0)),
            memo: "rent".into(),
            transaction_fee: Amount::from_tiny(83_000),
            transfers: vec![
                (AccountId::from_num(2), Amount::from_tiny(-100)),
                (AccountId::from_num(3), Amount::from_tiny(100)),
            ],
        };
        assert_eq!(TransactionRecord::from_bytes(&record.to_bytes()).unwrap(), record);
    }
}
