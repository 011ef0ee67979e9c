//! Currency transfer

use meridian_primitives::{AccountId, Amount, LedgerId};
use rlp::{Rlp, RlpStream};

use super::{FromBody, Transaction, TransactionData, TransactionKind};
use crate::wire::{append_transfers, expect_items, transfers_at};
use crate::Result;

/// Moves currency between accounts. The amounts are expected to sum to zero.
pub type TransferTransaction = Transaction<TransferTransactionData>;

/// Payload of a [`TransferTransaction`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferTransactionData {
    transfers: Vec<(AccountId, Amount)>,
}

impl TransferTransactionData {
    pub(crate) fn with_transfers(transfers: Vec<(AccountId, Amount)>) -> Self {
        Self { transfers }
    }

    /// Balance changes, in the order added
    pub fn transfers(&self) -> &[(AccountId, Amount)] {
        &self.transfers
    }
}

impl TransferTransaction {
    /// Add `amount` to `account_id` (negative to debit)
    pub fn add_transfer(&mut self, account_id: AccountId, amount: Amount) -> Result<&mut Self> {
        self.data_mut()?.transfers.push((account_id, amount));
        Ok(self)
    }

    /// Balance changes, in the order added
    pub fn transfers(&self) -> &[(AccountId, Amount)] {
        self.data().transfers()
    }
}

impl TransactionData for TransferTransactionData {
    fn kind(&self) -> TransactionKind {
        TransactionKind::Transfer
    }

    fn encode_body(&self) -> Vec<u8> {
        let mut s = RlpStream::new_list(1);
        append_transfers(&mut s, &self.transfers);
        s.out().to_vec()
    }

    fn default_max_transaction_fee(&self) -> Amount {
        Amount::from_coins(1)
    }

    fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
        for (account_id, _) in &self.transfers {
            account_id.validate_checksum(ledger)?;
        }
        Ok(())
    }
}

impl FromBody for TransferTransactionData {
    fn from_body(bytes: &[u8]) -> Result<Self> {
        let rlp = Rlp::new(bytes);
        expect_items(&rlp, 1)?;
        Ok(Self {
            transfers: transfers_at(&rlp, 0)?,
        })
    }
}
