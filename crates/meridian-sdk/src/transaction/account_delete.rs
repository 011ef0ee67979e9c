//! Account deletion

use meridian_primitives::{AccountId, Amount, LedgerId};
use rlp::{Rlp, RlpStream};

use super::{FromBody, Transaction, TransactionData, TransactionKind};
use crate::wire::{append_optional, expect_items, optional_at};
use crate::{Error, Result};

/// Deletes an account, sweeping its balance into another
pub type AccountDeleteTransaction = Transaction<AccountDeleteTransactionData>;

/// Payload of an [`AccountDeleteTransaction`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountDeleteTransactionData {
    account_id: Option<AccountId>,
    transfer_account_id: Option<AccountId>,
}

impl AccountDeleteTransaction {
    /// Account to delete
    pub fn account_id(&self) -> Option<AccountId> {
        self.data().account_id
    }

    /// Set the account to delete
    pub fn set_account_id(&mut self, account_id: AccountId) -> Result<&mut Self> {
        self.data_mut()?.account_id = Some(account_id);
        Ok(self)
    }

    /// Account receiving the remaining balance
    pub fn transfer_account_id(&self) -> Option<AccountId> {
        self.data().transfer_account_id
    }

    /// Set the account receiving the remaining balance
    pub fn set_transfer_account_id(&mut self, account_id: AccountId) -> Result<&mut Self> {
        self.data_mut()?.transfer_account_id = Some(account_id);
        Ok(self)
    }
}

impl TransactionData for AccountDeleteTransactionData {
    fn kind(&self) -> TransactionKind {
        TransactionKind::AccountDelete
    }

    fn encode_body(&self) -> Vec<u8> {
        let mut s = RlpStream::new_list(2);
        append_optional(&mut s, self.account_id.as_ref());
        append_optional(&mut s, self.transfer_account_id.as_ref());
        s.out().to_vec()
    }

    fn default_max_transaction_fee(&self) -> Amount {
        Amount::from_coins(2)
    }

    fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
        for id in [self.account_id, self.transfer_account_id].iter().flatten() {
            id.validate_checksum(ledger)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.transfer_account_id.is_none() {
            return Err(Error::Config("account delete requires a transfer account".into()));
        }
        Ok(())
    }
}

impl FromBody for AccountDeleteTransactionData {
    fn from_body(bytes: &[u8]) -> Result<Self> {
        let rlp = Rlp::new(bytes);
        expect_items(&rlp, 2)?;
        Ok(Self {
            account_id: optional_at(&rlp, 0)?,
            transfer_account_id: optional_at(&rlp, 1)?,
        })
    }
}
