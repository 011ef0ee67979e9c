//! Account creation

use std::time::Duration;

use meridian_crypto::PublicKey;
use meridian_primitives::Amount;
use rlp::{Rlp, RlpStream};

use super::{FromBody, Transaction, TransactionData, TransactionKind};
use crate::wire::{amount_at, append_amount, expect_items};
use crate::{Error, Result};

/// Default interval after which the account's renewal fee is charged
pub const DEFAULT_AUTO_RENEW_PERIOD: Duration = Duration::from_secs(90 * 24 * 60 * 60);

/// Creates an account. The new id is in the receipt.
pub type AccountCreateTransaction = Transaction<AccountCreateTransactionData>;

/// Payload of an [`AccountCreateTransaction`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountCreateTransactionData {
    key: Option<PublicKey>,
    initial_balance: Amount,
    receiver_signature_required: bool,
    auto_renew_period: Duration,
    account_memo: String,
}

impl Default for AccountCreateTransactionData {
    fn default() -> Self {
        Self {
            key: None,
            initial_balance: Amount::ZERO,
            receiver_signature_required: false,
            auto_renew_period: DEFAULT_AUTO_RENEW_PERIOD,
            account_memo: String::new(),
        }
    }
}

impl AccountCreateTransaction {
    /// Key controlling the new account
    pub fn key(&self) -> Option<PublicKey> {
        self.data().key
    }

    /// Set the controlling key
    pub fn set_key(&mut self, key: PublicKey) -> Result<&mut Self> {
        self.data_mut()?.key = Some(key);
        Ok(self)
    }

    /// Balance moved from the payer into the new account
    pub fn initial_balance(&self) -> Amount {
        self.data().initial_balance
    }

    /// Set the starting balance
    pub fn set_initial_balance(&mut self, balance: Amount) -> Result<&mut Self> {
        if balance.is_negative() {
            return Err(Error::Config(format!("initial balance {balance} is negative")));
        }
        self.data_mut()?.initial_balance = balance;
        Ok(self)
    }

    /// Whether incoming transfers need the new account's signature
    pub fn receiver_signature_required(&self) -> bool {
        self.data().receiver_signature_required
    }

    /// Require the account's signature on incoming transfers
    pub fn set_receiver_signature_required(&mut self, required: bool) -> Result<&mut Self> {
        self.data_mut()?.receiver_signature_required = required;
        Ok(self)
    }

    /// Renewal interval
    pub fn auto_renew_period(&self) -> Duration {
        self.data().auto_renew_period
    }

    /// Set the renewal interval (whole seconds)
    pub fn set_auto_renew_period(&mut self, period: Duration) -> Result<&mut Self> {
        self.data_mut()?.auto_renew_period = period;
        Ok(self)
    }

    /// Memo stored on the account
    pub fn account_memo(&self) -> &str {
        &self.data().account_memo
    }

    /// Set the account memo
    pub fn set_account_memo(&mut self, memo: impl Into<String>) -> Result<&mut Self> {
        self.data_mut()?.account_memo = memo.into();
        Ok(self)
    }
}

impl TransactionData for AccountCreateTransactionData {
    fn kind(&self) -> TransactionKind {
        TransactionKind::AccountCreate
    }

    fn encode_body(&self) -> Vec<u8> {
        let key = self
            .key
            .map(|key| key.to_bytes().to_vec())
            .unwrap_or_default();
        let mut s = RlpStream::new_list(5);
        s.append(&key);
        append_amount(&mut s, self.initial_balance);
        s.append(&u8::from(self.receiver_signature_required));
        s.append(&self.auto_renew_period.as_secs());
        s.append(&self.account_memo);
        s.out().to_vec()
    }

    fn default_max_transaction_fee(&self) -> Amount {
        Amount::from_coins(5)
    }

    fn validate(&self) -> Result<()> {
        if self.key.is_none() {
            return Err(Error::Config("account create requires a key".into()));
        }
        Ok(())
    }
}

impl FromBody for AccountCreateTransactionData {
    fn from_body(bytes: &[u8]) -> Result<Self> {
        let rlp = Rlp::new(bytes);
        expect_items(&rlp, 5)?;
        let key: Vec<u8> = rlp.val_at(0)?;
        let key = if key.is_empty() {
            None
        } else {
            Some(PublicKey::from_bytes(&key).map_err(|e| Error::Codec(e.to_string()))?)
        };
        Ok(Self {
            key,
            initial_balance: amount_at(&rlp, 1)?,
            receiver_signature_required: rlp.val_at::<u8>(2)? != 0,
            auto_renew_period: Duration::from_secs(rlp.val_at(3)?),
            account_memo: rlp.val_at(4)?,
        })
    }
}
