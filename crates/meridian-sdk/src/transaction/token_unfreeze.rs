//! Token unfreeze

use meridian_primitives::{AccountId, Amount, LedgerId, TokenId};
use rlp::{Rlp, RlpStream};

use super::{FromBody, Transaction, TransactionData, TransactionKind};
use crate::wire::{append_optional, expect_items, optional_at};
use crate::{Error, Result};

/// Lets an account transfer a token again after it was frozen. Must be signed
/// by the token's freeze key.
pub type TokenUnfreezeTransaction = Transaction<TokenUnfreezeTransactionData>;

/// Payload of a [`TokenUnfreezeTransaction`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUnfreezeTransactionData {
    token_id: Option<TokenId>,
    account_id: Option<AccountId>,
}

impl TokenUnfreezeTransaction {
    /// Token to unfreeze
    pub fn token_id(&self) -> Option<TokenId> {
        self.data().token_id
    }

    /// Set the token to unfreeze
    pub fn set_token_id(&mut self, token_id: TokenId) -> Result<&mut Self> {
        self.data_mut()?.token_id = Some(token_id);
        Ok(self)
    }

    /// Account the token is unfrozen for
    pub fn account_id(&self) -> Option<AccountId> {
        self.data().account_id
    }

    /// Set the account the token is unfrozen for
    pub fn set_account_id(&mut self, account_id: AccountId) -> Result<&mut Self> {
        self.data_mut()?.account_id = Some(account_id);
        Ok(self)
    }
}

impl TransactionData for TokenUnfreezeTransactionData {
    fn kind(&self) -> TransactionKind {
        TransactionKind::TokenUnfreeze
    }

    fn encode_body(&self) -> Vec<u8> {
        let mut s = RlpStream::new_list(2);
        append_optional(&mut s, self.token_id.as_ref());
        append_optional(&mut s, self.account_id.as_ref());
        s.out().to_vec()
    }

    fn default_max_transaction_fee(&self) -> Amount {
        Amount::from_coins(30)
    }

    fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
        for id in [self.token_id, self.account_id].iter().flatten() {
            id.validate_checksum(ledger)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.token_id.is_none() || self.account_id.is_none() {
            return Err(Error::Config("token unfreeze requires a token and an account".into()));
        }
        Ok(())
    }
}

impl FromBody for TokenUnfreezeTransactionData {
    fn from_body(bytes: &[u8]) -> Result<Self> {
        let rlp = Rlp::new(bytes);
        expect_items(&rlp, 2)?;
        Ok(Self {
            token_id: optional_at(&rlp, 0)?,
            account_id: optional_at(&rlp, 1)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_primitives::EntityId;

    #[test]
    fn test_checksums_of_both_ids() {
        let mut tx = TokenUnfreezeTransaction::new();
        tx.set_token_id(EntityId::parse("0.0.1001-eevit").unwrap())
            .unwrap()
            .set_account_id(EntityId::parse("0.0.3-dmqui").unwrap())
            .unwrap();
        assert!(tx.data().validate_checksums(&LedgerId::Testnet).is_ok());
        assert!(matches!(
            tx.data().validate_checksums(&LedgerId::Mainnet),
            Err(Error::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_requires_both_ids() {
        let mut tx = TokenUnfreezeTransaction::new();
        tx.set_token_id(TokenId::from_num(1001)).unwrap();
        assert!(matches!(tx.data().validate(), Err(Error::Config(_))));
    }
}
