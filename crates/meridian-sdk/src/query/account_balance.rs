//! Account balance lookup

use meridian_primitives::{AccountId, Amount, LedgerId};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

use super::{Query, QueryData};
use crate::wire::{amount_at, append_amount, append_optional, expect_items, Response};
use crate::Result;

/// Balance of an account. Free.
pub type AccountBalanceQuery = Query<AccountBalanceQueryData>;

/// Payload of an [`AccountBalanceQuery`]
#[derive(Debug, Clone, Default)]
pub struct AccountBalanceQueryData {
    account_id: Option<AccountId>,
}

/// Answer to an [`AccountBalanceQuery`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBalance {
    /// Account the balance belongs to
    pub account_id: AccountId,
    /// Balance in tiny units
    pub balance: Amount,
}

impl AccountBalance {
    /// Encode to RLP
    pub fn to_bytes(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    /// Decode from RLP
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(rlp::decode(bytes)?)
    }
}

impl Encodable for AccountBalance {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.account_id);
        append_amount(s, self.balance);
    }
}

impl Decodable for AccountBalance {
    fn decode(rlp: &Rlp) -> std::result::Result<Self, DecoderError> {
        expect_items(rlp, 2)?;
        Ok(Self {
            account_id: rlp.val_at(0)?,
            balance: amount_at(rlp, 1)?,
        })
    }
}

impl AccountBalanceQuery {
    /// Account to look up
    pub fn account_id(&self) -> Option<AccountId> {
        self.data().account_id
    }

    /// Set the account to look up
    pub fn set_account_id(&mut self, account_id: AccountId) -> &mut Self {
        self.data_mut().account_id = Some(account_id);
        self
    }
}

impl QueryData for AccountBalanceQueryData {
    type Output = AccountBalance;

    fn method(&self) -> (&'static str, &'static str) {
        ("CryptoService", "cryptoGetBalance")
    }

    fn encode_body(&self) -> Vec<u8> {
        let mut s = RlpStream::new_list(1);
        append_optional(&mut s, self.account_id.as_ref());
        s.out().to_vec()
    }

    fn decode_output(&self, response: Response) -> Result<AccountBalance> {
        AccountBalance::from_bytes(&response.payload)
    }

    fn is_payment_required(&self) -> bool {
        false
    }

    fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
        if let Some(account_id) = self.account_id {
            account_id.validate_checksum(ledger)?;
        }
        Ok(())
    }
}
