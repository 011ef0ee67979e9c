//! Recent records of an account

use meridian_primitives::{AccountId, LedgerId};
use rlp::{Rlp, RlpStream};

use super::{Query, QueryData};
use crate::wire::{append_optional, Response};
use crate::{Error, Result, TransactionRecord};

/// Records of the recent transactions an account paid for or took part in. Paid.
pub type AccountRecordsQuery = Query<AccountRecordsQueryData>;

/// Payload of an [`AccountRecordsQuery`]
#[derive(Debug, Clone, Default)]
pub struct AccountRecordsQueryData {
    account_id: Option<AccountId>,
}

impl AccountRecordsQuery {
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

/// Encode an answer to an [`AccountRecordsQuery`]
pub fn encode_records(records: &[TransactionRecord]) -> Vec<u8> {
    rlp::encode_list::<TransactionRecord, _>(records).to_vec()
}

impl QueryData for AccountRecordsQueryData {
    type Output = Vec<TransactionRecord>;

    fn method(&self) -> (&'static str, &'static str) {
        ("CryptoService", "getAccountRecords")
    }

    fn encode_body(&self) -> Vec<u8> {
        let mut s = RlpStream::new_list(1);
        append_optional(&mut s, self.account_id.as_ref());
        s.out().to_vec()
    }

    fn decode_output(&self, response: Response) -> Result<Vec<TransactionRecord>> {
        let rlp = Rlp::new(&response.payload);
        if !rlp.is_list() {
            return Err(Error::Codec("account records must be a list".into()));
        }
        Ok(rlp.as_list()?)
    }

    fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
        if let Some(account_id) = self.account_id {
            account_id.validate_checksum(ledger)?;
        }
        Ok(())
    }
}
