//! File replacement

use meridian_crypto::PublicKey;
use meridian_primitives::{Amount, FileId, LedgerId, Timestamp};
use rlp::{Rlp, RlpStream};

use super::{FromBody, Transaction, TransactionData, TransactionKind};
use crate::wire::{append_optional, expect_items, optional_at};
use crate::{Error, Result};

/// Replaces a file's contents, keys, memo or expiration. Unset fields are
/// left as they are on the ledger.
pub type FileUpdateTransaction = Transaction<FileUpdateTransactionData>;

/// Payload of a [`FileUpdateTransaction`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileUpdateTransactionData {
    file_id: Option<FileId>,
    contents: Option<Vec<u8>>,
    file_memo: Option<String>,
    expiration_time: Option<Timestamp>,
    keys: Option<Vec<PublicKey>>,
}

impl FileUpdateTransaction {
    /// File to update
    pub fn file_id(&self) -> Option<FileId> {
        self.data().file_id
    }

    /// Set the file to update
    pub fn set_file_id(&mut self, file_id: FileId) -> Result<&mut Self> {
        self.data_mut()?.file_id = Some(file_id);
        Ok(self)
    }

    /// Replacement contents
    pub fn contents(&self) -> Option<&[u8]> {
        self.data().contents.as_deref()
    }

    /// Replace the contents
    pub fn set_contents(&mut self, contents: impl Into<Vec<u8>>) -> Result<&mut Self> {
        self.data_mut()?.contents = Some(contents.into());
        Ok(self)
    }

    /// Replacement memo
    pub fn file_memo(&self) -> Option<&str> {
        self.data().file_memo.as_deref()
    }

    /// Replace the memo
    pub fn set_file_memo(&mut self, memo: impl Into<String>) -> Result<&mut Self> {
        self.data_mut()?.file_memo = Some(memo.into());
        Ok(self)
    }

    /// New expiration
    pub fn expiration_time(&self) -> Option<Timestamp> {
        self.data().expiration_time
    }

    /// Move the expiration
    pub fn set_expiration_time(&mut self, at: Timestamp) -> Result<&mut Self> {
        self.data_mut()?.expiration_time = Some(at);
        Ok(self)
    }

    /// Replacement key list
    pub fn keys(&self) -> Option<&[PublicKey]> {
        self.data().keys.as_deref()
    }

    /// Replace the keys that must sign for later changes to the file.
    /// An empty list makes the file immutable.
    pub fn set_keys(&mut self, keys: Vec<PublicKey>) -> Result<&mut Self> {
        self.data_mut()?.keys = Some(keys);
        Ok(self)
    }
}

impl TransactionData for FileUpdateTransactionData {
    fn kind(&self) -> TransactionKind {
        TransactionKind::FileUpdate
    }

    fn encode_body(&self) -> Vec<u8> {
        let mut s = RlpStream::new_list(5);
        append_optional(&mut s, self.file_id.as_ref());
        append_optional(&mut s, self.contents.as_ref());
        append_optional(&mut s, self.file_memo.as_ref());
        match self.expiration_time {
            Some(at) => {
                s.begin_list(2);
                s.append(&at.seconds);
                s.append(&at.nanos);
            }
            None => {
                s.begin_list(0);
            }
        }
        // unset is an empty list; a set list, even an empty one, is wrapped once
        match &self.keys {
            Some(keys) => {
                s.begin_list(1);
                s.begin_list(keys.len());
                for key in keys {
                    s.append(&key.to_bytes().to_vec());
                }
            }
            None => {
                s.begin_list(0);
            }
        }
        s.out().to_vec()
    }

    fn default_max_transaction_fee(&self) -> Amount {
        Amount::from_coins(5)
    }

    fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
        if let Some(file_id) = self.file_id {
            file_id.validate_checksum(ledger)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.file_id.is_none() {
            return Err(Error::Config("file update requires a file id".into()));
        }
        Ok(())
    }
}

impl FromBody for FileUpdateTransactionData {
    fn from_body(bytes: &[u8]) -> Result<Self> {
        let rlp = Rlp::new(bytes);
        expect_items(&rlp, 5)?;
        let expiration = rlp.at(3)?;
        let expiration_time = match expiration.item_count()? {
            0 => None,
            2 => Some(Timestamp::new(expiration.val_at(0)?, expiration.val_at(1)?)),
            _ => return Err(Error::Codec("malformed expiration time".into())),
        };
        let keys = rlp.at(4)?;
        let keys = match keys.item_count()? {
            0 => None,
            1 => Some(
                keys.at(0)?
                    .iter()
                    .map(|key| {
                        let raw: Vec<u8> = key.as_val()?;
                        PublicKey::from_bytes(&raw).map_err(|e| Error::Codec(e.to_string()))
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            _ => return Err(Error::Codec("malformed key list".into())),
        };
        Ok(Self {
            file_id: optional_at(&rlp, 0)?,
            contents: optional_at(&rlp, 1)?,
            file_memo: optional_at(&rlp, 2)?,
            expiration_time,
            keys,
        })
    }
}
