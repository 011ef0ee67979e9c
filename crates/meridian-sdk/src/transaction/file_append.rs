//! File append, split into chunks
//!
//! Contents larger than one chunk are submitted as a sequence of transactions,
//! each a full lifecycle of its own. Chunk `i` uses the first chunk's
//! transaction id moved forward by `i` nanoseconds, and the next chunk is only
//! submitted once the previous one reached consensus.

use meridian_primitives::{Amount, FileId, LedgerId, TransactionId};
use rlp::{Rlp, RlpStream};
use tracing::debug;

use super::{FromBody, Transaction, TransactionData, TransactionKind};
use crate::wire::{append_optional, expect_items, optional_at};
use crate::{Client, Error, Result, TransactionResponse};

/// Bytes per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 4096;
/// Most chunks one append may span
pub const DEFAULT_MAX_CHUNKS: usize = 20;

/// Appends contents to a file
pub type FileAppendTransaction = Transaction<FileAppendTransactionData>;

/// Payload of a [`FileAppendTransaction`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAppendTransactionData {
    file_id: Option<FileId>,
    contents: Vec<u8>,
    chunk_size: usize,
    max_chunks: usize,
    // set on the per-chunk copies built by `execute_all`
    chunk: Option<usize>,
}

impl Default for FileAppendTransactionData {
    fn default() -> Self {
        Self {
            file_id: None,
            contents: Vec::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_chunks: DEFAULT_MAX_CHUNKS,
            chunk: None,
        }
    }
}

impl FileAppendTransactionData {
    fn total_chunks(&self) -> usize {
        self.contents.len().div_ceil(self.chunk_size).max(1)
    }

    fn chunk_bytes(&self, index: usize) -> &[u8] {
        let start = (index * self.chunk_size).min(self.contents.len());
        let end = (start + self.chunk_size).min(self.contents.len());
        &self.contents[start..end]
    }
}

impl FileAppendTransaction {
    /// File to append to
    pub fn file_id(&self) -> Option<FileId> {
        self.data().file_id
    }

    /// Set the file to append to
    pub fn set_file_id(&mut self, file_id: FileId) -> Result<&mut Self> {
        self.data_mut()?.file_id = Some(file_id);
        Ok(self)
    }

    /// Contents to append
    pub fn contents(&self) -> &[u8] {
        &self.data().contents
    }

    /// Set the contents to append
    pub fn set_contents(&mut self, contents: impl Into<Vec<u8>>) -> Result<&mut Self> {
        self.data_mut()?.contents = contents.into();
        Ok(self)
    }

    /// Bytes per chunk
    pub fn chunk_size(&self) -> usize {
        self.data().chunk_size
    }

    /// Set the bytes per chunk
    pub fn set_chunk_size(&mut self, size: usize) -> Result<&mut Self> {
        if size == 0 {
            return Err(Error::Config("chunk size must be at least 1".into()));
        }
        self.data_mut()?.chunk_size = size;
        Ok(self)
    }

    /// Most chunks allowed
    pub fn max_chunks(&self) -> usize {
        self.data().max_chunks
    }

    /// Set the most chunks allowed
    pub fn set_max_chunks(&mut self, max: usize) -> Result<&mut Self> {
        self.data_mut()?.max_chunks = max;
        Ok(self)
    }

    /// Submit every chunk in order, waiting for each chunk's receipt before
    /// the next. Returns one response per chunk.
    pub async fn execute_all(&mut self, client: &Client) -> Result<Vec<TransactionResponse>> {
        self.freeze_with(client)?;
        let first_id = self.transaction_id().ok_or(Error::NotFrozen)?;
        let count = self.data().chunk_count();
        if count > 1 && self.has_raw_signatures {
            return Err(Error::Config(
                "externally signed appends must fit in one chunk".into(),
            ));
        }

        if count == 1 {
            return Ok(vec![self.execute(client).await?]);
        }

        self.state = super::LifecycleState::Executing;
        let result = self.execute_chunks(client, first_id, count).await;
        self.state = super::LifecycleState::Resolved;
        result
    }

    async fn execute_chunks(
        &self,
        client: &Client,
        first_id: TransactionId,
        count: usize,
    ) -> Result<Vec<TransactionResponse>> {
        let mut responses = Vec::with_capacity(count);
        for index in 0..count {
            let mut chunk = self.chunk_transaction(index, first_id);
            chunk.freeze_with(client)?;
            debug!(chunk = index + 1, of = count, transaction_id = ?chunk.transaction_id(), "Appending chunk");
            let response = chunk.execute(client).await?;
            if index + 1 < count {
                response.get_receipt(client).await?;
            }
            responses.push(response);
        }
        Ok(responses)
    }

    fn chunk_transaction(&self, index: usize, first_id: TransactionId) -> Self {
        let mut chunk = self.clone();
        chunk.data.chunk = Some(index);
        chunk.transaction_id = Some(TransactionId::new(
            first_id.account_id,
            first_id.valid_start.plus_nanos(index as u64),
        ));
        chunk.state = super::LifecycleState::Building;
        chunk.bodies.clear();
        chunk.signatures.clear();
        chunk
    }
}

impl TransactionData for FileAppendTransactionData {
    fn kind(&self) -> TransactionKind {
        TransactionKind::FileAppend
    }

    fn encode_body(&self) -> Vec<u8> {
        let mut s = RlpStream::new_list(2);
        append_optional(&mut s, self.file_id.as_ref());
        s.append(&self.chunk_bytes(self.chunk.unwrap_or(0)).to_vec());
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
            return Err(Error::Config("file append requires a file id".into()));
        }
        let chunks = self.total_chunks();
        if chunks > self.max_chunks {
            return Err(Error::Config(format!(
                "contents need {chunks} chunks, more than the maximum of {}",
                self.max_chunks
            )));
        }
        Ok(())
    }

    fn chunk_count(&self) -> usize {
        match self.chunk {
            Some(_) => 1,
            None => self.total_chunks(),
        }
    }
}

impl FromBody for FileAppendTransactionData {
    fn from_body(bytes: &[u8]) -> Result<Self> {
        let rlp = Rlp::new(bytes);
        expect_items(&rlp, 2)?;
        let contents: Vec<u8> = rlp.val_at(1)?;
        Ok(Self {
            file_id: optional_at(&rlp, 0)?,
            chunk_size: contents.len().max(DEFAULT_CHUNK_SIZE),
            contents,
            ..Self::default()
        })
    }
}
