//! Closed set of transaction kinds
//!
//! Every kind the client can build or decode is listed here once, with its
//! wire code, its endpoint and its payload decoder.

use meridian_primitives::{Amount, LedgerId};

use super::{
    AccountCreateTransactionData, AccountDeleteTransactionData, FileAppendTransactionData,
    FileUpdateTransactionData, FromBody, TokenUnfreezeTransactionData, Transaction,
    TransactionData, TransferTransactionData,
};
use crate::{Error, Result};

/// Transaction of any kind, as rebuilt by [`Transaction::from_bytes`]
pub type AnyTransaction = Transaction<AnyTransactionData>;

/// Kind tag carried in every body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    /// Currency transfer
    Transfer,
    /// New account
    AccountCreate,
    /// Account removal
    AccountDelete,
    /// File replacement
    FileUpdate,
    /// File append
    FileAppend,
    /// Token unfreeze for one account
    TokenUnfreeze,
}

type DecodeFn = fn(&[u8]) -> Result<AnyTransactionData>;

fn decode_as<D>(bytes: &[u8]) -> Result<AnyTransactionData>
where
    D: FromBody + Into<AnyTransactionData>,
{
    D::from_body(bytes).map(Into::into)
}

// (kind, wire code, service, method, decoder)
static KINDS: [(TransactionKind, u8, &str, &str, DecodeFn); 6] = [
    (
        TransactionKind::Transfer,
        1,
        "CryptoService",
        "cryptoTransfer",
        decode_as::<TransferTransactionData>,
    ),
    (
        TransactionKind::AccountCreate,
        2,
        "CryptoService",
        "createAccount",
        decode_as::<AccountCreateTransactionData>,
    ),
    (
        TransactionKind::AccountDelete,
        3,
        "CryptoService",
        "cryptoDelete",
        decode_as::<AccountDeleteTransactionData>,
    ),
    (
        TransactionKind::FileUpdate,
        4,
        "FileService",
        "updateFile",
        decode_as::<FileUpdateTransactionData>,
    ),
    (
        TransactionKind::FileAppend,
        5,
        "FileService",
        "appendContent",
        decode_as::<FileAppendTransactionData>,
    ),
    (
        TransactionKind::TokenUnfreeze,
        6,
        "TokenService",
        "unfreezeTokenAccount",
        decode_as::<TokenUnfreezeTransactionData>,
    ),
];

impl TransactionKind {
    fn entry(self) -> &'static (TransactionKind, u8, &'static str, &'static str, DecodeFn) {
        // KINDS lists the variants in declaration order
        &KINDS[self as usize]
    }

    /// Wire code
    pub fn code(self) -> u8 {
        self.entry().1
    }

    /// Kind for a wire code
    pub fn from_code(code: u8) -> Option<Self> {
        KINDS.iter().find(|entry| entry.1 == code).map(|entry| entry.0)
    }

    /// Service and method the kind is submitted to
    pub fn method(self) -> (&'static str, &'static str) {
        let entry = self.entry();
        (entry.2, entry.3)
    }

    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            TransactionKind::Transfer => "Transfer",
            TransactionKind::AccountCreate => "AccountCreate",
            TransactionKind::AccountDelete => "AccountDelete",
            TransactionKind::FileUpdate => "FileUpdate",
            TransactionKind::FileAppend => "FileAppend",
            TransactionKind::TokenUnfreeze => "TokenUnfreeze",
        }
    }
}

macro_rules! any_transaction_data {
    ($($variant:ident($data:ty)),* $(,)?) => {
        /// Payload of any transaction kind
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum AnyTransactionData {
            $(
                #[allow(missing_docs)]
                $variant($data),
            )*
        }

        $(
            impl From<$data> for AnyTransactionData {
                fn from(data: $data) -> Self {
                    AnyTransactionData::$variant(data)
                }
            }

            impl TryFrom<AnyTransactionData> for $data {
                type Error = AnyTransactionData;

                fn try_from(any: AnyTransactionData) -> std::result::Result<Self, Self::Error> {
                    match any {
                        AnyTransactionData::$variant(data) => Ok(data),
                        other => Err(other),
                    }
                }
            }
        )*

        impl TransactionData for AnyTransactionData {
            fn kind(&self) -> TransactionKind {
                match self {
                    $(AnyTransactionData::$variant(data) => data.kind(),)*
                }
            }

            fn encode_body(&self) -> Vec<u8> {
                match self {
                    $(AnyTransactionData::$variant(data) => data.encode_body(),)*
                }
            }

            fn default_max_transaction_fee(&self) -> Amount {
                match self {
                    $(AnyTransactionData::$variant(data) => data.default_max_transaction_fee(),)*
                }
            }

            fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
                match self {
                    $(AnyTransactionData::$variant(data) => data.validate_checksums(ledger),)*
                }
            }

            fn validate(&self) -> Result<()> {
                match self {
                    $(AnyTransactionData::$variant(data) => data.validate(),)*
                }
            }

            fn chunk_count(&self) -> usize {
                match self {
                    $(AnyTransactionData::$variant(data) => data.chunk_count(),)*
                }
            }
        }
    };
}

any_transaction_data! {
    Transfer(TransferTransactionData),
    AccountCreate(AccountCreateTransactionData),
    AccountDelete(AccountDeleteTransactionData),
    FileUpdate(FileUpdateTransactionData),
    FileAppend(FileAppendTransactionData),
    TokenUnfreeze(TokenUnfreezeTransactionData),
}

impl AnyTransactionData {
    /// Decode the payload of a `kind` transaction
    pub fn decode(kind: TransactionKind, bytes: &[u8]) -> Result<Self> {
        (kind.entry().4)(bytes)
            .map_err(|e| Error::Codec(format!("{} payload: {e}", kind.name())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TransactionKind; 6] = [
        TransactionKind::Transfer,
        TransactionKind::AccountCreate,
        TransactionKind::AccountDelete,
        TransactionKind::FileUpdate,
        TransactionKind::FileAppend,
        TransactionKind::TokenUnfreeze,
    ];

    #[test]
    fn test_table_matches_variants() {
        for kind in ALL {
            assert_eq!(kind.entry().0, kind);
            assert_eq!(TransactionKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(TransactionKind::from_code(0), None);
    }

    #[test]
    fn test_decode_dispatches_on_kind() {
        let data = TokenUnfreezeTransactionData::default();
        let any = AnyTransactionData::decode(TransactionKind::TokenUnfreeze, &data.encode_body())
            .unwrap();
        assert_eq!(any, AnyTransactionData::TokenUnfreeze(data));
        assert_eq!(any.kind(), TransactionKind::TokenUnfreeze);
    }

    #[test]
    fn test_decode_wrong_payload() {
        assert!(matches!(
            AnyTransactionData::decode(TransactionKind::Transfer, &[0xc1]),
            Err(Error::Codec(_))
        ));
    }
}
