//! Node and ledger response codes

use std::fmt;

macro_rules! statuses {
    ($($name:ident = $code:literal => $text:literal,)*) => {
        /// Response code returned by a node at precheck, or by the ledger in a receipt.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Status {
            $(
                #[doc = $text]
                $name,
            )*
            /// A code this client does not know.
            ///
            /// Build these through [`Status::from_code`]: `Other` holding a
            /// known code encodes as that code and decodes to the named variant.
            Other(u32),
        }

        impl Status {
            /// Numeric wire code
            pub fn code(self) -> u32 {
                match self {
                    $(Status::$name => $code,)*
                    Status::Other(code) => code,
                }
            }

            /// Map a wire code back to a status
            pub fn from_code(code: u32) -> Self {
                match code {
                    $($code => Status::$name,)*
                    other => Status::Other(other),
                }
            }

            /// Upper-case protocol name
            pub fn name(self) -> &'static str {
                match self {
                    $(Status::$name => $text,)*
                    Status::Other(_) => "UNRECOGNIZED",
                }
            }
        }
    };
}

statuses! {
    Ok = 0 => "OK",
    InvalidTransaction = 1 => "INVALID_TRANSACTION",
    PayerAccountNotFound = 2 => "PAYER_ACCOUNT_NOT_FOUND",
    InvalidNodeAccount = 3 => "INVALID_NODE_ACCOUNT",
    TransactionExpired = 4 => "TRANSACTION_EXPIRED",
    InvalidTransactionStart = 5 => "INVALID_TRANSACTION_START",
    InvalidTransactionDuration = 6 => "INVALID_TRANSACTION_DURATION",
    InvalidSignature = 7 => "INVALID_SIGNATURE",
    MemoTooLong = 8 => "MEMO_TOO_LONG",
    InsufficientTxFee = 9 => "INSUFFICIENT_TX_FEE",
    InsufficientPayerBalance = 10 => "INSUFFICIENT_PAYER_BALANCE",
    DuplicateTransaction = 11 => "DUPLICATE_TRANSACTION",
    Busy = 12 => "BUSY",
    NotSupported = 13 => "NOT_SUPPORTED",
    InvalidFileId = 14 => "INVALID_FILE_ID",
    InvalidAccountId = 15 => "INVALID_ACCOUNT_ID",
    InvalidTransactionId = 17 => "INVALID_TRANSACTION_ID",
    ReceiptNotFound = 18 => "RECEIPT_NOT_FOUND",
    RecordNotFound = 19 => "RECORD_NOT_FOUND",
    Unknown = 21 => "UNKNOWN",
    Success = 22 => "SUCCESS",
    FailInvalid = 23 => "FAIL_INVALID",
    FailFee = 24 => "FAIL_FEE",
    FailBalance = 25 => "FAIL_BALANCE",
    PlatformTransactionNotCreated = 27 => "PLATFORM_TRANSACTION_NOT_CREATED",
    InsufficientAccountBalance = 28 => "INSUFFICIENT_ACCOUNT_BALANCE",
    PlatformNotActive = 30 => "PLATFORM_NOT_ACTIVE",
    AccountDeleted = 72 => "ACCOUNT_DELETED",
    FileDeleted = 68 => "FILE_DELETED",
    InvalidTokenId = 167 => "INVALID_TOKEN_ID",
    TokenNotAssociatedToAccount = 184 => "TOKEN_NOT_ASSOCIATED_TO_ACCOUNT",
    AccountFrozenForToken = 165 => "ACCOUNT_FROZEN_FOR_TOKEN",
    TokenHasNoFreezeKey = 172 => "TOKEN_HAS_NO_FREEZE_KEY",
}

impl Status {
    /// The node is temporarily unable to take the request; the same request may
    /// succeed later on the same or another node.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Status::Busy | Status::PlatformTransactionNotCreated | Status::PlatformNotActive
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Other(code) => write!(f, "UNRECOGNIZED({code})"),
            other => f.write_str(other.name()),
        }
    }
}

// RLP implementation (behind feature flag)
#[cfg(feature = "rlp")]
mod rlp_impl {
    use super::*;
    use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

    impl Encodable for Status {
        fn rlp_append(&self, s: &mut RlpStream) {
            self.code().rlp_append(s);
        }
    }

    impl Decodable for Status {
        fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
            Ok(Status::from_code(rlp.as_val()?))
        }
    }
}
