//! Transaction ids and timestamps

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;

use crate::entity_id::AccountId;
use crate::error::PrimitiveError;

/// Seconds/nanoseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Timestamp {
    /// Whole seconds
    pub seconds: u64,
    /// Nanoseconds within the second
    pub nanos: u32,
}

impl Timestamp {
    /// Create a timestamp
    pub fn new(seconds: u64, nanos: u32) -> Self {
        Self { seconds, nanos }
    }

    /// Current wall-clock time
    pub fn now() -> Self {
        let since = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::from_duration(since)
    }

    /// Current time pushed back by a few random seconds, so a freshly built
    /// transaction is not rejected by a node whose clock lags ours.
    pub fn generate() -> Self {
        let jitter = rand::thread_rng().gen_range(5_000..8_000);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::from_duration(now.saturating_sub(Duration::from_millis(jitter)))
    }

    /// Convert from a duration since the epoch
    pub fn from_duration(d: Duration) -> Self {
        Self {
            seconds: d.as_secs(),
            nanos: d.subsec_nanos(),
        }
    }

    /// Duration since the epoch
    pub fn to_duration(self) -> Duration {
        Duration::new(self.seconds, self.nanos)
    }

    /// This timestamp moved forward by `nanos` nanoseconds
    pub fn plus_nanos(self, nanos: u64) -> Self {
        Self::from_duration(self.to_duration() + Duration::from_nanos(nanos))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

/// Identifies a transaction: the paying account plus the instant it becomes valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId {
    /// Paying account
    pub account_id: AccountId,
    /// Start of the validity window
    pub valid_start: Timestamp,
}

impl TransactionId {
    /// Explicit transaction id
    pub fn new(account_id: AccountId, valid_start: Timestamp) -> Self {
        Self {
            account_id,
            valid_start,
        }
    }

    /// Fresh id for `account_id` starting (slightly before) now
    pub fn generate(account_id: AccountId) -> Self {
        Self::new(account_id, Timestamp::generate())
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.account_id, self.valid_start)
    }
}

impl FromStr for TransactionId {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || PrimitiveError::TransactionId(s.to_string());
        let (account, start) = s.split_once('@').ok_or_else(err)?;
        let (seconds, nanos) = start.split_once('.').ok_or_else(err)?;
        let account_id = account.parse::<AccountId>()?;
        let seconds = seconds.parse::<u64>().map_err(|_| err())?;
        let nanos = nanos.parse::<u32>().map_err(|_| err())?;
        if nanos >= 1_000_000_000 {
            return Err(err());
        }
        Ok(Self::new(account_id, Timestamp::new(seconds, nanos)))
    }
}

// RLP implementation (behind feature flag)
#[cfg(feature = "rlp")]
mod rlp_impl {
    use super::*;
    use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

    impl Encodable for TransactionId {
        fn rlp_append(&self, s: &mut RlpStream) {
            s.begin_list(3);
            s.append(&self.account_id);
            s.append(&self.valid_start.seconds);
            s.append(&self.valid_start.nanos);
        }
    }

    impl Decodable for TransactionId {
        fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
            if rlp.item_count()? != 3 {
                return Err(DecoderError::RlpIncorrectListLen);
            }
            Ok(TransactionId::new(
                rlp.val_at(0)?,
                Timestamp::new(rlp.val_at(1)?, rlp.val_at(2)?),
            ))
        }
    }
}
