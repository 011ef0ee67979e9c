//! Currency amounts

use std::fmt;
use std::ops::{Add, Neg, Sub};

/// Smallest units per whole coin
pub const TINY_PER_COIN: i64 = 100_000_000;

/// Signed amount of the ledger currency, held in its smallest unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Amount(i64);

impl Amount {
    /// Zero
    pub const ZERO: Amount = Amount(0);

    /// Whole coins
    pub const fn from_coins(coins: i64) -> Self {
        Amount(coins * TINY_PER_COIN)
    }

    /// Smallest units
    pub const fn from_tiny(tiny: i64) -> Self {
        Amount(tiny)
    }

    /// Value in smallest units
    pub const fn to_tiny(self) -> i64 {
        self.0
    }

    /// Whether the amount is below zero
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per = TINY_PER_COIN as u64;
        write!(f, "{sign}{}.{:08}", abs / per, abs % per)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount(-self.0)
    }
}
