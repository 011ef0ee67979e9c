//! `shard.realm.num` entity identifiers

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::checksum::{self, Checksum};
use crate::error::EntityIdError;
use crate::ledger_id::LedgerId;

/// Identifier of an account, file, token or any other ledger entity.
///
/// The optional checksum is carried along for validation only: two ids that name
/// the same `shard.realm.num` compare equal whether or not either carries one.
#[derive(Clone, Copy)]
pub struct EntityId {
    /// Shard number
    pub shard: u64,
    /// Realm number
    pub realm: u64,
    /// Entity number
    pub num: u64,
    checksum: Option<Checksum>,
}

/// Account identifier
pub type AccountId = EntityId;
/// File identifier
pub type FileId = EntityId;
/// Token identifier
pub type TokenId = EntityId;

impl EntityId {
    /// Create an id without checksum
    pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
        Self {
            shard,
            realm,
            num,
            checksum: None,
        }
    }

    /// Shorthand for `0.0.{num}`
    pub const fn from_num(num: u64) -> Self {
        Self::new(0, 0, num)
    }

    /// Create from signed components, rejecting negatives
    pub fn try_from_signed(shard: i64, realm: i64, num: i64) -> Result<Self, EntityIdError> {
        let check = |v: i64| u64::try_from(v).map_err(|_| EntityIdError::Negative(v));
        Ok(Self::new(check(shard)?, check(realm)?, check(num)?))
    }

    /// Parse `{num}`, `{shard}.{realm}.{num}` or `{shard}.{realm}.{num}-{checksum}`
    pub fn parse(text: &str) -> Result<Self, EntityIdError> {
        let err = || EntityIdError::Parse(text.to_string());

        let (body, checksum) = match text.split_once('-') {
            Some((body, suffix)) => (body, Some(suffix.parse::<Checksum>().map_err(|_| err())?)),
            None => (text, None),
        };

        let parts: Vec<&str> = body.split('.').collect();
        let (shard, realm, num) = match parts.as_slice() {
            [num] if checksum.is_none() => (0, 0, parse_segment(num).ok_or_else(err)?),
            [shard, realm, num] => (
                parse_segment(shard).ok_or_else(err)?,
                parse_segment(realm).ok_or_else(err)?,
                parse_segment(num).ok_or_else(err)?,
            ),
            _ => return Err(err()),
        };

        Ok(Self {
            shard,
            realm,
            num,
            checksum,
        })
    }

    /// The checksum parsed with this id, if any
    pub fn checksum(&self) -> Option<Checksum> {
        self.checksum
    }

    /// Copy of this id carrying the checksum for `ledger`
    pub fn with_checksum(&self, ledger: &LedgerId) -> Self {
        Self {
            checksum: Some(checksum::compute(ledger, self.shard, self.realm, self.num)),
            ..*self
        }
    }

    /// Copy of this id without checksum
    pub fn without_checksum(&self) -> Self {
        Self {
            checksum: None,
            ..*self
        }
    }

    /// Verify the carried checksum against `ledger`. Ids without a checksum pass.
    pub fn validate_checksum(&self, ledger: &LedgerId) -> Result<(), EntityIdError> {
        let Some(present) = self.checksum else {
            return Ok(());
        };
        let expected = checksum::compute(ledger, self.shard, self.realm, self.num);
        if expected != present {
            return Err(EntityIdError::ChecksumMismatch {
                id: self.to_string_without_checksum(),
                expected: expected.to_string(),
                present: present.to_string(),
            });
        }
        Ok(())
    }

    /// `shard.realm.num-checksum` for `ledger`, regardless of any carried checksum
    pub fn to_string_with_checksum(&self, ledger: &LedgerId) -> String {
        format!(
            "{}-{}",
            self.to_string_without_checksum(),
            checksum::compute(ledger, self.shard, self.realm, self.num)
        )
    }

    fn to_string_without_checksum(&self) -> String {
        format!("{}.{}.{}", self.shard, self.realm, self.num)
    }
}

/// Digits only: no sign, no whitespace, no empty segment.
fn parse_segment(segment: &str) -> Option<u64> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

impl PartialEq for EntityId {
    fn eq(&self, other: &Self) -> bool {
        (self.shard, self.realm, self.num) == (other.shard, other.realm, other.num)
    }
}

impl Eq for EntityId {}

impl Hash for EntityId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.shard, self.realm, self.num).hash(state);
    }
}

impl PartialOrd for EntityId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EntityId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.shard, self.realm, self.num).cmp(&(other.shard, other.realm, other.num))
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({self})")
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)?;
        if let Some(checksum) = self.checksum {
            write!(f, "-{checksum}")?;
        }
        Ok(())
    }
}

impl FromStr for EntityId {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<(i64, i64, i64)> for EntityId {
    type Error = EntityIdError;

    fn try_from((shard, realm, num): (i64, i64, i64)) -> Result<Self, Self::Error> {
        Self::try_from_signed(shard, realm, num)
    }
}

impl From<u64> for EntityId {
    fn from(num: u64) -> Self {
        Self::from_num(num)
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::*;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for EntityId {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(self)
        }
    }

    impl<'de> Deserialize<'de> for EntityId {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let text = String::deserialize(deserializer)?;
            EntityId::parse(&text).map_err(de::Error::custom)
        }
    }
}

// RLP implementation (behind feature flag)
#[cfg(feature = "rlp")]
mod rlp_impl {
    use super::*;
    use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

    impl Encodable for EntityId {
        fn rlp_append(&self, s: &mut RlpStream) {
            s.begin_list(3);
            s.append(&self.shard);
            s.append(&self.realm);
            s.append(&self.num);
        }
    }

    impl Decodable for EntityId {
        fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
            if rlp.item_count()? != 3 {
                return Err(DecoderError::RlpIncorrectListLen);
            }
            Ok(EntityId::new(rlp.val_at(0)?, rlp.val_at(1)?, rlp.val_at(2)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construct() {
        let id = EntityId::new(10, 50, 25050);
        assert_eq!((id.shard, id.realm, id.num), (10, 50, 25050));
        assert!(id.checksum().is_none());
    }

    #[test]
    fn test_parse_num_only() {
        let id = EntityId::parse("25050").unwrap();
        assert_eq!(id, EntityId::new(0, 0, 25050));
    }

    #[test]
    fn test_parse_full() {
        let id = EntityId::parse("10.50.25050").unwrap();
        assert_eq!(id, EntityId::new(10, 50, 25050));
    }

    #[test]
    fn test_parse_with_checksum() {
        let id = EntityId::parse("0.0.123-vfmkw").unwrap();
        assert_eq!(id, EntityId::from_num(123));
        assert_eq!(id.checksum().unwrap().as_str(), "vfmkw");
        assert!(id.validate_checksum(&LedgerId::Mainnet).is_ok());
    }

    #[test]
    fn test_checksum_mismatch() {
        let id = EntityId::parse("0.0.123-vfmkw").unwrap();
        let err = id.validate_checksum(&LedgerId::Testnet).unwrap_err();
        assert!(matches!(err, EntityIdError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_num_with_checksum_rejected() {
        assert!(EntityId::parse("123-vfmkw").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(EntityId::new(50, 150, 520).to_string(), "50.150.520");
        assert_eq!(
            EntityId::new(50, 150, 520).to_string_with_checksum(&LedgerId::Mainnet),
            "50.150.520-ilqjy"
        );
    }

    #[test]
    fn test_equality_ignores_checksum() {
        let plain = EntityId::from_num(3);
        let tagged = plain.with_checksum(&LedgerId::Testnet);
        assert_eq!(plain, tagged);
        assert_eq!(tagged.to_string(), "0.0.3-dmqui");
    }

    #[test]
    fn test_negative_components() {
        assert!(EntityId::try_from_signed(0, 0, -1).is_err());
        assert!(EntityId::try_from((-1, -1, -1)).is_err());
        assert!(EntityId::try_from_signed(0, 0, 1).is_ok());
    }
}
