//! Strongly-typed identifiers used across the domain.
//!
//! All identifiers are store-assigned 64-bit integers.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a storage (the physical warehouse boundary).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageId(i64);

/// Identifier of a member (actor identity).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(i64);

/// Identifier of a stock entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockEntryId(i64);

/// Identifier of a history (audit) record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryId(i64);

macro_rules! impl_i64_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| DomainError::bad_request(format!("invalid {}: {}", $name, e)))?;
                if value <= 0 {
                    return Err(DomainError::bad_request(format!(
                        "invalid {}: must be positive",
                        $name
                    )));
                }
                Ok(Self(value))
            }
        }
    };
}

impl_i64_newtype!(StorageId, "storage id");
impl_i64_newtype!(MemberId, "member id");
impl_i64_newtype!(StockEntryId, "stock entry id");
impl_i64_newtype!(HistoryId, "history id");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_ids() {
        let id: StockEntryId = " 42 ".parse().unwrap();
        assert_eq!(id.get(), 42);
    }

    #[test]
    fn rejects_non_positive_and_garbage() {
        assert!("0".parse::<StorageId>().unwrap_err().is_bad_request());
        assert!("-3".parse::<MemberId>().unwrap_err().is_bad_request());
        assert!("abc".parse::<StockEntryId>().unwrap_err().is_bad_request());
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&StorageId::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
