use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use paperstock_core::{DomainError, DomainResult, StockEntryId, StorageId};

/// Base-paper specification: grammage, width, inner-diameter code and
/// material number.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Specification {
    pub gsm: i64,
    pub width: i64,
    pub io: i64,
    pub material_number: i64,
}

/// Physical placement of stock inside a storage.
///
/// The empty location is the buffer area; anything else is a list slot,
/// stored trimmed and uppercased.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(String);

impl Location {
    pub fn buffer() -> Self {
        Self(String::new())
    }

    /// Normalizes a list slot name. Blank names are rejected.
    pub fn slot(raw: &str) -> DomainResult<Self> {
        let slot = raw.trim();
        if slot.is_empty() {
            return Err(DomainError::bad_request("location is required"));
        }
        Ok(Self(slot.to_uppercase()))
    }

    /// Wraps a value read back from storage without re-validating it.
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_buffer(&self) -> bool {
        self.0.is_empty()
    }

    pub fn area(&self) -> Area {
        if self.is_buffer() { Area::Buffer } else { Area::List }
    }
}

impl core::fmt::Display for Location {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which half of a storage a listing or operation targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Area {
    /// Received but not yet placed (empty location).
    Buffer,
    /// Assigned to a physical slot.
    List,
}

impl Area {
    pub fn contains(self, location: &Location) -> bool {
        location.area() == self
    }
}

/// Identity of an active entry; at most one active entry exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
    pub storage_id: StorageId,
    pub spec: Specification,
    pub location: Location,
}

/// A quantity of one specification at one location within one storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntry {
    pub id: StockEntryId,
    pub storage_id: StorageId,
    pub spec: Specification,
    pub quantity: i64,
    pub location: Location,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockEntry {
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            storage_id: self.storage_id,
            spec: self.spec,
            location: self.location.clone(),
        }
    }

    pub fn area(&self) -> Area {
        self.location.area()
    }

    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    /// Active, in `area`, and holding something.
    pub fn is_available_in(&self, area: Area) -> bool {
        self.is_active() && area.contains(&self.location) && self.quantity > 0
    }
}

/// Quantity to merge into the active entry with the same natural key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStockEntry {
    pub storage_id: StorageId,
    pub spec: Specification,
    pub quantity: i64,
    pub location: Location,
}

impl NewStockEntry {
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            storage_id: self.storage_id,
            spec: self.spec,
            location: self.location.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_is_trimmed_and_uppercased() {
        let loc = Location::slot("  a-1 ").unwrap();
        assert_eq!(loc.as_str(), "A-1");
        assert_eq!(loc.area(), Area::List);
    }

    #[test]
    fn blank_slot_is_rejected() {
        assert!(Location::slot("   ").unwrap_err().is_bad_request());
    }

    #[test]
    fn empty_location_is_buffer() {
        assert!(Area::Buffer.contains(&Location::buffer()));
        assert!(!Area::List.contains(&Location::buffer()));
    }
}
