//! Movement commands and the pure decisions behind them.
//!
//! Quantity flows buffer → list → consumed, never backward. The engine in
//! `paperstock-infra` locks and loads the entry, asks these functions what to
//! do, then writes the outcome and its history record in one transaction.

use serde::{Deserialize, Serialize};

use paperstock_core::{DomainError, DomainResult, ErrorKind, MemberId, StockEntryId, StorageId};

use crate::history::{HistoryStatus, NewHistoryRecord};
use crate::stock::{Area, Location, NewStockEntry, Specification, StockEntry};

pub const ENTRY_NOT_FOUND: &str = "Base paper not found";
pub const QUANTITY_EXCEEDS_LIMIT: &str = "Quantity exceeds the limit";

/// Command: receive stock into the buffer area of a storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreIntake {
    pub storage_id: StorageId,
    pub spec: Specification,
    pub quantity: i64,
}

impl StoreIntake {
    pub fn validate(&self) -> DomainResult<()> {
        let mut problems = Vec::new();
        let fields = [
            ("storage id", self.storage_id.get()),
            ("gsm", self.spec.gsm),
            ("width", self.spec.width),
            ("io", self.spec.io),
            ("material number", self.spec.material_number),
            ("quantity", self.quantity),
        ];
        for (name, value) in fields {
            if value <= 0 {
                problems.push(format!("{name} must be greater than zero"));
            }
        }
        reject_if_any(problems)
    }

    /// The buffer entry this intake merges into.
    pub fn entry(&self) -> NewStockEntry {
        NewStockEntry {
            storage_id: self.storage_id,
            spec: self.spec,
            quantity: self.quantity,
            location: Location::buffer(),
        }
    }
}

/// Command: move part of a buffer entry to a list slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveToList {
    pub entry_id: StockEntryId,
    pub location: String,
    pub quantity: i64,
}

impl MoveToList {
    /// Returns the normalized target slot.
    pub fn validate(&self) -> DomainResult<Location> {
        let mut problems = Vec::new();
        if self.quantity <= 0 {
            problems.push("quantity must be greater than zero".to_string());
        }
        let slot = Location::slot(&self.location);
        if let Err(err) = &slot {
            problems.extend(err.messages());
        }
        reject_if_any(problems)?;
        slot
    }
}

/// Command: consume quantity from a list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deliver {
    pub entry_id: StockEntryId,
    pub quantity: i64,
}

impl Deliver {
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity <= 0 {
            return Err(DomainError::bad_request("quantity must be greater than zero"));
        }
        Ok(())
    }
}

/// Command: tombstone an entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteEntry {
    pub entry_id: StockEntryId,
}

/// Outcome of a delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub entry_id: StockEntryId,
    pub quantity: i64,
    pub actor_id: MemberId,
    pub remaining: i64,
}

fn reject_if_any(problems: Vec<String>) -> DomainResult<()> {
    if problems.is_empty() {
        Ok(())
    } else {
        Err(DomainError::with_messages(ErrorKind::BadRequest, problems))
    }
}

/// Takes `quantity` out of `entry` if it is an active entry in `area`.
///
/// Returns the quantity left behind. Taking exactly what is there drains the
/// entry to zero without deleting it; asking a drained entry for more is an
/// overdraw, not a missing entry.
///
/// A zero-quantity entry is therefore still found here, unlike the lookup
/// rule that hides anything not active in the area. Two deliveries racing on
/// the last units must see the same outcome whichever commits first: the
/// loser reads a drained row and reports `Quantity exceeds the limit`, just
/// as it would had it read the row before the winner committed. Only the
/// tombstone makes an entry vanish.
pub fn take(entry: &StockEntry, area: Area, quantity: i64) -> DomainResult<i64> {
    if !entry.is_active() || !area.contains(&entry.location) {
        return Err(DomainError::not_found(ENTRY_NOT_FOUND));
    }
    if quantity > entry.quantity {
        return Err(DomainError::bad_request(QUANTITY_EXCEEDS_LIMIT));
    }
    Ok(entry.quantity - quantity)
}

/// The list entry a move merges into.
pub fn list_entry(source: &StockEntry, slot: Location, quantity: i64) -> NewStockEntry {
    NewStockEntry {
        storage_id: source.storage_id,
        spec: source.spec,
        quantity,
        location: slot,
    }
}

/// The audit record documenting `status` on `entry`.
pub fn record(
    entry: &StockEntry,
    actor_id: MemberId,
    status: HistoryStatus,
    affected: i64,
) -> NewHistoryRecord {
    NewHistoryRecord {
        stock_entry_id: entry.id,
        storage_id: entry.storage_id,
        actor_id,
        status,
        affected,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use proptest::prelude::*;

    use super::*;

    fn spec() -> Specification {
        Specification {
            gsm: 80,
            width: 1000,
            io: 3,
            material_number: 42,
        }
    }

    fn entry(location: Location, quantity: i64) -> StockEntry {
        let now = Utc::now();
        StockEntry {
            id: StockEntryId::new(1),
            storage_id: StorageId::new(1),
            spec: spec(),
            quantity,
            location,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn intake_collects_every_problem() {
        let cmd = StoreIntake {
            storage_id: StorageId::new(1),
            spec: Specification {
                gsm: 0,
                width: -1,
                io: 3,
                material_number: 42,
            },
            quantity: 0,
        };
        let err = cmd.validate().unwrap_err();
        assert!(err.is_bad_request());
        assert_eq!(err.messages().len(), 3);
    }

    #[test]
    fn move_normalizes_slot_and_rejects_blank() {
        let ok = MoveToList {
            entry_id: StockEntryId::new(1),
            location: " a1 ".into(),
            quantity: 2,
        };
        assert_eq!(ok.validate().unwrap().as_str(), "A1");

        let bad = MoveToList {
            entry_id: StockEntryId::new(1),
            location: "  ".into(),
            quantity: 0,
        };
        let err = bad.validate().unwrap_err();
        assert!(err.is_bad_request());
        assert_eq!(err.messages().len(), 2);
    }

    #[test]
    fn take_guards_area_and_tombstones() {
        let buffered = entry(Location::buffer(), 5);
        assert_eq!(take(&buffered, Area::Buffer, 5).unwrap(), 0);
        assert!(take(&buffered, Area::List, 1).unwrap_err().is_not_found());

        let drained = entry(Location::buffer(), 0);
        assert!(take(&drained, Area::Buffer, 1).unwrap_err().is_bad_request());

        let mut gone = entry(Location::slot("A1").unwrap(), 5);
        gone.is_deleted = true;
        assert!(take(&gone, Area::List, 1).unwrap_err().is_not_found());
    }

    #[test]
    fn overdraw_is_bad_request() {
        let listed = entry(Location::slot("A1").unwrap(), 3);
        let err = take(&listed, Area::List, 4).unwrap_err();
        assert!(err.is_bad_request());
        assert_eq!(err.messages(), vec![QUANTITY_EXCEEDS_LIMIT]);
    }

    proptest! {
        #[test]
        fn take_never_goes_negative(available in 0i64..1_000, requested in 1i64..2_000) {
            let e = entry(Location::buffer(), available);
            match take(&e, Area::Buffer, requested) {
                Ok(left) => {
                    prop_assert!(left >= 0);
                    prop_assert_eq!(left + requested, available);
                }
                Err(err) => {
                    prop_assert!(err.is_bad_request());
                    prop_assert!(requested > available);
                }
            }
        }
    }
}
