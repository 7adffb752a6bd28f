use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use paperstock_core::StorageId;

use crate::history::{HistoryRecord, HistoryStatus};
use crate::stock::{Area, Location, StockEntry};

/// Optional equality filters over stock entries. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockFilter {
    pub storage_id: Option<StorageId>,
    pub gsm: Option<i64>,
    pub width: Option<i64>,
    pub io: Option<i64>,
    pub material_number: Option<i64>,
    pub location: Option<Location>,
}

impl StockFilter {
    pub fn for_storage(storage_id: StorageId) -> Self {
        Self {
            storage_id: Some(storage_id),
            ..Self::default()
        }
    }

    /// Whether `entry` belongs in an `area` listing under this filter.
    ///
    /// Listings only show active entries that still hold stock.
    pub fn matches(&self, entry: &StockEntry, area: Area) -> bool {
        fn eq<T: PartialEq>(want: &Option<T>, have: &T) -> bool {
            want.as_ref().is_none_or(|w| w == have)
        }

        entry.is_available_in(area)
            && eq(&self.storage_id, &entry.storage_id)
            && eq(&self.gsm, &entry.spec.gsm)
            && eq(&self.width, &entry.spec.width)
            && eq(&self.io, &entry.spec.io)
            && eq(&self.material_number, &entry.spec.material_number)
            && eq(&self.location, &entry.location)
    }
}

/// Filters over the audit trail. `start`/`end` bound `created_at` inclusively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryFilter {
    pub storage_id: Option<StorageId>,
    pub status: Option<HistoryStatus>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl HistoryFilter {
    pub fn for_storage(storage_id: StorageId) -> Self {
        Self {
            storage_id: Some(storage_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &HistoryRecord) -> bool {
        self.storage_id.is_none_or(|s| s == record.storage_id)
            && self.status.is_none_or(|s| s == record.status)
            && self.start.is_none_or(|t| record.created_at >= t)
            && self.end.is_none_or(|t| record.created_at <= t)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use paperstock_core::{HistoryId, MemberId, StockEntryId};

    use super::*;
    use crate::stock::Specification;

    fn entry(storage: i64, gsm: i64, location: Location, quantity: i64) -> StockEntry {
        let now = Utc::now();
        StockEntry {
            id: StockEntryId::new(1),
            storage_id: StorageId::new(storage),
            spec: Specification {
                gsm,
                width: 1000,
                io: 3,
                material_number: 42,
            },
            quantity,
            location,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn stock_filter_respects_area_and_fields() {
        let filter = StockFilter {
            gsm: Some(80),
            ..StockFilter::for_storage(StorageId::new(1))
        };
        assert!(filter.matches(&entry(1, 80, Location::buffer(), 5), Area::Buffer));
        assert!(!filter.matches(&entry(1, 80, Location::buffer(), 5), Area::List));
        assert!(!filter.matches(&entry(1, 90, Location::buffer(), 5), Area::Buffer));
        assert!(!filter.matches(&entry(2, 80, Location::buffer(), 5), Area::Buffer));
        assert!(!filter.matches(&entry(1, 80, Location::buffer(), 0), Area::Buffer));
    }

    #[test]
    fn history_filter_time_range_is_inclusive() {
        let at = Utc::now();
        let record = HistoryRecord {
            id: HistoryId::new(1),
            stock_entry_id: StockEntryId::new(1),
            storage_id: StorageId::new(1),
            actor_id: MemberId::new(9),
            status: HistoryStatus::Stored,
            affected: 3,
            created_at: at,
        };
        let filter = HistoryFilter {
            start: Some(at),
            end: Some(at),
            status: Some(HistoryStatus::Stored),
            ..HistoryFilter::for_storage(StorageId::new(1))
        };
        assert!(filter.matches(&record));

        let later = HistoryFilter {
            start: Some(at + Duration::seconds(1)),
            ..HistoryFilter::default()
        };
        assert!(!later.matches(&record));
    }
}
