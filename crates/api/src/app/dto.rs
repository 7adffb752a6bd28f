use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use paperstock_core::{DomainError, DomainResult, Page, PageRequest, StorageId};
use paperstock_infra::{HISTORY_PAGE_LIMIT, STOCK_PAGE_LIMIT};
use paperstock_inventory::{
    Delivery, HistoryFilter, HistoryStatus, HistoryView, Location, Specification, StockEntry,
    StockFilter, StoreIntake,
};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct StoreIntakeRequest {
    pub storage_id: i64,
    pub gsm: i64,
    pub width: i64,
    pub io: i64,
    pub material_number: i64,
    pub quantity: i64,
}

impl StoreIntakeRequest {
    /// Ids are taken as-is here; the command's own validation reports
    /// non-positive values alongside the other field problems.
    pub fn into_command(self) -> StoreIntake {
        StoreIntake {
            storage_id: StorageId::new(self.storage_id),
            spec: Specification {
                gsm: self.gsm,
                width: self.width,
                io: self.io,
                material_number: self.material_number,
            },
            quantity: self.quantity,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MoveToListRequest {
    pub location: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct DeliverRequest {
    pub quantity: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct StockQuery {
    pub gsm: Option<i64>,
    pub width: Option<i64>,
    pub io: Option<i64>,
    pub material: Option<i64>,
    pub location: Option<String>,
    pub cursor: Option<i64>,
    pub limit: Option<i64>,
    pub dir: Option<String>,
}

impl StockQuery {
    pub fn filter(&self, storage_id: StorageId) -> DomainResult<StockFilter> {
        let location = match self.location.as_deref() {
            Some(raw) if !raw.trim().is_empty() => Some(Location::slot(raw)?),
            _ => None,
        };
        Ok(StockFilter {
            storage_id: Some(storage_id),
            gsm: self.gsm,
            width: self.width,
            io: self.io,
            material_number: self.material,
            location,
        })
    }

    pub fn page(&self) -> DomainResult<PageRequest> {
        PageRequest::new(self.cursor, self.limit, self.dir.as_deref(), STOCK_PAGE_LIMIT)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub status: Option<String>,
    /// Unix seconds, inclusive.
    pub start: Option<i64>,
    /// Unix seconds, inclusive.
    pub end: Option<i64>,
    pub cursor: Option<i64>,
    pub limit: Option<i64>,
    pub dir: Option<String>,
}

impl HistoryQuery {
    pub fn filter(&self, storage_id: StorageId) -> DomainResult<HistoryFilter> {
        let status = match self.status.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(raw.parse::<HistoryStatus>()?),
            _ => None,
        };
        let start = self.start.map(|s| timestamp("start", s)).transpose()?;
        let end = self.end.map(|s| timestamp("end", s)).transpose()?;
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(DomainError::bad_request("start must not be after end"));
            }
        }
        Ok(HistoryFilter {
            storage_id: Some(storage_id),
            status,
            start,
            end,
        })
    }

    pub fn page(&self) -> DomainResult<PageRequest> {
        PageRequest::new(self.cursor, self.limit, self.dir.as_deref(), HISTORY_PAGE_LIMIT)
    }
}

fn timestamp(name: &str, seconds: i64) -> DomainResult<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| DomainError::bad_request(format!("{name} is not a valid timestamp")))
}

// -------------------------
// Response mapping
// -------------------------

pub fn stock_entry_to_json(entry: &StockEntry) -> serde_json::Value {
    serde_json::json!({
        "id": entry.id,
        "storage_id": entry.storage_id,
        "gsm": entry.spec.gsm,
        "width": entry.spec.width,
        "io": entry.spec.io,
        "material_number": entry.spec.material_number,
        "quantity": entry.quantity,
        "location": entry.location.as_str(),
        "created_at": entry.created_at.to_rfc3339(),
        "updated_at": entry.updated_at.to_rfc3339(),
    })
}

pub fn delivery_to_json(delivery: &Delivery) -> serde_json::Value {
    serde_json::json!({
        "id": delivery.entry_id,
        "quantity": delivery.quantity,
        "actor_id": delivery.actor_id,
        "remaining": delivery.remaining,
    })
}

pub fn history_to_json(view: &HistoryView) -> serde_json::Value {
    serde_json::json!({
        "id": view.id,
        "stock_entry_id": view.stock_entry_id,
        "storage_id": view.storage_id,
        "status": view.status.as_str(),
        "affected": view.affected,
        "created_at": view.created_at.to_rfc3339(),
        "gsm": view.spec.gsm,
        "width": view.spec.width,
        "io": view.spec.io,
        "material_number": view.spec.material_number,
        "quantity": view.quantity,
        "location": view.location.as_str(),
        "actor": {
            "id": view.actor.id,
            "username": view.actor.username,
            "photo": view.actor.photo,
        },
    })
}

pub fn page_to_json<T>(page: &Page<T>, item: impl Fn(&T) -> serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "items": page.items.iter().map(item).collect::<Vec<_>>(),
        "cursor": {
            "next": page.cursor.next,
            "previous": page.cursor.previous,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_query_normalizes_location_and_defaults_limit() {
        let query = StockQuery {
            location: Some(" a1 ".into()),
            ..StockQuery::default()
        };
        let filter = query.filter(StorageId::new(3)).unwrap();
        assert_eq!(filter.location.unwrap().as_str(), "A1");
        assert_eq!(query.page().unwrap().limit(), STOCK_PAGE_LIMIT);
    }

    #[test]
    fn history_query_rejects_bad_values() {
        let bad_status = HistoryQuery {
            status: Some("lost".into()),
            ..HistoryQuery::default()
        };
        assert!(bad_status.filter(StorageId::new(1)).unwrap_err().is_bad_request());

        let inverted = HistoryQuery {
            start: Some(200),
            end: Some(100),
            ..HistoryQuery::default()
        };
        assert!(inverted.filter(StorageId::new(1)).unwrap_err().is_bad_request());

        let ok = HistoryQuery {
            status: Some("MOVED".into()),
            start: Some(0),
            ..HistoryQuery::default()
        };
        let filter = ok.filter(StorageId::new(1)).unwrap();
        assert_eq!(filter.status, Some(HistoryStatus::Moved));
        assert_eq!(filter.start.unwrap().timestamp(), 0);
        assert_eq!(ok.page().unwrap().limit(), HISTORY_PAGE_LIMIT);
    }
}
