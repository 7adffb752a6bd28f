use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use paperstock_core::{DomainError, HistoryId, MemberId, StockEntryId, StorageId};

use crate::stock::{Location, Specification};

/// Kind of mutation a history record documents.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStatus {
    Stored,
    Moved,
    Delivered,
    Deleted,
}

impl HistoryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryStatus::Stored => "stored",
            HistoryStatus::Moved => "moved",
            HistoryStatus::Delivered => "delivered",
            HistoryStatus::Deleted => "deleted",
        }
    }
}

impl core::fmt::Display for HistoryStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stored" => Ok(HistoryStatus::Stored),
            "moved" => Ok(HistoryStatus::Moved),
            "delivered" => Ok(HistoryStatus::Delivered),
            "deleted" => Ok(HistoryStatus::Deleted),
            other => Err(DomainError::bad_request(format!("invalid status '{other}'"))),
        }
    }
}

/// Immutable audit fact for one mutation of one stock entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: HistoryId,
    pub stock_entry_id: StockEntryId,
    pub storage_id: StorageId,
    pub actor_id: MemberId,
    pub status: HistoryStatus,
    pub affected: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryRecord {
    pub stock_entry_id: StockEntryId,
    pub storage_id: StorageId,
    pub actor_id: MemberId,
    pub status: HistoryStatus,
    pub affected: i64,
}

/// Display identity of an actor. Fields are empty when the actor has no
/// profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSummary {
    pub id: MemberId,
    pub username: Option<String>,
    pub photo: Option<String>,
}

/// A history record joined with the entry it documents and its actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryView {
    pub id: HistoryId,
    pub stock_entry_id: StockEntryId,
    pub storage_id: StorageId,
    pub status: HistoryStatus,
    pub affected: i64,
    pub created_at: DateTime<Utc>,
    pub spec: Specification,
    pub quantity: i64,
    pub location: Location,
    pub actor: MemberSummary,
}
