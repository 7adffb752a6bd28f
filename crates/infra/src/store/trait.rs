use async_trait::async_trait;
use thiserror::Error;

use paperstock_core::{HistoryId, Page, PageRequest, StockEntryId};
use paperstock_inventory::{
    Area, HistoryFilter, HistoryView, NewHistoryRecord, NewStockEntry, StockEntry, StockFilter,
};

/// Stock/audit storage error.
///
/// These are **infrastructure errors**; the movement engine translates them
/// into domain errors. `RowNotFound` is the raw "no such active row" signal.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("row not found")]
    RowNotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    /// A merged quantity does not fit the column.
    #[error("quantity out of range: {0}")]
    QuantityOutOfRange(String),

    #[error("database error: {0}")]
    Database(String),
}

/// Stock ledger writes, only available inside a unit of work.
#[async_trait]
pub trait StockLedger: Send {
    /// Insert a new active entry, or add `entry.quantity` to the active entry
    /// with the same natural key. Returns the merged row.
    async fn upsert(&mut self, entry: NewStockEntry) -> Result<StockEntry, StoreError>;

    /// Read an active entry and hold an exclusive lock on it until the unit
    /// of work ends.
    async fn find_by_id_for_update(&mut self, id: StockEntryId) -> Result<StockEntry, StoreError>;

    /// Full-row update of an active entry.
    async fn update(&mut self, entry: &StockEntry) -> Result<(), StoreError>;

    /// quantity = 0, is_deleted = true.
    async fn soft_delete(&mut self, id: StockEntryId) -> Result<(), StoreError>;
}

/// Append-only audit writes.
#[async_trait]
pub trait AuditTrail: Send {
    async fn create(&mut self, record: NewHistoryRecord) -> Result<HistoryId, StoreError>;
}

/// One atomic transaction over ledger and audit trail.
///
/// Dropping a unit of work without calling [`UnitOfWork::commit`] rolls it
/// back.
#[async_trait]
pub trait UnitOfWork: StockLedger + AuditTrail {
    async fn commit(self) -> Result<(), StoreError>;
}

/// Store boundary used by the movement engine.
///
/// Reads here take no locks and see only committed state.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    type Tx: UnitOfWork + 'static;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// Non-locking point read of an active entry.
    async fn get_stock(&self, id: StockEntryId) -> Result<StockEntry, StoreError>;

    /// Keyset-paginated listing of `area`, ascending by id; active entries
    /// with quantity > 0 only.
    async fn filter_stock(
        &self,
        filter: &StockFilter,
        area: Area,
        page: PageRequest,
    ) -> Result<Page<StockEntry>, StoreError>;

    /// Keyset-paginated audit listing, newest first.
    async fn filter_history(
        &self,
        filter: &HistoryFilter,
        page: PageRequest,
    ) -> Result<Page<HistoryView>, StoreError>;
}

#[async_trait]
impl<S> InventoryStore for std::sync::Arc<S>
where
    S: InventoryStore,
{
    type Tx = S::Tx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        (**self).begin().await
    }

    async fn get_stock(&self, id: StockEntryId) -> Result<StockEntry, StoreError> {
        (**self).get_stock(id).await
    }

    async fn filter_stock(
        &self,
        filter: &StockFilter,
        area: Area,
        page: PageRequest,
    ) -> Result<Page<StockEntry>, StoreError> {
        (**self).filter_stock(filter, area, page).await
    }

    async fn filter_history(
        &self,
        filter: &HistoryFilter,
        page: PageRequest,
    ) -> Result<Page<HistoryView>, StoreError> {
        (**self).filter_history(filter, page).await
    }
}
