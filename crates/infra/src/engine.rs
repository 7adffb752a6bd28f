//! Movement engine (application-level orchestration).
//!
//! Every mutating operation runs as one unit of work:
//!
//! ```text
//! Command (validated before any transaction opens)
//!   ↓
//! 1. Begin unit of work
//!   ↓
//! 2. Lock + read the entry (FOR UPDATE)
//!   ↓
//! 3. Pure decision (paperstock_inventory::movement)
//!   ↓
//! 4. Ledger writes (update / upsert / soft delete)
//!   ↓
//! 5. Append exactly one history record
//!   ↓
//! 6. Commit
//! ```
//!
//! Any error between 1 and 6 drops the unit of work, which rolls it back; an
//! audit failure therefore undoes the ledger writes. Read-only listings go
//! straight to the store without a unit of work.

use async_trait::async_trait;
use tracing::{debug, error, info, instrument};

use paperstock_core::{DomainError, DomainResult, MemberId, Page, PageRequest, StockEntryId};
use paperstock_inventory::movement::{self, ENTRY_NOT_FOUND, QUANTITY_EXCEEDS_LIMIT};
use paperstock_inventory::{
    Area, DeleteEntry, Deliver, Delivery, HistoryFilter, HistoryStatus, HistoryView, MoveToList,
    StockEntry, StockFilter, StoreIntake,
};

use crate::store::{AuditTrail, InventoryStore, StockLedger, StoreError, UnitOfWork};

/// Default page size for stock listings.
pub const STOCK_PAGE_LIMIT: u32 = 10;

/// Default page size for audit listings.
pub const HISTORY_PAGE_LIMIT: u32 = 25;

/// Object-safe surface of the inventory engine, as consumed by the HTTP layer.
#[async_trait]
pub trait InventoryService: Send + Sync {
    async fn store_intake(&self, cmd: StoreIntake, actor_id: MemberId) -> DomainResult<StockEntry>;

    async fn move_to_list(&self, cmd: MoveToList, actor_id: MemberId) -> DomainResult<StockEntry>;

    async fn deliver(&self, cmd: Deliver, actor_id: MemberId) -> DomainResult<Delivery>;

    async fn delete_entry(&self, cmd: DeleteEntry, actor_id: MemberId) -> DomainResult<()>;

    async fn get_entry(&self, id: StockEntryId) -> DomainResult<StockEntry>;

    async fn search_buffer(
        &self,
        filter: StockFilter,
        page: PageRequest,
    ) -> DomainResult<Page<StockEntry>>;

    async fn search_list(
        &self,
        filter: StockFilter,
        page: PageRequest,
    ) -> DomainResult<Page<StockEntry>>;

    async fn filter_history(
        &self,
        filter: HistoryFilter,
        page: PageRequest,
    ) -> DomainResult<Page<HistoryView>>;
}

/// Transactional stock movements over an [`InventoryStore`].
#[derive(Debug, Clone)]
pub struct MovementEngine<S> {
    store: S,
}

impl<S> MovementEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Translate a store failure. A missing row becomes the caller-facing
/// not-found and a quantity the column cannot hold is an overdraw; everything
/// else is internal and logged here.
fn store_failure(context: &'static str, err: StoreError) -> DomainError {
    match err {
        StoreError::RowNotFound => DomainError::not_found(ENTRY_NOT_FOUND),
        StoreError::QuantityOutOfRange(_) => {
            debug!(error = %err, context, "quantity out of range");
            DomainError::bad_request(QUANTITY_EXCEEDS_LIMIT).with_source(err)
        }
        StoreError::Conflict(_) => {
            debug!(error = %err, context, "store conflict");
            DomainError::conflict(context).with_source(err)
        }
        StoreError::Database(_) => {
            error!(error = %err, context, "store failure");
            DomainError::internal(context).with_source(err)
        }
    }
}

impl<S: InventoryStore> MovementEngine<S> {
    /// Receive stock into the buffer area, merging with an existing buffer
    /// entry of the same specification.
    #[instrument(
        skip(self, cmd),
        fields(storage_id = %cmd.storage_id, actor_id = %actor_id, quantity = cmd.quantity),
        err(level = "debug")
    )]
    pub async fn store_intake(&self, cmd: StoreIntake, actor_id: MemberId) -> DomainResult<StockEntry> {
        cmd.validate()?;

        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| store_failure("failed to begin transaction", e))?;

        let entry = tx
            .upsert(cmd.entry())
            .await
            .map_err(|e| store_failure("failed to save base paper", e))?;
        tx.create(movement::record(&entry, actor_id, HistoryStatus::Stored, cmd.quantity))
            .await
            .map_err(|e| store_failure("failed to record history", e))?;
        tx.commit()
            .await
            .map_err(|e| store_failure("failed to commit transaction", e))?;

        info!(entry_id = %entry.id, total = entry.quantity, "stock stored");
        Ok(entry)
    }

    /// Move part of a buffer entry to a list slot. Returns the list entry.
    #[instrument(
        skip(self, cmd),
        fields(entry_id = %cmd.entry_id, actor_id = %actor_id, quantity = cmd.quantity),
        err(level = "debug")
    )]
    pub async fn move_to_list(&self, cmd: MoveToList, actor_id: MemberId) -> DomainResult<StockEntry> {
        let slot = cmd.validate()?;

        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| store_failure("failed to begin transaction", e))?;

        let source = tx
            .find_by_id_for_update(cmd.entry_id)
            .await
            .map_err(|e| store_failure("failed to load base paper", e))?;
        let remaining = movement::take(&source, Area::Buffer, cmd.quantity)?;

        let drained = StockEntry {
            quantity: remaining,
            ..source.clone()
        };
        tx.update(&drained)
            .await
            .map_err(|e| store_failure("failed to update base paper", e))?;

        let target = tx
            .upsert(movement::list_entry(&source, slot, cmd.quantity))
            .await
            .map_err(|e| store_failure("failed to save base paper", e))?;
        tx.create(movement::record(&target, actor_id, HistoryStatus::Moved, cmd.quantity))
            .await
            .map_err(|e| store_failure("failed to record history", e))?;
        tx.commit()
            .await
            .map_err(|e| store_failure("failed to commit transaction", e))?;

        info!(target_id = %target.id, location = %target.location, remaining, "stock moved to list");
        Ok(target)
    }

    /// Consume quantity from a list entry.
    #[instrument(
        skip(self, cmd),
        fields(entry_id = %cmd.entry_id, actor_id = %actor_id, quantity = cmd.quantity),
        err(level = "debug")
    )]
    pub async fn deliver(&self, cmd: Deliver, actor_id: MemberId) -> DomainResult<Delivery> {
        cmd.validate()?;

        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| store_failure("failed to begin transaction", e))?;

        let entry = tx
            .find_by_id_for_update(cmd.entry_id)
            .await
            .map_err(|e| store_failure("failed to load base paper", e))?;
        let remaining = movement::take(&entry, Area::List, cmd.quantity)?;

        let updated = StockEntry {
            quantity: remaining,
            ..entry
        };
        tx.update(&updated)
            .await
            .map_err(|e| store_failure("failed to update base paper", e))?;
        tx.create(movement::record(&updated, actor_id, HistoryStatus::Delivered, cmd.quantity))
            .await
            .map_err(|e| store_failure("failed to record history", e))?;
        tx.commit()
            .await
            .map_err(|e| store_failure("failed to commit transaction", e))?;

        info!(remaining, "stock delivered");
        Ok(Delivery {
            entry_id: updated.id,
            quantity: cmd.quantity,
            actor_id,
            remaining,
        })
    }

    /// Tombstone an entry. The history record carries the quantity it held.
    #[instrument(
        skip(self, cmd),
        fields(entry_id = %cmd.entry_id, actor_id = %actor_id),
        err(level = "debug")
    )]
    pub async fn delete_entry(&self, cmd: DeleteEntry, actor_id: MemberId) -> DomainResult<()> {
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| store_failure("failed to begin transaction", e))?;

        let entry = tx
            .find_by_id_for_update(cmd.entry_id)
            .await
            .map_err(|e| store_failure("failed to load base paper", e))?;
        let captured = entry.quantity;

        tx.soft_delete(entry.id)
            .await
            .map_err(|e| store_failure("failed to delete base paper", e))?;
        tx.create(movement::record(&entry, actor_id, HistoryStatus::Deleted, captured))
            .await
            .map_err(|e| store_failure("failed to record history", e))?;
        tx.commit()
            .await
            .map_err(|e| store_failure("failed to commit transaction", e))?;

        info!(captured, "stock deleted");
        Ok(())
    }

    #[instrument(skip(self), fields(entry_id = %id), err(level = "debug"))]
    pub async fn get_entry(&self, id: StockEntryId) -> DomainResult<StockEntry> {
        self.store
            .get_stock(id)
            .await
            .map_err(|e| store_failure("failed to load base paper", e))
    }

    pub async fn search(
        &self,
        filter: &StockFilter,
        area: Area,
        page: PageRequest,
    ) -> DomainResult<Page<StockEntry>> {
        self.store
            .filter_stock(filter, area, page)
            .await
            .map_err(|e| store_failure("failed to list base paper", e))
    }

    pub async fn history(
        &self,
        filter: &HistoryFilter,
        page: PageRequest,
    ) -> DomainResult<Page<HistoryView>> {
        self.store
            .filter_history(filter, page)
            .await
            .map_err(|e| store_failure("failed to list history", e))
    }
}

#[async_trait]
impl<S> InventoryService for MovementEngine<S>
where
    S: InventoryStore + 'static,
{
    async fn store_intake(&self, cmd: StoreIntake, actor_id: MemberId) -> DomainResult<StockEntry> {
        MovementEngine::store_intake(self, cmd, actor_id).await
    }

    async fn move_to_list(&self, cmd: MoveToList, actor_id: MemberId) -> DomainResult<StockEntry> {
        MovementEngine::move_to_list(self, cmd, actor_id).await
    }

    async fn deliver(&self, cmd: Deliver, actor_id: MemberId) -> DomainResult<Delivery> {
        MovementEngine::deliver(self, cmd, actor_id).await
    }

    async fn delete_entry(&self, cmd: DeleteEntry, actor_id: MemberId) -> DomainResult<()> {
        MovementEngine::delete_entry(self, cmd, actor_id).await
    }

    async fn get_entry(&self, id: StockEntryId) -> DomainResult<StockEntry> {
        MovementEngine::get_entry(self, id).await
    }

    async fn search_buffer(
        &self,
        filter: StockFilter,
        page: PageRequest,
    ) -> DomainResult<Page<StockEntry>> {
        self.search(&filter, Area::Buffer, page).await
    }

    async fn search_list(
        &self,
        filter: StockFilter,
        page: PageRequest,
    ) -> DomainResult<Page<StockEntry>> {
        self.search(&filter, Area::List, page).await
    }

    async fn filter_history(
        &self,
        filter: HistoryFilter,
        page: PageRequest,
    ) -> DomainResult<Page<HistoryView>> {
        self.history(&filter, page).await
    }
}
