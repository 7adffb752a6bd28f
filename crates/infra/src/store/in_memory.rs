use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use paperstock_core::{HistoryId, MemberId, Page, PageRequest, SortOrder, StockEntryId};
use paperstock_inventory::{
    Area, HistoryFilter, HistoryRecord, HistoryView, MemberSummary, NewHistoryRecord,
    NewStockEntry, StockEntry, StockFilter,
};

use super::r#trait::{AuditTrail, InventoryStore, StockLedger, StoreError, UnitOfWork};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    entries: BTreeMap<StockEntryId, StockEntry>,
    history: BTreeMap<HistoryId, HistoryRecord>,
    last_entry_id: i64,
    last_history_id: i64,
}

/// In-memory stock ledger and audit trail.
///
/// Intended for tests/dev. Writers are serialized through one async mutex;
/// each unit of work mutates a private copy of the state and publishes it on
/// commit, so readers never see partial writes.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    writer: Arc<Mutex<()>>,
    state: Arc<RwLock<MemoryState>>,
    profiles: RwLock<HashMap<MemberId, MemberSummary>>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the display identity shown next to an actor's history.
    pub fn register_profile(&self, profile: MemberSummary) -> Result<(), StoreError> {
        let mut profiles = self.profiles.write().map_err(|_| poisoned())?;
        profiles.insert(profile.id, profile);
        Ok(())
    }

    fn snapshot(&self) -> Result<MemoryState, StoreError> {
        Ok(self.state.read().map_err(|_| poisoned())?.clone())
    }

    fn actor(&self, id: MemberId) -> Result<MemberSummary, StoreError> {
        let profiles = self.profiles.read().map_err(|_| poisoned())?;
        Ok(profiles.get(&id).cloned().unwrap_or(MemberSummary {
            id,
            username: None,
            photo: None,
        }))
    }
}

fn poisoned() -> StoreError {
    StoreError::Database("lock poisoned".to_string())
}

/// Rows in scan order, cut to the plan's limit.
fn scan<'a, K, V>(
    rows: &'a BTreeMap<K, V>,
    order: SortOrder,
    keep: impl Fn(i64, &V) -> bool,
    limit: u32,
) -> Vec<&'a V>
where
    K: Copy + Into<i64>,
{
    let ordered: Box<dyn Iterator<Item = (&'a K, &'a V)> + 'a> = match order {
        SortOrder::Ascending => Box::new(rows.iter()),
        SortOrder::Descending => Box::new(rows.iter().rev()),
    };
    ordered
        .filter(|(k, v)| keep((**k).into(), *v))
        .map(|(_, v)| v)
        .take(limit as usize)
        .collect()
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    type Tx = InMemoryUnitOfWork;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let guard = self.writer.clone().lock_owned().await;
        let working = self.snapshot()?;
        Ok(InMemoryUnitOfWork {
            _guard: guard,
            working,
            committed: self.state.clone(),
        })
    }

    async fn get_stock(&self, id: StockEntryId) -> Result<StockEntry, StoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        state
            .entries
            .get(&id)
            .filter(|e| e.is_active())
            .cloned()
            .ok_or(StoreError::RowNotFound)
    }

    async fn filter_stock(
        &self,
        filter: &StockFilter,
        area: Area,
        page: PageRequest,
    ) -> Result<Page<StockEntry>, StoreError> {
        let plan = page.plan(SortOrder::Ascending);
        let state = self.state.read().map_err(|_| poisoned())?;
        let rows = scan(
            &state.entries,
            plan.scan_order,
            |id, e| plan.admits(id) && filter.matches(e, area),
            plan.limit,
        )
        .into_iter()
        .cloned()
        .collect();
        Ok(plan.finish(rows, |e: &StockEntry| e.id.get()))
    }

    async fn filter_history(
        &self,
        filter: &HistoryFilter,
        page: PageRequest,
    ) -> Result<Page<HistoryView>, StoreError> {
        let plan = page.plan(SortOrder::Descending);
        let rows: Vec<(HistoryRecord, StockEntry)> = {
            let state = self.state.read().map_err(|_| poisoned())?;
            let mut rows = Vec::new();
            for record in scan(
                &state.history,
                plan.scan_order,
                |id, r| plan.admits(id) && filter.matches(r),
                plan.limit,
            ) {
                let entry = state.entries.get(&record.stock_entry_id).ok_or_else(|| {
                    StoreError::Database(format!(
                        "history {} references missing stock entry {}",
                        record.id, record.stock_entry_id
                    ))
                })?;
                rows.push((record.clone(), entry.clone()));
            }
            rows
        };

        let mut views = Vec::with_capacity(rows.len());
        for (record, entry) in rows {
            views.push(HistoryView {
                id: record.id,
                stock_entry_id: record.stock_entry_id,
                storage_id: record.storage_id,
                status: record.status,
                affected: record.affected,
                created_at: record.created_at,
                spec: entry.spec,
                quantity: entry.quantity,
                location: entry.location,
                actor: self.actor(record.actor_id)?,
            });
        }
        Ok(plan.finish(views, |v: &HistoryView| v.id.get()))
    }
}

/// A unit of work over a private copy of the store.
///
/// Holds the writer lock for its whole lifetime; dropping it discards the
/// copy.
pub struct InMemoryUnitOfWork {
    _guard: OwnedMutexGuard<()>,
    working: MemoryState,
    committed: Arc<RwLock<MemoryState>>,
}

impl InMemoryUnitOfWork {
    fn active_mut(&mut self, id: StockEntryId) -> Result<&mut StockEntry, StoreError> {
        self.working
            .entries
            .get_mut(&id)
            .filter(|e| e.is_active())
            .ok_or(StoreError::RowNotFound)
    }
}

#[async_trait]
impl StockLedger for InMemoryUnitOfWork {
    async fn upsert(&mut self, entry: NewStockEntry) -> Result<StockEntry, StoreError> {
        if entry.quantity < 0 {
            return Err(StoreError::Database("check violation: quantity >= 0".to_string()));
        }
        let now = Utc::now();
        let key = entry.natural_key();
        if let Some(existing) = self
            .working
            .entries
            .values_mut()
            .find(|e| e.is_active() && e.natural_key() == key)
        {
            existing.quantity = existing
                .quantity
                .checked_add(entry.quantity)
                .ok_or_else(|| {
                    StoreError::QuantityOutOfRange(format!(
                        "{} + {} overflows entry {}",
                        existing.quantity, entry.quantity, existing.id
                    ))
                })?;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        self.working.last_entry_id += 1;
        let id = StockEntryId::new(self.working.last_entry_id);
        let created = StockEntry {
            id,
            storage_id: entry.storage_id,
            spec: entry.spec,
            quantity: entry.quantity,
            location: entry.location,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        self.working.entries.insert(id, created.clone());
        Ok(created)
    }

    async fn find_by_id_for_update(&mut self, id: StockEntryId) -> Result<StockEntry, StoreError> {
        // The writer lock already excludes every other unit of work.
        self.active_mut(id).map(|e| e.clone())
    }

    async fn update(&mut self, entry: &StockEntry) -> Result<(), StoreError> {
        if entry.quantity < 0 {
            return Err(StoreError::Database("check violation: quantity >= 0".to_string()));
        }
        let clash = self.working.entries.values().any(|e| {
            e.id != entry.id && e.is_active() && e.natural_key() == entry.natural_key()
        });
        if clash {
            return Err(StoreError::Conflict(format!(
                "stock entry {} would duplicate an active natural key",
                entry.id
            )));
        }

        let current = self.active_mut(entry.id)?;
        current.storage_id = entry.storage_id;
        current.spec = entry.spec;
        current.quantity = entry.quantity;
        current.location = entry.location.clone();
        current.updated_at = Utc::now();
        Ok(())
    }

    async fn soft_delete(&mut self, id: StockEntryId) -> Result<(), StoreError> {
        let current = self.active_mut(id)?;
        current.quantity = 0;
        current.is_deleted = true;
        current.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl AuditTrail for InMemoryUnitOfWork {
    async fn create(&mut self, record: NewHistoryRecord) -> Result<HistoryId, StoreError> {
        if record.affected < 0 {
            return Err(StoreError::Database("check violation: affected >= 0".to_string()));
        }
        if !self.working.entries.contains_key(&record.stock_entry_id) {
            return Err(StoreError::Database(format!(
                "foreign key violation: stock entry {} does not exist",
                record.stock_entry_id
            )));
        }

        self.working.last_history_id += 1;
        let id = HistoryId::new(self.working.last_history_id);
        self.working.history.insert(
            id,
            HistoryRecord {
                id,
                stock_entry_id: record.stock_entry_id,
                storage_id: record.storage_id,
                actor_id: record.actor_id,
                status: record.status,
                affected: record.affected,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn commit(self) -> Result<(), StoreError> {
        let mut committed = self.committed.write().map_err(|_| poisoned())?;
        *committed = self.working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use paperstock_core::StorageId;
    use paperstock_inventory::{Location, Specification};

    use super::*;

    fn intake(quantity: i64, location: Location) -> NewStockEntry {
        NewStockEntry {
            storage_id: StorageId::new(1),
            spec: Specification {
                gsm: 80,
                width: 1000,
                io: 1,
                material_number: 100,
            },
            quantity,
            location,
        }
    }

    #[tokio::test]
    async fn upsert_merges_on_natural_key() {
        let store = InMemoryInventoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let first = tx.upsert(intake(5, Location::buffer())).await.unwrap();
        let merged = tx.upsert(intake(7, Location::buffer())).await.unwrap();
        let other = tx.upsert(intake(2, Location::slot("A1").unwrap())).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(first.id, merged.id);
        assert_eq!(merged.quantity, 12);
        assert_ne!(other.id, first.id);
    }

    #[tokio::test]
    async fn dropped_unit_of_work_rolls_back() {
        let store = InMemoryInventoryStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.upsert(intake(5, Location::buffer())).await.unwrap();
        }
        assert!(matches!(
            store.get_stock(StockEntryId::new(1)).await,
            Err(StoreError::RowNotFound)
        ));
    }

    #[tokio::test]
    async fn tombstone_is_terminal_and_key_can_be_restocked() {
        let store = InMemoryInventoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let first = tx.upsert(intake(5, Location::buffer())).await.unwrap();
        tx.soft_delete(first.id).await.unwrap();
        assert!(matches!(
            tx.find_by_id_for_update(first.id).await,
            Err(StoreError::RowNotFound)
        ));
        assert!(matches!(tx.soft_delete(first.id).await, Err(StoreError::RowNotFound)));
        let again = tx.upsert(intake(3, Location::buffer())).await.unwrap();
        tx.commit().await.unwrap();

        assert_ne!(again.id, first.id);
        assert_eq!(again.quantity, 3);
    }

    #[tokio::test]
    async fn merge_overflow_is_refused_without_touching_the_entry() {
        let store = InMemoryInventoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let first = tx.upsert(intake(i64::MAX, Location::buffer())).await.unwrap();
        assert!(matches!(
            tx.upsert(intake(i64::MAX, Location::buffer())).await,
            Err(StoreError::QuantityOutOfRange(_))
        ));
        tx.commit().await.unwrap();

        assert_eq!(store.get_stock(first.id).await.unwrap().quantity, i64::MAX);
    }

    #[tokio::test]
    async fn negative_quantity_is_refused() {
        let store = InMemoryInventoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let mut entry = tx.upsert(intake(5, Location::buffer())).await.unwrap();
        entry.quantity = -1;
        assert!(matches!(tx.update(&entry).await, Err(StoreError::Database(_))));
    }
}
