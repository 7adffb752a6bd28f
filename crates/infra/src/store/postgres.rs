//! Postgres-backed stock ledger and audit trail.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (numeric value out of range) | `22003` | `QuantityOutOfRange` |
//! | Database (foreign key violation) | `23503` | `Database` |
//! | Database (check constraint violation) | `23514` | `Database` |
//! | RowNotFound | N/A | `RowNotFound` |
//! | Other | N/A | `Database` |
//!
//! ## Locking
//!
//! `find_by_id_for_update` takes `SELECT … FOR UPDATE`, so concurrent units of
//! work touching the same entry serialize on the row while different entries
//! proceed in parallel.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::{Span, instrument};

use paperstock_core::{
    HistoryId, MemberId, Page, PageRequest, SortOrder, StockEntryId, StorageId,
};
use paperstock_inventory::{
    Area, HistoryFilter, HistoryStatus, HistoryView, Location, MemberSummary, NewHistoryRecord,
    NewStockEntry, Specification, StockEntry, StockFilter,
};

use super::r#trait::{AuditTrail, InventoryStore, StockLedger, StoreError, UnitOfWork};

/// Embedded schema; every statement is idempotent.
pub const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const STOCK_COLUMNS: &str = "id, storage_id, gsm, width, io, material_number, quantity, \
                             location, is_deleted, created_at, updated_at";

/// Connect a pool with the given size limit.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))
}

/// Apply [`SCHEMA`] to the pool's database.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("migrate", e))?;
    Ok(())
}

/// Postgres-backed [`InventoryStore`].
///
/// Uses the SQLx connection pool, which is `Send + Sync`; reads go straight to
/// the pool and see only committed rows.
#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert or refresh an actor's display identity.
    #[instrument(skip(self, profile), fields(member_id = %profile.id), err)]
    pub async fn register_profile(&self, profile: &MemberSummary) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO member_profile (id, username, photo)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                username = EXCLUDED.username,
                photo = EXCLUDED.photo
            "#,
        )
        .bind(profile.id.get())
        .bind(profile.username.clone().unwrap_or_default())
        .bind(profile.photo.as_deref())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("register_profile", e))?;
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    type Tx = PostgresUnitOfWork;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(PostgresUnitOfWork { tx })
    }

    #[instrument(skip(self), fields(entry_id = %id), err)]
    async fn get_stock(&self, id: StockEntryId) -> Result<StockEntry, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_entry WHERE id = $1 AND NOT is_deleted"
        ))
        .bind(id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_stock", e))?
        .ok_or(StoreError::RowNotFound)?;

        Ok(StockEntryRow::from_row(&row)
            .map_err(|e| map_sqlx_error("decode_stock_entry", e))?
            .into())
    }

    #[instrument(
        skip(self, filter),
        fields(
            storage_id = ?filter.storage_id,
            area = ?area,
            operation = tracing::field::Empty,
            row_count = tracing::field::Empty
        ),
        err
    )]
    async fn filter_stock(
        &self,
        filter: &StockFilter,
        area: Area,
        page: PageRequest,
    ) -> Result<Page<StockEntry>, StoreError> {
        let span = Span::current();
        span.record("operation", "filter_stock");

        let plan = page.plan(SortOrder::Ascending);
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {STOCK_COLUMNS} FROM stock_entry WHERE NOT is_deleted AND quantity > 0"
        ));
        qb.push(match area {
            Area::Buffer => " AND location = ''",
            Area::List => " AND location <> ''",
        });
        if let Some(storage_id) = filter.storage_id {
            qb.push(" AND storage_id = ").push_bind(storage_id.get());
        }
        if let Some(gsm) = filter.gsm {
            qb.push(" AND gsm = ").push_bind(gsm);
        }
        if let Some(width) = filter.width {
            qb.push(" AND width = ").push_bind(width);
        }
        if let Some(io) = filter.io {
            qb.push(" AND io = ").push_bind(io);
        }
        if let Some(material_number) = filter.material_number {
            qb.push(" AND material_number = ").push_bind(material_number);
        }
        if let Some(location) = &filter.location {
            qb.push(" AND location = ").push_bind(location.as_str().to_owned());
        }
        if let Some(bound) = plan.bound {
            qb.push(" AND id ")
                .push(bound.sql_operator())
                .push(" ")
                .push_bind(bound.value());
        }
        qb.push(" ORDER BY id ")
            .push(plan.scan_order.as_sql())
            .push(" LIMIT ")
            .push_bind(i64::from(plan.limit));

        let rows = qb
            .build_query_as::<StockEntryRow>()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("filter_stock", e))?;

        span.record("row_count", rows.len());
        Ok(plan.finish(
            rows.into_iter().map(StockEntry::from).collect(),
            |e: &StockEntry| e.id.get(),
        ))
    }

    #[instrument(
        skip(self, filter),
        fields(
            storage_id = ?filter.storage_id,
            operation = tracing::field::Empty,
            row_count = tracing::field::Empty
        ),
        err
    )]
    async fn filter_history(
        &self,
        filter: &HistoryFilter,
        page: PageRequest,
    ) -> Result<Page<HistoryView>, StoreError> {
        let span = Span::current();
        span.record("operation", "filter_history");

        let plan = page.plan(SortOrder::Descending);
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT
                h.id, h.stock_entry_id, h.storage_id, h.actor_id, h.status, h.affected,
                h.created_at, s.gsm, s.width, s.io, s.material_number, s.quantity,
                s.location, m.username, m.photo
            FROM history h
            JOIN stock_entry s ON s.id = h.stock_entry_id
            LEFT JOIN member_profile m ON m.id = h.actor_id
            WHERE TRUE
            "#,
        );
        if let Some(storage_id) = filter.storage_id {
            qb.push(" AND h.storage_id = ").push_bind(storage_id.get());
        }
        if let Some(status) = filter.status {
            qb.push(" AND h.status = ").push_bind(status.as_str());
        }
        if let Some(start) = filter.start {
            qb.push(" AND h.created_at >= ").push_bind(start);
        }
        if let Some(end) = filter.end {
            qb.push(" AND h.created_at <= ").push_bind(end);
        }
        if let Some(bound) = plan.bound {
            qb.push(" AND h.id ")
                .push(bound.sql_operator())
                .push(" ")
                .push_bind(bound.value());
        }
        qb.push(" ORDER BY h.id ")
            .push(plan.scan_order.as_sql())
            .push(" LIMIT ")
            .push_bind(i64::from(plan.limit));

        let rows = qb
            .build_query_as::<HistoryViewRow>()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("filter_history", e))?;

        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            views.push(HistoryView::try_from(row)?);
        }

        span.record("row_count", views.len());
        Ok(plan.finish(views, |v: &HistoryView| v.id.get()))
    }
}

/// One Postgres transaction. Dropping it without commit rolls back.
pub struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StockLedger for PostgresUnitOfWork {
    #[instrument(skip(self, entry), fields(storage_id = %entry.storage_id, location = %entry.location), err)]
    async fn upsert(&mut self, entry: NewStockEntry) -> Result<StockEntry, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO stock_entry (
                storage_id, gsm, width, io, material_number, quantity, location
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (storage_id, gsm, width, io, material_number, location)
                WHERE NOT is_deleted
            DO UPDATE SET
                quantity = stock_entry.quantity + EXCLUDED.quantity,
                updated_at = NOW()
            RETURNING {STOCK_COLUMNS}
            "#
        ))
        .bind(entry.storage_id.get())
        .bind(entry.spec.gsm)
        .bind(entry.spec.width)
        .bind(entry.spec.io)
        .bind(entry.spec.material_number)
        .bind(entry.quantity)
        .bind(entry.location.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("upsert_stock", e))?;

        Ok(StockEntryRow::from_row(&row)
            .map_err(|e| map_sqlx_error("decode_stock_entry", e))?
            .into())
    }

    #[instrument(skip(self), fields(entry_id = %id), err)]
    async fn find_by_id_for_update(&mut self, id: StockEntryId) -> Result<StockEntry, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_entry WHERE id = $1 AND NOT is_deleted FOR UPDATE"
        ))
        .bind(id.get())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_by_id_for_update", e))?;

        Ok(StockEntryRow::from_row(&row)
            .map_err(|e| map_sqlx_error("decode_stock_entry", e))?
            .into())
    }

    #[instrument(skip(self, entry), fields(entry_id = %entry.id, quantity = entry.quantity), err)]
    async fn update(&mut self, entry: &StockEntry) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE stock_entry
            SET
                storage_id = $1, gsm = $2, width = $3, io = $4, material_number = $5,
                quantity = $6, location = $7, updated_at = NOW()
            WHERE id = $8 AND NOT is_deleted
            "#,
        )
        .bind(entry.storage_id.get())
        .bind(entry.spec.gsm)
        .bind(entry.spec.width)
        .bind(entry.spec.io)
        .bind(entry.spec.material_number)
        .bind(entry.quantity)
        .bind(entry.location.as_str())
        .bind(entry.id.get())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_stock", e))?;

        if result.rows_affected() != 1 {
            return Err(StoreError::RowNotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(entry_id = %id), err)]
    async fn soft_delete(&mut self, id: StockEntryId) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE stock_entry
            SET quantity = 0, is_deleted = TRUE, updated_at = NOW()
            WHERE id = $1 AND NOT is_deleted
            "#,
        )
        .bind(id.get())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("soft_delete_stock", e))?;

        if result.rows_affected() != 1 {
            return Err(StoreError::RowNotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl AuditTrail for PostgresUnitOfWork {
    #[instrument(
        skip(self, record),
        fields(entry_id = %record.stock_entry_id, status = %record.status, affected = record.affected),
        err
    )]
    async fn create(&mut self, record: NewHistoryRecord) -> Result<HistoryId, StoreError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO history (stock_entry_id, storage_id, actor_id, status, affected)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(record.stock_entry_id.get())
        .bind(record.storage_id.get())
        .bind(record.actor_id.get())
        .bind(record.status.as_str())
        .bind(record.affected)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("create_history", e))?;

        Ok(HistoryId::new(id))
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn commit(self) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

/// Map SQLx errors to `StoreError`.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("22003") => StoreError::QuantityOutOfRange(msg),
                // 23503 foreign key, 23514 check constraint
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::RowNotFound,
        sqlx::Error::PoolClosed => {
            StoreError::Database(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Database(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Database row representation for stock entries.
struct StockEntryRow {
    id: i64,
    storage_id: i64,
    gsm: i64,
    width: i64,
    io: i64,
    material_number: i64,
    quantity: i64,
    location: String,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for StockEntryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(StockEntryRow {
            id: row.try_get("id")?,
            storage_id: row.try_get("storage_id")?,
            gsm: row.try_get("gsm")?,
            width: row.try_get("width")?,
            io: row.try_get("io")?,
            material_number: row.try_get("material_number")?,
            quantity: row.try_get("quantity")?,
            location: row.try_get("location")?,
            is_deleted: row.try_get("is_deleted")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<StockEntryRow> for StockEntry {
    fn from(row: StockEntryRow) -> Self {
        StockEntry {
            id: StockEntryId::new(row.id),
            storage_id: StorageId::new(row.storage_id),
            spec: Specification {
                gsm: row.gsm,
                width: row.width,
                io: row.io,
                material_number: row.material_number,
            },
            quantity: row.quantity,
            location: Location::from_stored(row.location),
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Database row representation for joined history listings.
struct HistoryViewRow {
    id: i64,
    stock_entry_id: i64,
    storage_id: i64,
    actor_id: i64,
    status: String,
    affected: i64,
    created_at: DateTime<Utc>,
    gsm: i64,
    width: i64,
    io: i64,
    material_number: i64,
    quantity: i64,
    location: String,
    username: Option<String>,
    photo: Option<String>,
}

impl<'r> FromRow<'r, PgRow> for HistoryViewRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(HistoryViewRow {
            id: row.try_get("id")?,
            stock_entry_id: row.try_get("stock_entry_id")?,
            storage_id: row.try_get("storage_id")?,
            actor_id: row.try_get("actor_id")?,
            status: row.try_get("status")?,
            affected: row.try_get("affected")?,
            created_at: row.try_get("created_at")?,
            gsm: row.try_get("gsm")?,
            width: row.try_get("width")?,
            io: row.try_get("io")?,
            material_number: row.try_get("material_number")?,
            quantity: row.try_get("quantity")?,
            location: row.try_get("location")?,
            username: row.try_get("username")?,
            photo: row.try_get("photo")?,
        })
    }
}

impl TryFrom<HistoryViewRow> for HistoryView {
    type Error = StoreError;

    fn try_from(row: HistoryViewRow) -> Result<Self, Self::Error> {
        let status: HistoryStatus = row
            .status
            .parse()
            .map_err(|_| StoreError::Database(format!("unknown history status '{}'", row.status)))?;
        Ok(HistoryView {
            id: HistoryId::new(row.id),
            stock_entry_id: StockEntryId::new(row.stock_entry_id),
            storage_id: StorageId::new(row.storage_id),
            status,
            affected: row.affected,
            created_at: row.created_at,
            spec: Specification {
                gsm: row.gsm,
                width: row.width,
                io: row.io,
                material_number: row.material_number,
            },
            quantity: row.quantity,
            location: Location::from_stored(row.location),
            actor: MemberSummary {
                id: MemberId::new(row.actor_id),
                username: row.username,
                photo: row.photo,
            },
        })
    }
}
