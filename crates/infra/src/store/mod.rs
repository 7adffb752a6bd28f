//! Stock ledger and audit trail storage boundary.
//!
//! The movement engine only sees the traits in [`r#trait`]; the Postgres
//! backend is the production store, the in-memory one serves tests and local
//! development.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::{InMemoryInventoryStore, InMemoryUnitOfWork};
pub use postgres::{PostgresInventoryStore, PostgresUnitOfWork, SCHEMA, connect, migrate};
pub use r#trait::{AuditTrail, InventoryStore, StockLedger, StoreError, UnitOfWork};
