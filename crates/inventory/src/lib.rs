//! Base-paper stock domain.
//!
//! This crate contains the business rules for stock entries and their audit
//! trail, implemented purely as deterministic domain logic (no IO, no HTTP,
//! no storage). Persistence and transactions live in `paperstock-infra`.

pub mod filter;
pub mod history;
pub mod movement;
pub mod stock;

pub use filter::{HistoryFilter, StockFilter};
pub use history::{HistoryRecord, HistoryStatus, HistoryView, MemberSummary, NewHistoryRecord};
pub use movement::{DeleteEntry, Deliver, Delivery, MoveToList, StoreIntake};
pub use stock::{Area, Location, NaturalKey, NewStockEntry, Specification, StockEntry};
