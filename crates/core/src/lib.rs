//! `paperstock-core`: shared building blocks for the stock ledger.
//!
//! This crate contains **pure** primitives (no infrastructure concerns):
//! strongly-typed identifiers, the error model shared by every layer, and the
//! keyset pagination primitives used by both stock and audit queries.

pub mod error;
pub mod id;
pub mod page;

pub use error::{DomainError, DomainResult, ErrorKind};
pub use id::{HistoryId, MemberId, StockEntryId, StorageId};
pub use page::{Bound, Cursor, Direction, KeysetPlan, Page, PageRequest, SortOrder};
