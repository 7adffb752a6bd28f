//! Infrastructure layer: stores, schema, and the movement engine.

pub mod engine;
pub mod membership;
pub mod store;

#[cfg(test)]
mod test_support;

pub use engine::{HISTORY_PAGE_LIMIT, InventoryService, MovementEngine, STOCK_PAGE_LIMIT};
pub use membership::{
    InMemoryMembershipDirectory, MembershipDirectory, PostgresMembershipDirectory,
};
pub use store::{
    InMemoryInventoryStore, InventoryStore, PostgresInventoryStore, StoreError, UnitOfWork,
};
