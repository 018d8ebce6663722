//! Persistence boundary for catalog, recipes and the transaction log.
//!
//! The services never touch storage directly: they go through `InventoryStore`,
//! whose implementations provide the atomic scope every ledger call runs in.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryInventoryStore;
pub use postgres::PostgresInventoryStore;
pub use r#trait::{InventoryStore, StoreError};
