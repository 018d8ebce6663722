//! Infrastructure layer: storage, services, configuration.
//!
//! The domain rules live in `stockledger-inventory`; this crate persists them
//! and exposes them as services over one `InventoryStore`.

pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod error;
pub mod history;
pub mod ledger;
pub mod low_stock;
pub mod recipes;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use bootstrap::{StockServices, open, open_store};
pub use catalog::ItemCatalog;
pub use config::{LedgerConfig, SkuFormat};
pub use error::{LedgerError, LedgerResult};
pub use history::TransactionHistory;
pub use ledger::{MovementReceipt, StockLedger};
pub use low_stock::LowStockMonitor;
pub use recipes::RecipeRegistry;
pub use store::{InMemoryInventoryStore, InventoryStore, PostgresInventoryStore, StoreError};
