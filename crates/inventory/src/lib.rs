//! Inventory domain module.
//!
//! This crate contains the business rules of the stock ledger, implemented purely
//! as deterministic domain logic (no IO, no storage): catalog items, units of
//! measure, recipes and BOM explosion, movement planning, and the derived
//! low-stock and reconciliation views.

pub mod item;
pub mod low_stock;
pub mod movement;
pub mod recipe;
pub mod reconcile;
pub mod transaction;
pub mod unit;

pub use item::{Item, ItemPatch, NewItem};
pub use low_stock::{LowStockEntry, below_threshold};
pub use movement::{ItemChange, MovementLine, MovementRequest, StockMovement};
pub use recipe::{Recipe, RecipeLine};
pub use reconcile::{Discrepancy, reconcile};
pub use transaction::{
    MovementKind, PendingTransaction, TransactionFilter, TransactionRecord,
};
pub use unit::UnitOfMeasure;
