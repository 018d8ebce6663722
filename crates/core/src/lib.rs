//! `stockledger-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod error;
pub mod id;
pub mod quantity;

pub use aggregate::{AggregateRoot, ExpectedVersion, VersionConflict};
pub use error::{DomainError, DomainResult};
pub use id::{Actor, ProductId, RefCode, Sku, TransactionId};
pub use quantity::Quantity;
