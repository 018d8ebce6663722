//! Domain error model.

use thiserror::Error;

use crate::id::{ProductId, Sku};
use crate::quantity::Quantity;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Storage failures belong to the infrastructure layer.
/// Every variant names the offending identifier so callers can present it without
/// re-deriving what went wrong.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A name or SKU collided with an existing catalog entry.
    #[error("duplicate key: {field} '{value}' already exists")]
    DuplicateKey { field: &'static str, value: String },

    /// A referenced SKU is absent from the catalog.
    #[error("unknown sku: {0}")]
    UnknownSku(Sku),

    /// A decrement exceeds the on-hand quantity.
    #[error(
        "insufficient stock for {sku}: requested {requested}, on hand {on_hand}, short {shortfall}"
    )]
    InsufficientStock {
        sku: Sku,
        requested: Quantity,
        on_hand: Quantity,
        shortfall: Quantity,
    },

    /// An assembled-product issue was requested without a registered recipe.
    #[error("no recipe defined for {0}")]
    RecipeNotDefined(ProductId),

    /// Zero, negative, non-numeric, or wrongly-precise quantity input.
    #[error("malformed quantity for {subject}: {reason}")]
    MalformedQuantity { subject: String, reason: String },

    /// The item is still referenced as a recipe component.
    #[error("item {sku} is used by recipes: {}", join_products(.products))]
    ItemInUse { sku: Sku, products: Vec<ProductId> },

    /// A value failed validation (e.g. empty name, empty recipe).
    #[error("validation failed: {0}")]
    Validation(String),
}

impl DomainError {
    pub fn duplicate(field: &'static str, value: impl Into<String>) -> Self {
        Self::DuplicateKey {
            field,
            value: value.into(),
        }
    }

    pub fn insufficient(sku: Sku, requested: Quantity, on_hand: Quantity) -> Self {
        Self::InsufficientStock {
            sku,
            requested,
            on_hand,
            shortfall: requested - on_hand,
        }
    }

    pub fn malformed(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedQuantity {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

fn join_products(products: &[ProductId]) -> String {
    products
        .iter()
        .map(ProductId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
