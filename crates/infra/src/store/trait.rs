use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use stockledger_core::{DomainError, ProductId, Quantity, Sku, VersionConflict};
use stockledger_inventory::{
    Item, ItemPatch, NewItem, Recipe, StockMovement, TransactionFilter, TransactionRecord,
};

/// Storage operation error.
///
/// `Rejected` carries domain checks that can only be made inside the store's
/// atomic scope (uniqueness, existence at commit time). Everything else is an
/// infrastructure failure and leaves the stored state untouched.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Rejected(#[from] DomainError),

    #[error("item {sku} changed concurrently: {source}")]
    Conflict { sku: Sku, source: VersionConflict },

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt stored data: {0}")]
    Corrupt(String),
}

/// Unit-of-work boundary over the item catalog, the recipe registry and the
/// transaction log.
///
/// Every mutating call is atomic: it either applies completely or leaves the
/// store unchanged. `commit` is the only operation that changes item quantities
/// or appends to the log, and it does both in one atomic unit.
///
/// Implementations must:
/// - enforce SKU and name uniqueness, and never reuse a SKU that has log history
/// - allocate sequential SKUs atomically when the caller supplies none
/// - bump an item's version on every write to it
/// - verify every `ItemChange::expected` version inside `commit` before applying
///   anything, failing with `StoreError::Conflict` on the first mismatch
/// - assign strictly increasing sequence numbers to appended records
pub trait InventoryStore: Send + Sync {
    /// Insert a new item, allocating its SKU if `new.sku` is `None`.
    fn create_item(
        &self,
        new: NewItem,
        default_min_stock: Quantity,
        at: DateTime<Utc>,
    ) -> Result<Item, StoreError>;

    /// Apply a descriptive patch. Never changes quantity.
    fn update_item(
        &self,
        sku: &Sku,
        patch: &ItemPatch,
        at: DateTime<Utc>,
    ) -> Result<Item, StoreError>;

    /// Remove an item that no recipe references.
    fn delete_item(&self, sku: &Sku) -> Result<Item, StoreError>;

    fn get_item(&self, sku: &Sku) -> Result<Option<Item>, StoreError>;

    /// All items, ordered by SKU.
    fn list_items(&self) -> Result<Vec<Item>, StoreError>;

    /// Items whose name or SKU contains `needle` (case-insensitive), ordered by SKU.
    fn find_items(&self, needle: &str) -> Result<Vec<Item>, StoreError>;

    /// Snapshot of the requested items. Unknown SKUs are simply absent.
    fn load_items(&self, skus: &[Sku]) -> Result<BTreeMap<Sku, Item>, StoreError>;

    /// Apply a planned movement: version checks, quantity updates and log appends.
    fn commit(&self, movement: StockMovement) -> Result<Vec<TransactionRecord>, StoreError>;

    /// Matching records, newest first.
    fn query_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionRecord>, StoreError>;

    /// Replace the full component set of a product. Every component must exist.
    fn replace_recipe(&self, recipe: Recipe) -> Result<(), StoreError>;

    fn get_recipe(&self, product: &ProductId) -> Result<Option<Recipe>, StoreError>;

    /// Returns whether a recipe was removed.
    fn remove_recipe(&self, product: &ProductId) -> Result<bool, StoreError>;

    /// All recipes, ordered by product.
    fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError>;

    /// Products whose recipe lists `sku` as a component, ordered.
    fn recipes_using(&self, sku: &Sku) -> Result<Vec<ProductId>, StoreError>;
}

impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    fn create_item(
        &self,
        new: NewItem,
        default_min_stock: Quantity,
        at: DateTime<Utc>,
    ) -> Result<Item, StoreError> {
        (**self).create_item(new, default_min_stock, at)
    }

    fn update_item(
        &self,
        sku: &Sku,
        patch: &ItemPatch,
        at: DateTime<Utc>,
    ) -> Result<Item, StoreError> {
        (**self).update_item(sku, patch, at)
    }

    fn delete_item(&self, sku: &Sku) -> Result<Item, StoreError> {
        (**self).delete_item(sku)
    }

    fn get_item(&self, sku: &Sku) -> Result<Option<Item>, StoreError> {
        (**self).get_item(sku)
    }

    fn list_items(&self) -> Result<Vec<Item>, StoreError> {
        (**self).list_items()
    }

    fn find_items(&self, needle: &str) -> Result<Vec<Item>, StoreError> {
        (**self).find_items(needle)
    }

    fn load_items(&self, skus: &[Sku]) -> Result<BTreeMap<Sku, Item>, StoreError> {
        (**self).load_items(skus)
    }

    fn commit(&self, movement: StockMovement) -> Result<Vec<TransactionRecord>, StoreError> {
        (**self).commit(movement)
    }

    fn query_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        (**self).query_transactions(filter)
    }

    fn replace_recipe(&self, recipe: Recipe) -> Result<(), StoreError> {
        (**self).replace_recipe(recipe)
    }

    fn get_recipe(&self, product: &ProductId) -> Result<Option<Recipe>, StoreError> {
        (**self).get_recipe(product)
    }

    fn remove_recipe(&self, product: &ProductId) -> Result<bool, StoreError> {
        (**self).remove_recipe(product)
    }

    fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        (**self).list_recipes()
    }

    fn recipes_using(&self, sku: &Sku) -> Result<Vec<ProductId>, StoreError> {
        (**self).recipes_using(sku)
    }
}
