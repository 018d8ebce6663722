//! Item catalog service.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use stockledger_core::{DomainError, Quantity, Sku};
use stockledger_inventory::{Item, ItemPatch, NewItem};

use crate::error::LedgerResult;
use crate::store::InventoryStore;

/// Create, update, delete and look up catalog items.
///
/// Quantity is never written here: the opening quantity is set once at creation
/// and every later change goes through the `StockLedger`.
pub struct ItemCatalog<S: ?Sized = dyn InventoryStore> {
    store: Arc<S>,
    default_min_stock: Quantity,
}

impl<S: ?Sized> Clone for ItemCatalog<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            default_min_stock: self.default_min_stock,
        }
    }
}

impl<S> ItemCatalog<S>
where
    S: InventoryStore + ?Sized,
{
    pub fn new(store: Arc<S>, default_min_stock: Quantity) -> Self {
        Self {
            store,
            default_min_stock,
        }
    }

    /// Add an item. Without a caller-supplied SKU the next sequential one is allocated.
    #[instrument(skip(self, new), fields(name = %new.name), err)]
    pub fn create_item(&self, new: NewItem) -> LedgerResult<Item> {
        let item = self
            .store
            .create_item(new, self.default_min_stock, Utc::now())?;
        info!(sku = %item.sku, quantity = %item.quantity, unit = %item.unit, "item created");
        Ok(item)
    }

    /// Edit descriptive fields. Not logged as a stock movement.
    #[instrument(skip(self, sku, patch), fields(sku = %sku), err)]
    pub fn update_item(&self, sku: &Sku, patch: ItemPatch) -> LedgerResult<Item> {
        if patch.is_empty() {
            debug!("empty patch");
            return self.get_item(sku);
        }
        let item = self.store.update_item(sku, &patch, Utc::now())?;
        info!(version = item.version, "item updated");
        Ok(item)
    }

    /// Remove an item. Fails with `ItemInUse` while any recipe lists it.
    #[instrument(skip(self, sku), fields(sku = %sku), err)]
    pub fn delete_item(&self, sku: &Sku) -> LedgerResult<Item> {
        let item = self.store.delete_item(sku)?;
        info!("item deleted");
        Ok(item)
    }

    pub fn get_item(&self, sku: &Sku) -> LedgerResult<Item> {
        self.store
            .get_item(sku)?
            .ok_or_else(|| DomainError::UnknownSku(sku.clone()).into())
    }

    pub fn find_items(&self, needle: &str) -> LedgerResult<Vec<Item>> {
        Ok(self.store.find_items(needle)?)
    }

    pub fn list_items(&self) -> LedgerResult<Vec<Item>> {
        Ok(self.store.list_items()?)
    }
}
