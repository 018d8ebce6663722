use std::sync::Arc;

use tracing::debug;

use stockledger_inventory::{LowStockEntry, below_threshold};

use crate::error::LedgerResult;
use crate::store::InventoryStore;

/// Reorder view over the catalog: items at or below their threshold.
pub struct LowStockMonitor<S: ?Sized = dyn InventoryStore> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for LowStockMonitor<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> LowStockMonitor<S>
where
    S: InventoryStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Ordered by ascending quantity, then SKU. Reflects the catalog at call time.
    pub fn list_below_threshold(&self) -> LedgerResult<Vec<LowStockEntry>> {
        let items = self.store.list_items()?;
        let entries = below_threshold(&items);
        debug!(flagged = entries.len(), "low-stock scan");
        Ok(entries)
    }
}
