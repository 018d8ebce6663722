//! Read-only queries over the transaction log.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use stockledger_core::{RefCode, Sku};
use stockledger_inventory::{Discrepancy, TransactionFilter, TransactionRecord, reconcile};

use crate::error::LedgerResult;
use crate::store::InventoryStore;

/// Queryable movement history.
///
/// The log is append-only; nothing here writes. Results are newest first.
pub struct TransactionHistory<S: ?Sized = dyn InventoryStore> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for TransactionHistory<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> TransactionHistory<S>
where
    S: InventoryStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn query(&self, filter: &TransactionFilter) -> LedgerResult<Vec<TransactionRecord>> {
        Ok(self.store.query_transactions(filter)?)
    }

    /// Records for one SKU, optionally limited to `[from, to)`.
    pub fn for_sku(
        &self,
        sku: &Sku,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> LedgerResult<Vec<TransactionRecord>> {
        let mut filter = TransactionFilter::for_sku(sku.clone());
        if let Some((from, to)) = range {
            filter = filter.between(from, to);
        }
        self.query(&filter)
    }

    /// Every record written by one ledger call.
    pub fn for_ref(&self, ref_code: &RefCode) -> LedgerResult<Vec<TransactionRecord>> {
        self.query(&TransactionFilter::for_ref(ref_code.clone()))
    }

    /// Check that the log explains every item's current quantity.
    ///
    /// Empty when consistent.
    #[instrument(skip(self), err)]
    pub fn reconcile(&self) -> LedgerResult<Vec<Discrepancy>> {
        let items = self.store.list_items()?;
        let log = self.store.query_transactions(&TransactionFilter::default())?;
        let discrepancies = reconcile(&items, &log);

        if discrepancies.is_empty() {
            info!(items = items.len(), records = log.len(), "ledger reconciled");
        } else {
            warn!(count = discrepancies.len(), "ledger discrepancies found");
        }
        Ok(discrepancies)
    }
}
