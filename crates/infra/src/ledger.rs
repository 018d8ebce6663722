//! Stock ledger: every quantity-changing operation.
//!
//! ## Execution Flow
//!
//! ```text
//! Receive / Issue / IssueBatch / IssueAssembled
//!   ↓
//! 1. Build the movement request (IssueAssembled: explode the recipe first)
//!   ↓
//! 2. Load a snapshot of every touched item
//!   ↓
//! 3. Plan: validate every line and compute new quantities (pure, no writes)
//!   ↓
//! 4. Commit: version-check, update quantities and append log records atomically
//!   ↓  (version conflict → back to 2, up to the configured attempts)
//! 5. Return the receipt (reference code + appended records)
//! ```
//!
//! Validation always finishes before anything is written, and the write is a
//! single atomic unit, so a failed call has no effect. Concurrent calls touching
//! the same SKU are serialized by the version check: the loser re-plans against
//! the fresh quantity and either succeeds or fails with `InsufficientStock`,
//! never silently overwriting the winner.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use stockledger_core::{Actor, DomainError, ProductId, Quantity, RefCode, Sku};
use stockledger_inventory::{
    MovementKind, MovementLine, MovementRequest, StockMovement, TransactionRecord,
};

use crate::error::{LedgerError, LedgerResult};
use crate::store::{InventoryStore, StoreError};

/// Result of a successful ledger call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementReceipt {
    /// Shared by every record the call wrote.
    pub ref_code: RefCode,
    pub records: Vec<TransactionRecord>,
}

pub struct StockLedger<S: ?Sized = dyn InventoryStore> {
    store: Arc<S>,
    commit_attempts: u32,
}

impl<S: ?Sized> Clone for StockLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            commit_attempts: self.commit_attempts,
        }
    }
}

impl<S> StockLedger<S>
where
    S: InventoryStore + ?Sized,
{
    pub fn new(store: Arc<S>, commit_attempts: u32) -> Self {
        Self {
            store,
            commit_attempts: commit_attempts.max(1),
        }
    }

    /// Increase on-hand quantity. Writes one `IN` record.
    #[instrument(
        skip(self, sku, qty, user, reason),
        fields(sku = %sku, qty = %qty, user = %user),
        err
    )]
    pub fn receive(
        &self,
        sku: &Sku,
        qty: Quantity,
        user: &Actor,
        reason: &str,
    ) -> LedgerResult<MovementReceipt> {
        self.execute(MovementRequest::new(
            MovementKind::In,
            vec![MovementLine::new(sku.clone(), qty)],
            user.clone(),
            reason,
        ))
    }

    /// Decrease on-hand quantity. Writes one `OUT` record.
    #[instrument(
        skip(self, sku, qty, user, reason),
        fields(sku = %sku, qty = %qty, user = %user),
        err
    )]
    pub fn issue(
        &self,
        sku: &Sku,
        qty: Quantity,
        user: &Actor,
        reason: &str,
    ) -> LedgerResult<MovementReceipt> {
        self.execute(MovementRequest::new(
            MovementKind::Out,
            vec![MovementLine::new(sku.clone(), qty)],
            user.clone(),
            reason,
        ))
    }

    /// Issue several lines as one movement: all of them or none.
    ///
    /// Lines naming the same SKU are summed before the sufficiency check; each
    /// line still gets its own `OUT` record.
    #[instrument(skip(self, lines, user, reason), fields(lines = lines.len(), user = %user), err)]
    pub fn issue_batch(
        &self,
        lines: Vec<MovementLine>,
        user: &Actor,
        reason: &str,
    ) -> LedgerResult<MovementReceipt> {
        self.execute(MovementRequest::new(
            MovementKind::Out,
            lines,
            user.clone(),
            reason,
        ))
    }

    /// Issue `units` of an assembled product by consuming its components.
    ///
    /// The recipe is exploded one level deep; each component is decremented by
    /// `qty_per_unit × units` and gets one `OUT_BOM` record. A short component fails
    /// the whole call with `InsufficientStock` naming it.
    #[instrument(
        skip(self, product, units, user, reason),
        fields(product = %product, units = %units, user = %user),
        err
    )]
    pub fn issue_assembled(
        &self,
        product: &ProductId,
        units: Quantity,
        user: &Actor,
        reason: &str,
    ) -> LedgerResult<MovementReceipt> {
        units.ensure_positive(product.as_str())?;
        let recipe = self
            .store
            .get_recipe(product)?
            .ok_or_else(|| DomainError::RecipeNotDefined(product.clone()))?;
        let lines = recipe.explode(units)?;
        debug!(components = lines.len(), "recipe exploded");

        self.execute(MovementRequest::new(
            MovementKind::OutBom,
            lines,
            user.clone(),
            reason,
        ))
    }

    fn execute(&self, request: MovementRequest) -> LedgerResult<MovementReceipt> {
        let skus = request.skus();
        let ref_code = request.kind.new_ref_code(Utc::now());

        let mut attempt = 0;
        loop {
            attempt += 1;

            let items = self.store.load_items(&skus)?;
            let movement = StockMovement::plan(&request, ref_code.clone(), &items, Utc::now())
                .inspect_err(|e| debug!(error = %e, "movement rejected"))?;

            match self.store.commit(movement) {
                Ok(records) => {
                    info!(
                        ref_code = %ref_code,
                        kind = %request.kind,
                        records = records.len(),
                        attempt,
                        "movement committed"
                    );
                    return Ok(MovementReceipt { ref_code, records });
                }
                Err(StoreError::Conflict { sku, source }) => {
                    if attempt >= self.commit_attempts {
                        warn!(
                            sku = %sku,
                            attempt,
                            error = %source,
                            "giving up on concurrent updates"
                        );
                        return Err(LedgerError::Conflict {
                            sku,
                            attempts: attempt,
                        });
                    }
                    warn!(sku = %sku, attempt, error = %source, "concurrent update, re-planning");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
