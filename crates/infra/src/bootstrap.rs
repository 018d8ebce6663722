//! Wiring: pick a store from configuration and build the services over it.

use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;
use tracing::info;

use crate::catalog::ItemCatalog;
use crate::config::LedgerConfig;
use crate::history::TransactionHistory;
use crate::ledger::StockLedger;
use crate::low_stock::LowStockMonitor;
use crate::recipes::RecipeRegistry;
use crate::store::{InMemoryInventoryStore, InventoryStore, PostgresInventoryStore};

/// Every service, sharing one store.
pub struct StockServices<S: ?Sized = dyn InventoryStore> {
    pub catalog: ItemCatalog<S>,
    pub recipes: RecipeRegistry<S>,
    pub ledger: StockLedger<S>,
    pub history: TransactionHistory<S>,
    pub low_stock: LowStockMonitor<S>,
}

impl<S> StockServices<S>
where
    S: InventoryStore + ?Sized,
{
    pub fn new(store: Arc<S>, config: &LedgerConfig) -> Self {
        Self {
            catalog: ItemCatalog::new(store.clone(), config.default_min_stock),
            recipes: RecipeRegistry::new(store.clone()),
            ledger: StockLedger::new(store.clone(), config.commit_attempts),
            history: TransactionHistory::new(store.clone()),
            low_stock: LowStockMonitor::new(store),
        }
    }
}

impl<S: ?Sized> Clone for StockServices<S> {
    fn clone(&self) -> Self {
        Self {
            catalog: self.catalog.clone(),
            recipes: self.recipes.clone(),
            ledger: self.ledger.clone(),
            history: self.history.clone(),
            low_stock: self.low_stock.clone(),
        }
    }
}

/// Open the store `config` selects: PostgreSQL when a database URL is set
/// (schema applied on open), otherwise a fresh in-memory store.
///
/// The PostgreSQL store must be used from a multi-threaded tokio runtime.
pub async fn open_store(config: &LedgerConfig) -> anyhow::Result<Arc<dyn InventoryStore>> {
    let Some(url) = config.database_url.as_deref() else {
        info!("using in-memory inventory store");
        return Ok(Arc::new(InMemoryInventoryStore::new(config.sku_format.clone())));
    };

    let pool = PgPool::connect(url)
        .await
        .context("failed to connect to PostgreSQL (check DATABASE_URL)")?;
    let store = PostgresInventoryStore::new(pool, config.sku_format.clone());
    store
        .migrate()
        .await
        .context("failed to apply inventory schema")?;

    info!("using PostgreSQL inventory store");
    Ok(Arc::new(store))
}

/// `open_store` plus service wiring.
pub async fn open(config: &LedgerConfig) -> anyhow::Result<StockServices> {
    let store = open_store(config).await?;
    Ok(StockServices::new(store, config))
}
