use std::collections::{BTreeMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use stockledger_core::{DomainError, ProductId, Quantity, Sku};
use stockledger_inventory::{
    Item, ItemPatch, NewItem, Recipe, StockMovement, TransactionFilter, TransactionRecord,
};

use super::r#trait::{InventoryStore, StoreError};
use crate::config::SkuFormat;

#[derive(Debug, Default)]
struct State {
    items: BTreeMap<Sku, Item>,
    recipes: BTreeMap<ProductId, Recipe>,
    log: Vec<TransactionRecord>,
    /// SKUs with at least one log record; never reissued.
    logged: HashSet<Sku>,
    next_sku_offset: u64,
}

impl State {
    fn sku_taken(&self, sku: &Sku) -> bool {
        self.items.contains_key(sku) || self.logged.contains(sku)
    }

    fn name_taken(&self, name: &str, except: Option<&Sku>) -> bool {
        self.items
            .values()
            .any(|i| i.name == name && Some(&i.sku) != except)
    }

    /// Next free SKU and the offset to resume from once it is actually used.
    fn next_free_sku(&self, format: &SkuFormat) -> Result<(Sku, u64), StoreError> {
        let mut offset = self.next_sku_offset;
        loop {
            let candidate = format.sku_for(offset)?;
            offset += 1;
            if !self.sku_taken(&candidate) {
                return Ok((candidate, offset));
            }
        }
    }

    fn recipes_using(&self, sku: &Sku) -> Vec<ProductId> {
        self.recipes
            .values()
            .filter(|r| r.uses(sku))
            .map(|r| r.product().clone())
            .collect()
    }
}

/// In-memory inventory store.
///
/// All state sits behind a single lock, so every write is one critical section:
/// commits are atomic and serialized. Intended for tests, dev and single-process
/// deployments.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    skus: SkuFormat,
    state: RwLock<State>,
}

impl InMemoryInventoryStore {
    pub fn new(skus: SkuFormat) -> Self {
        Self {
            skus,
            state: RwLock::new(State::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

impl InventoryStore for InMemoryInventoryStore {
    fn create_item(
        &self,
        new: NewItem,
        default_min_stock: Quantity,
        at: DateTime<Utc>,
    ) -> Result<Item, StoreError> {
        let mut state = self.write()?;

        let (sku, next_offset) = match new.sku.clone() {
            Some(sku) => {
                if state.sku_taken(&sku) {
                    return Err(DomainError::duplicate("sku", sku.as_str()).into());
                }
                (sku, None)
            }
            None => {
                let (sku, next) = state.next_free_sku(&self.skus)?;
                (sku, Some(next))
            }
        };

        let item = new.into_item(sku, default_min_stock, at)?;
        if state.name_taken(&item.name, None) {
            return Err(DomainError::duplicate("name", item.name).into());
        }

        if let Some(next) = next_offset {
            state.next_sku_offset = next;
        }
        state.items.insert(item.sku.clone(), item.clone());
        Ok(item)
    }

    fn update_item(
        &self,
        sku: &Sku,
        patch: &ItemPatch,
        at: DateTime<Utc>,
    ) -> Result<Item, StoreError> {
        let mut state = self.write()?;

        let current = state
            .items
            .get(sku)
            .ok_or_else(|| DomainError::UnknownSku(sku.clone()))?;
        let mut next = current.patched(patch, at)?;
        if state.name_taken(&next.name, Some(sku)) {
            return Err(DomainError::duplicate("name", next.name).into());
        }

        next.version += 1;
        state.items.insert(sku.clone(), next.clone());
        Ok(next)
    }

    fn delete_item(&self, sku: &Sku) -> Result<Item, StoreError> {
        let mut state = self.write()?;

        if !state.items.contains_key(sku) {
            return Err(DomainError::UnknownSku(sku.clone()).into());
        }
        let products = state.recipes_using(sku);
        if !products.is_empty() {
            return Err(DomainError::ItemInUse {
                sku: sku.clone(),
                products,
            }
            .into());
        }

        state
            .items
            .remove(sku)
            .ok_or_else(|| DomainError::UnknownSku(sku.clone()).into())
    }

    fn get_item(&self, sku: &Sku) -> Result<Option<Item>, StoreError> {
        Ok(self.read()?.items.get(sku).cloned())
    }

    fn list_items(&self) -> Result<Vec<Item>, StoreError> {
        Ok(self.read()?.items.values().cloned().collect())
    }

    fn find_items(&self, needle: &str) -> Result<Vec<Item>, StoreError> {
        Ok(self
            .read()?
            .items
            .values()
            .filter(|i| i.matches_search(needle))
            .cloned()
            .collect())
    }

    fn load_items(&self, skus: &[Sku]) -> Result<BTreeMap<Sku, Item>, StoreError> {
        let state = self.read()?;
        Ok(skus
            .iter()
            .filter_map(|sku| state.items.get(sku))
            .map(|item| (item.sku.clone(), item.clone()))
            .collect())
    }

    fn commit(&self, movement: StockMovement) -> Result<Vec<TransactionRecord>, StoreError> {
        let mut state = self.write()?;

        // Check everything before touching anything.
        for change in &movement.changes {
            let item = state
                .items
                .get(&change.sku)
                .ok_or_else(|| DomainError::UnknownSku(change.sku.clone()))?;
            change
                .expected
                .check(item.version)
                .map_err(|source| StoreError::Conflict {
                    sku: change.sku.clone(),
                    source,
                })?;
        }

        for change in movement.changes {
            if let Some(item) = state.items.get_mut(&change.sku) {
                item.quantity = change.new_quantity;
                item.version += 1;
                item.last_updated = movement.occurred_at;
            }
        }

        let mut next = state.log.last().map(|r| r.sequence).unwrap_or(0) + 1;
        let mut appended = Vec::with_capacity(movement.records.len());
        for pending in movement.records {
            let record = pending.into_record(next);
            next += 1;
            state.logged.insert(record.sku.clone());
            state.log.push(record.clone());
            appended.push(record);
        }

        Ok(appended)
    }

    fn query_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        Ok(filter.select(self.read()?.log.iter()))
    }

    fn replace_recipe(&self, recipe: Recipe) -> Result<(), StoreError> {
        let mut state = self.write()?;

        if let Some(missing) = recipe.missing_component(|sku| state.items.contains_key(sku)) {
            return Err(DomainError::UnknownSku(missing.clone()).into());
        }
        state.recipes.insert(recipe.product().clone(), recipe);
        Ok(())
    }

    fn get_recipe(&self, product: &ProductId) -> Result<Option<Recipe>, StoreError> {
        Ok(self.read()?.recipes.get(product).cloned())
    }

    fn remove_recipe(&self, product: &ProductId) -> Result<bool, StoreError> {
        Ok(self.write()?.recipes.remove(product).is_some())
    }

    fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        Ok(self.read()?.recipes.values().cloned().collect())
    }

    fn recipes_using(&self, sku: &Sku) -> Result<Vec<ProductId>, StoreError> {
        Ok(self.read()?.recipes_using(sku))
    }
}
