//! Recipe (bill of materials) registry service.

use std::sync::Arc;

use tracing::{info, instrument};

use stockledger_core::{ProductId, Sku};
use stockledger_inventory::{Recipe, RecipeLine};

use crate::error::LedgerResult;
use crate::store::InventoryStore;

pub struct RecipeRegistry<S: ?Sized = dyn InventoryStore> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for RecipeRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> RecipeRegistry<S>
where
    S: InventoryStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Define (or fully redefine) the components of `product`.
    ///
    /// The previous component set is replaced, never merged. Every component must
    /// be a catalog item, checked in the same atomic step as the replacement.
    #[instrument(
        skip(self, product, lines),
        fields(product = %product, components = lines.len()),
        err
    )]
    pub fn define_recipe(
        &self,
        product: ProductId,
        lines: Vec<RecipeLine>,
    ) -> LedgerResult<Recipe> {
        let recipe = Recipe::define(product, lines)?;
        self.store.replace_recipe(recipe.clone())?;
        info!("recipe defined");
        Ok(recipe)
    }

    /// Components of `product`; empty when it has no recipe.
    pub fn get_recipe(&self, product: &ProductId) -> LedgerResult<Vec<RecipeLine>> {
        Ok(self
            .store
            .get_recipe(product)?
            .map(Recipe::into_lines)
            .unwrap_or_default())
    }

    /// The full recipe, if one is defined.
    pub fn find_recipe(&self, product: &ProductId) -> LedgerResult<Option<Recipe>> {
        Ok(self.store.get_recipe(product)?)
    }

    /// Returns whether a recipe existed.
    #[instrument(skip(self, product), fields(product = %product), err)]
    pub fn remove_recipe(&self, product: &ProductId) -> LedgerResult<bool> {
        let removed = self.store.remove_recipe(product)?;
        if removed {
            info!("recipe removed");
        }
        Ok(removed)
    }

    pub fn list_recipes(&self) -> LedgerResult<Vec<Recipe>> {
        Ok(self.store.list_recipes()?)
    }

    /// Products whose recipe consumes `sku`.
    pub fn recipes_using(&self, sku: &Sku) -> LedgerResult<Vec<ProductId>> {
        Ok(self.store.recipes_using(sku)?)
    }
}
