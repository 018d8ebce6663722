use serde::{Deserialize, Serialize};

use stockledger_core::{Quantity, Sku};

use crate::item::Item;
use crate::unit::UnitOfMeasure;

/// An item at or below its reorder threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockEntry {
    pub sku: Sku,
    pub name: String,
    pub quantity: Quantity,
    pub min_stock: Quantity,
    pub unit: UnitOfMeasure,
    pub supplier: Option<String>,
}

impl LowStockEntry {
    /// How much is needed to get back above the threshold.
    pub fn deficit(&self) -> Quantity {
        self.min_stock - self.quantity
    }
}

impl From<&Item> for LowStockEntry {
    fn from(item: &Item) -> Self {
        Self {
            sku: item.sku.clone(),
            name: item.name.clone(),
            quantity: item.quantity,
            min_stock: item.min_stock,
            unit: item.unit,
            supplier: item.supplier.clone(),
        }
    }
}

/// Items at or below threshold, lowest quantity first (ties by SKU).
pub fn below_threshold<'a>(items: impl IntoIterator<Item = &'a Item>) -> Vec<LowStockEntry> {
    let mut entries: Vec<LowStockEntry> = items
        .into_iter()
        .filter(|item| item.is_low_stock())
        .map(LowStockEntry::from)
        .collect();
    entries.sort_by(|a, b| a.quantity.cmp(&b.quantity).then_with(|| a.sku.cmp(&b.sku)));
    entries
}
