use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{AggregateRoot, DomainError, DomainResult, Quantity, Sku};

use crate::unit::UnitOfMeasure;

/// Aggregate root: a stocked catalog item.
///
/// `quantity` is only ever changed by committed stock movements; `opening_quantity`
/// is the baseline the transaction log is reconciled against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub sku: Sku,
    pub name: String,
    pub quantity: Quantity,
    pub opening_quantity: Quantity,
    pub unit: UnitOfMeasure,
    pub min_stock: Quantity,
    pub price: Decimal,
    pub supplier: Option<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Item {
    /// At or below the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_stock
    }

    /// Case-insensitive substring match on name or SKU.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        needle.is_empty()
            || self.name.to_lowercase().contains(&needle)
            || self.sku.as_str().to_lowercase().contains(&needle)
    }

    /// Apply a catalog update, producing the replacement record.
    ///
    /// Never touches `quantity`; name uniqueness is the store's concern.
    pub fn patched(&self, patch: &ItemPatch, at: DateTime<Utc>) -> DomainResult<Item> {
        let mut next = self.clone();

        if let Some(name) = &patch.name {
            next.name = normalize_name(name)?;
        }
        if let Some(unit) = patch.unit {
            unit.ensure_precision(self.sku.as_str(), self.quantity)?;
            unit.ensure_precision(self.sku.as_str(), self.opening_quantity)?;
            next.unit = unit;
        }
        if let Some(min_stock) = patch.min_stock {
            next.min_stock = ensure_threshold(self.sku.as_str(), min_stock)?;
        }
        if let Some(price) = patch.price {
            next.price = ensure_price(price)?;
        }
        if let Some(supplier) = &patch.supplier {
            next.supplier = normalize_supplier(supplier.as_deref());
        }

        next.last_updated = at;
        Ok(next)
    }
}

impl AggregateRoot for Item {
    type Id = Sku;

    fn id(&self) -> &Self::Id {
        &self.sku
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: create a catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    /// Caller-assigned SKU; `None` lets the store allocate the next sequential one.
    pub sku: Option<Sku>,
    pub name: String,
    pub unit: UnitOfMeasure,
    /// Reorder threshold; `None` falls back to the configured default.
    pub min_stock: Option<Quantity>,
    pub price: Decimal,
    pub supplier: Option<String>,
    pub opening_quantity: Quantity,
}

impl NewItem {
    pub fn new(name: impl Into<String>, unit: UnitOfMeasure) -> Self {
        Self {
            sku: None,
            name: name.into(),
            unit,
            min_stock: None,
            price: Decimal::ZERO,
            supplier: None,
            opening_quantity: Quantity::ZERO,
        }
    }

    pub fn with_sku(mut self, sku: Sku) -> Self {
        self.sku = Some(sku);
        self
    }

    pub fn with_opening_quantity(mut self, quantity: impl Into<Quantity>) -> Self {
        self.opening_quantity = quantity.into();
        self
    }

    pub fn with_min_stock(mut self, min_stock: impl Into<Quantity>) -> Self {
        self.min_stock = Some(min_stock.into());
        self
    }

    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = price;
        self
    }

    pub fn with_supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = Some(supplier.into());
        self
    }

    /// Validate and materialize the item under its final SKU.
    pub fn into_item(
        self,
        sku: Sku,
        default_min_stock: Quantity,
        at: DateTime<Utc>,
    ) -> DomainResult<Item> {
        let name = normalize_name(&self.name)?;

        if self.opening_quantity.is_negative() {
            return Err(DomainError::malformed(
                sku.as_str(),
                "opening quantity cannot be negative",
            ));
        }
        self.unit
            .ensure_precision(sku.as_str(), self.opening_quantity)?;

        let min_stock = ensure_threshold(
            sku.as_str(),
            self.min_stock.unwrap_or(default_min_stock),
        )?;

        Ok(Item {
            sku,
            name,
            quantity: self.opening_quantity,
            opening_quantity: self.opening_quantity,
            unit: self.unit,
            min_stock,
            price: ensure_price(self.price)?,
            supplier: normalize_supplier(self.supplier.as_deref()),
            version: 1,
            created_at: at,
            last_updated: at,
        })
    }
}

/// Command: update the descriptive fields of an item.
///
/// `supplier: Some(None)` clears the supplier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub unit: Option<UnitOfMeasure>,
    pub min_stock: Option<Quantity>,
    pub price: Option<Decimal>,
    pub supplier: Option<Option<String>>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.unit.is_none()
            && self.min_stock.is_none()
            && self.price.is_none()
            && self.supplier.is_none()
    }
}

fn normalize_name(name: &str) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn normalize_supplier(supplier: Option<&str>) -> Option<String> {
    supplier
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn ensure_threshold(subject: &str, min_stock: Quantity) -> DomainResult<Quantity> {
    if min_stock.is_negative() {
        return Err(DomainError::malformed(
            subject,
            "reorder threshold cannot be negative",
        ));
    }
    Ok(min_stock)
}

fn ensure_price(price: Decimal) -> DomainResult<Decimal> {
    if price < Decimal::ZERO {
        return Err(DomainError::validation("price cannot be negative"));
    }
    Ok(price)
}
