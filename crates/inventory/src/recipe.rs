//! Bills of materials.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, ProductId, Quantity, Sku};

use crate::movement::MovementLine;

/// One component entry: how much of `component` one assembled unit consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeLine {
    pub component: Sku,
    pub qty_per_unit: Quantity,
}

impl RecipeLine {
    pub fn new(component: Sku, qty_per_unit: impl Into<Quantity>) -> Self {
        Self {
            component,
            qty_per_unit: qty_per_unit.into(),
        }
    }
}

/// Full component set of an assembled product.
///
/// Always non-empty, with strictly positive per-unit quantities, unique components,
/// and no component equal to the product itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    product: ProductId,
    lines: Vec<RecipeLine>,
}

impl Recipe {
    /// Validate a definition. Component existence is checked by the store, inside
    /// the same atomic scope that replaces the previous definition.
    pub fn define(product: ProductId, lines: Vec<RecipeLine>) -> DomainResult<Recipe> {
        if lines.is_empty() {
            return Err(DomainError::validation(format!(
                "recipe for {product} must have at least one component"
            )));
        }

        let mut seen = HashSet::with_capacity(lines.len());
        for line in &lines {
            line.qty_per_unit.ensure_positive(line.component.as_str())?;
            if line.component.as_str() == product.as_str() {
                return Err(DomainError::validation(format!(
                    "recipe for {product} cannot use itself as a component"
                )));
            }
            if !seen.insert(&line.component) {
                return Err(DomainError::duplicate(
                    "recipe component",
                    line.component.as_str(),
                ));
            }
        }

        Ok(Recipe { product, lines })
    }

    pub fn product(&self) -> &ProductId {
        &self.product
    }

    pub fn lines(&self) -> &[RecipeLine] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<RecipeLine> {
        self.lines
    }

    pub fn uses(&self, sku: &Sku) -> bool {
        self.lines.iter().any(|l| l.component == *sku)
    }

    /// First component the predicate does not recognise.
    pub fn missing_component(&self, exists: impl Fn(&Sku) -> bool) -> Option<&Sku> {
        self.lines
            .iter()
            .map(|l| &l.component)
            .find(|sku| !exists(sku))
    }

    /// Single-level BOM explosion: total demand per component for `units`
    /// assembled units, in definition order.
    ///
    /// Components that have recipes of their own are not expanded further.
    pub fn explode(&self, units: Quantity) -> DomainResult<Vec<MovementLine>> {
        let units = units.ensure_positive(self.product.as_str())?;
        self.lines
            .iter()
            .map(|line| {
                let required = line.qty_per_unit.checked_mul(units).ok_or_else(|| {
                    DomainError::malformed(
                        line.component.as_str(),
                        format!("{} x {units} overflows", line.qty_per_unit),
                    )
                })?;
                Ok(MovementLine::new(line.component.clone(), required))
            })
            .collect()
    }
}
