//! Stock movement planning (the check phase of every ledger call).
//!
//! Planning is pure: given a request and a snapshot of the items it touches, it
//! either rejects the whole request or produces the complete set of quantity
//! changes and log records to commit. Nothing is applied here, so a rejected
//! request can never leave partial effects behind.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{
    Actor, DomainError, DomainResult, ExpectedVersion, Quantity, RefCode, Sku, TransactionId,
};

use crate::item::Item;
use crate::transaction::{MovementKind, PendingTransaction};

/// One requested line: a positive magnitude against one SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementLine {
    pub sku: Sku,
    pub quantity: Quantity,
}

impl MovementLine {
    pub fn new(sku: Sku, quantity: impl Into<Quantity>) -> Self {
        Self {
            sku,
            quantity: quantity.into(),
        }
    }
}

/// A requested movement, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRequest {
    pub kind: MovementKind,
    pub lines: Vec<MovementLine>,
    pub user: Actor,
    pub reason: String,
}

impl MovementRequest {
    pub fn new(
        kind: MovementKind,
        lines: Vec<MovementLine>,
        user: Actor,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            lines,
            user,
            reason: reason.into(),
        }
    }

    /// Distinct SKUs touched, sorted (the lock order for row-locking stores).
    pub fn skus(&self) -> Vec<Sku> {
        let mut skus: Vec<Sku> = self.lines.iter().map(|l| l.sku.clone()).collect();
        skus.sort();
        skus.dedup();
        skus
    }
}

/// Conditional quantity update for one item: apply only if the item is still at
/// the version it was planned against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemChange {
    pub sku: Sku,
    pub expected: ExpectedVersion,
    pub new_quantity: Quantity,
}

/// A validated movement: everything a store commits in one atomic unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub ref_code: RefCode,
    pub kind: MovementKind,
    pub occurred_at: DateTime<Utc>,
    pub changes: Vec<ItemChange>,
    pub records: Vec<PendingTransaction>,
}

impl StockMovement {
    /// Validate `request` against `items` and build the movement.
    ///
    /// Every line is checked for existence, positive magnitude, and unit precision
    /// first; sufficiency is then checked per SKU against the summed demand, so a
    /// batch naming one SKU twice cannot overdraw it. The first failure (in line
    /// order) is returned and nothing is produced.
    pub fn plan(
        request: &MovementRequest,
        ref_code: RefCode,
        items: &BTreeMap<Sku, Item>,
        at: DateTime<Utc>,
    ) -> DomainResult<StockMovement> {
        if request.lines.is_empty() {
            return Err(DomainError::validation("movement must contain at least one line"));
        }

        // SKU -> summed magnitude, kept in first-appearance order.
        let mut totals: Vec<(&Sku, Quantity)> = Vec::new();
        for line in &request.lines {
            line.quantity.ensure_positive(line.sku.as_str())?;
            let item = items
                .get(&line.sku)
                .ok_or_else(|| DomainError::UnknownSku(line.sku.clone()))?;
            item.unit.ensure_precision(line.sku.as_str(), line.quantity)?;

            match totals.iter_mut().find(|(sku, _)| **sku == line.sku) {
                Some((_, total)) => {
                    *total = total.checked_add(line.quantity).ok_or_else(|| {
                        DomainError::malformed(line.sku.as_str(), "summed quantity overflows")
                    })?;
                }
                None => totals.push((&line.sku, line.quantity)),
            }
        }

        let mut changes = Vec::with_capacity(totals.len());
        for (sku, total) in totals {
            // Presence was checked above.
            let Some(item) = items.get(sku) else {
                return Err(DomainError::UnknownSku(sku.clone()));
            };
            let new_quantity = item
                .quantity
                .checked_add(request.kind.signed(total))
                .ok_or_else(|| {
                    DomainError::malformed(sku.as_str(), "resulting quantity overflows")
                })?;
            if new_quantity.is_negative() {
                return Err(DomainError::insufficient(sku.clone(), total, item.quantity));
            }
            changes.push(ItemChange {
                sku: sku.clone(),
                expected: ExpectedVersion::of(item),
                new_quantity,
            });
        }

        let reason = request.reason.trim().to_string();
        let records = request
            .lines
            .iter()
            .map(|line| PendingTransaction {
                id: TransactionId::new(),
                ref_code: ref_code.clone(),
                sku: line.sku.clone(),
                kind: request.kind,
                quantity_change: request.kind.signed(line.quantity),
                user: request.user.clone(),
                reason: reason.clone(),
                occurred_at: at,
            })
            .collect();

        Ok(StockMovement {
            ref_code,
            kind: request.kind,
            occurred_at: at,
            changes,
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::NewItem;
    use crate::unit::UnitOfMeasure;
    use proptest::prelude::*;

    fn sku(s: &str) -> Sku {
        Sku::parse(s).unwrap()
    }

    fn user() -> Actor {
        Actor::parse("storekeeper").unwrap()
    }

    fn item(code: &str, qty: i64, unit: UnitOfMeasure) -> Item {
        NewItem::new(code, unit)
            .with_opening_quantity(qty)
            .into_item(sku(code), Quantity::from(5), Utc::now())
            .unwrap()
    }

    fn catalog(items: Vec<Item>) -> BTreeMap<Sku, Item> {
        items.into_iter().map(|i| (i.sku.clone(), i)).collect()
    }

    fn plan(
        kind: MovementKind,
        lines: Vec<MovementLine>,
        items: &BTreeMap<Sku, Item>,
    ) -> DomainResult<StockMovement> {
        let request = MovementRequest::new(kind, lines, user(), "test");
        StockMovement::plan(&request, kind.new_ref_code(Utc::now()), items, Utc::now())
    }

    #[test]
    fn issue_produces_negative_record_and_new_quantity() {
        let items = catalog(vec![item("SCREW", 100, UnitOfMeasure::Piece)]);
        let lines = vec![MovementLine::new(sku("SCREW"), 30)];
        let movement = plan(MovementKind::Out, lines, &items).unwrap();

        assert_eq!(movement.changes.len(), 1);
        assert_eq!(movement.changes[0].new_quantity, Quantity::from(70));
        assert_eq!(movement.changes[0].expected, ExpectedVersion::Exact(1));
        assert_eq!(movement.records.len(), 1);
        assert_eq!(movement.records[0].quantity_change, Quantity::from(-30));
        assert_eq!(movement.records[0].kind, MovementKind::Out);
    }

    #[test]
    fn issuing_exactly_on_hand_succeeds() {
        let items = catalog(vec![item("LEG", 12, UnitOfMeasure::Piece)]);
        let lines = vec![MovementLine::new(sku("LEG"), 12)];
        let movement = plan(MovementKind::OutBom, lines, &items).unwrap();
        assert_eq!(movement.changes[0].new_quantity, Quantity::ZERO);
    }

    #[test]
    fn shortfall_names_the_component() {
        let items = catalog(vec![
            item("SCREW", 70, UnitOfMeasure::Piece),
            item("LEG", 10, UnitOfMeasure::Piece),
        ]);
        let err = plan(
            MovementKind::OutBom,
            vec![MovementLine::new(sku("SCREW"), 12), MovementLine::new(sku("LEG"), 12)],
            &items,
        )
        .unwrap_err();

        assert_eq!(
            err,
            DomainError::insufficient(sku("LEG"), Quantity::from(12), Quantity::from(10))
        );
    }

    #[test]
    fn duplicate_lines_are_summed_for_sufficiency() {
        let items = catalog(vec![item("BOLT", 10, UnitOfMeasure::Piece)]);
        let err = plan(
            MovementKind::Out,
            vec![MovementLine::new(sku("BOLT"), 6), MovementLine::new(sku("BOLT"), 6)],
            &items,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));

        let movement = plan(
            MovementKind::Out,
            vec![MovementLine::new(sku("BOLT"), 4), MovementLine::new(sku("BOLT"), 6)],
            &items,
        )
        .unwrap();
        assert_eq!(movement.changes.len(), 1);
        assert_eq!(movement.changes[0].new_quantity, Quantity::ZERO);
        assert_eq!(movement.records.len(), 2);
    }

    #[test]
    fn unknown_sku_and_bad_quantities_are_rejected() {
        let items = catalog(vec![item("GLUE", 10, UnitOfMeasure::Gram)]);
        assert_eq!(
            plan(MovementKind::Out, vec![MovementLine::new(sku("NOPE"), 1)], &items).unwrap_err(),
            DomainError::UnknownSku(sku("NOPE"))
        );
        assert!(matches!(
            plan(MovementKind::In, vec![MovementLine::new(sku("GLUE"), 0)], &items),
            Err(DomainError::MalformedQuantity { .. })
        ));
        assert!(matches!(
            plan(MovementKind::Out, vec![], &items),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn fractional_demand_on_integral_unit_is_not_coerced() {
        let items = catalog(vec![item("SCREW", 10, UnitOfMeasure::Piece)]);
        let half: Quantity = "1.5".parse().unwrap();
        let lines = vec![MovementLine::new(sku("SCREW"), half)];
        let err = plan(MovementKind::Out, lines, &items).unwrap_err();
        assert!(matches!(err, DomainError::MalformedQuantity { .. }));

        let items = catalog(vec![item("GLUE", 10, UnitOfMeasure::Gram)]);
        let lines = vec![MovementLine::new(sku("GLUE"), half)];
        let movement = plan(MovementKind::Out, lines, &items).unwrap();
        assert_eq!(movement.changes[0].new_quantity, "8.5".parse::<Quantity>().unwrap());
    }

    #[test]
    fn all_records_share_the_reference_code() {
        let items = catalog(vec![
            item("A", 5, UnitOfMeasure::Piece),
            item("B", 5, UnitOfMeasure::Piece),
        ]);
        let movement = plan(
            MovementKind::Out,
            vec![MovementLine::new(sku("A"), 1), MovementLine::new(sku("B"), 2)],
            &items,
        )
        .unwrap();
        assert!(movement.records.iter().all(|r| r.ref_code == movement.ref_code));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: a planned outgoing movement never drives a quantity negative,
        /// and a rejected one is rejected only for insufficient stock.
        #[test]
        fn planned_quantities_never_negative(
            on_hand in 0i64..500,
            demands in prop::collection::vec(1i64..200, 1..6)
        ) {
            let items = catalog(vec![item("X", on_hand, UnitOfMeasure::Piece)]);
            let lines = demands.iter().map(|d| MovementLine::new(sku("X"), *d)).collect();
            let total: i64 = demands.iter().sum();

            match plan(MovementKind::Out, lines, &items) {
                Ok(movement) => {
                    prop_assert!(total <= on_hand);
                    prop_assert_eq!(
                        movement.changes[0].new_quantity,
                        Quantity::from(on_hand - total)
                    );
                    let logged: Quantity = movement.records.iter().map(|r| r.quantity_change).sum();
                    prop_assert_eq!(logged, Quantity::from(-total));
                }
                Err(DomainError::InsufficientStock { shortfall, .. }) => {
                    prop_assert!(total > on_hand);
                    prop_assert_eq!(shortfall, Quantity::from(total - on_hand));
                }
                Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
            }
        }
    }
}
