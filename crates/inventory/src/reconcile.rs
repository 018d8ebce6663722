//! Audit reconciliation between item quantities and the transaction log.
//!
//! For every item the log must explain the whole distance from the opening
//! quantity to the current one: `opening + Σ quantity_change == quantity`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use stockledger_core::{Quantity, Sku};

use crate::item::Item;
use crate::transaction::TransactionRecord;

/// An item whose quantity the log does not explain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub sku: Sku,
    pub opening: Quantity,
    pub logged_change: Quantity,
    pub expected: Quantity,
    pub actual: Quantity,
}

/// Compare every catalog item against the net change the log records for it.
///
/// Records of deleted items are ignored: their history stays in the log but
/// there is no quantity left to check it against.
pub fn reconcile<'a>(
    items: impl IntoIterator<Item = &'a Item>,
    records: impl IntoIterator<Item = &'a TransactionRecord>,
) -> Vec<Discrepancy> {
    let mut net: HashMap<&Sku, Quantity> = HashMap::new();
    for record in records {
        *net.entry(&record.sku).or_default() += record.quantity_change;
    }

    let mut out = Vec::new();
    for item in items {
        let logged_change = net.get(&item.sku).copied().unwrap_or_default();
        let expected = item.opening_quantity + logged_change;
        if expected != item.quantity {
            out.push(Discrepancy {
                sku: item.sku.clone(),
                opening: item.opening_quantity,
                logged_change,
                expected,
                actual: item.quantity,
            });
        }
    }
    out.sort_by(|a, b| a.sku.cmp(&b.sku));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::NewItem;
    use crate::transaction::{MovementKind, PendingTransaction};
    use crate::unit::UnitOfMeasure;
    use chrono::Utc;
    use stockledger_core::{Actor, RefCode, TransactionId};

    fn item(code: &str, opening: i64, current: i64) -> Item {
        let mut item = NewItem::new(code, UnitOfMeasure::Piece)
            .with_opening_quantity(opening)
            .into_item(Sku::parse(code).unwrap(), Quantity::from(5), Utc::now())
            .unwrap();
        item.quantity = Quantity::from(current);
        item
    }

    fn record(seq: u64, code: &str, change: i64) -> TransactionRecord {
        PendingTransaction {
            id: TransactionId::new(),
            ref_code: RefCode::parse("DO-1").unwrap(),
            sku: Sku::parse(code).unwrap(),
            kind: if change < 0 { MovementKind::Out } else { MovementKind::In },
            quantity_change: Quantity::from(change),
            user: Actor::parse("alice").unwrap(),
            reason: String::new(),
            occurred_at: Utc::now(),
        }
        .into_record(seq)
    }

    #[test]
    fn consistent_state_has_no_discrepancies() {
        let items = vec![item("SCREW", 100, 58), item("LEG", 10, 8)];
        let log = vec![
            record(1, "SCREW", -30),
            record(2, "LEG", 10),
            record(3, "SCREW", -12),
            record(4, "LEG", -12),
        ];
        assert!(reconcile(&items, &log).is_empty());
    }

    #[test]
    fn unexplained_quantity_is_reported() {
        let items = vec![item("SCREW", 100, 60)];
        let log = vec![record(1, "SCREW", -30)];
        let found = reconcile(&items, &log);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].expected, Quantity::from(70));
        assert_eq!(found[0].actual, Quantity::from(60));
    }

    #[test]
    fn history_of_deleted_items_is_ignored() {
        let items = vec![item("SCREW", 10, 10)];
        assert!(reconcile(&items, &[record(1, "GONE", 5)]).is_empty());
    }
}
