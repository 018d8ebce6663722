//! End-to-end scenarios over the full service stack.
//!
//! Catalog → RecipeRegistry → StockLedger → TransactionHistory / LowStockMonitor,
//! all sharing one in-memory store.
//!
//! Verifies:
//! - Direct and assembled issues update quantities and the log together
//! - Failed calls leave both untouched
//! - Concurrent issues against the same SKU never lose an update

use std::sync::{Arc, Barrier};
use std::thread;

use stockledger_core::{Actor, DomainError, ProductId, Quantity, Sku};
use stockledger_inventory::{MovementKind, NewItem, RecipeLine, TransactionFilter, UnitOfMeasure};

use crate::bootstrap::StockServices;
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::store::InMemoryInventoryStore;

struct Workshop {
    services: StockServices<InMemoryInventoryStore>,
    user: Actor,
    screw: Sku,
    leg: Sku,
    chair: ProductId,
}

impl Workshop {
    fn new() -> Self {
        stockledger_observability::init_for_tests();

        let config = LedgerConfig::default();
        let store = Arc::new(InMemoryInventoryStore::new(config.sku_format.clone()));
        let services = StockServices::new(store, &config);

        let screw = services
            .catalog
            .create_item(
                NewItem::new("Screw", UnitOfMeasure::Piece)
                    .with_opening_quantity(100)
                    .with_min_stock(20),
            )
            .unwrap()
            .sku;
        let leg = services
            .catalog
            .create_item(
                NewItem::new("Leg", UnitOfMeasure::Piece)
                    .with_opening_quantity(10)
                    .with_min_stock(10),
            )
            .unwrap()
            .sku;

        let chair = ProductId::parse("Chair").unwrap();
        services
            .recipes
            .define_recipe(
                chair.clone(),
                vec![RecipeLine::new(screw.clone(), 4), RecipeLine::new(leg.clone(), 4)],
            )
            .unwrap();

        Self {
            services,
            user: Actor::parse("warehouse").unwrap(),
            screw,
            leg,
            chair,
        }
    }

    fn on_hand(&self, sku: &Sku) -> Quantity {
        self.services.catalog.get_item(sku).unwrap().quantity
    }

    fn log(&self) -> Vec<stockledger_inventory::TransactionRecord> {
        self.services
            .history
            .query(&TransactionFilter::default())
            .unwrap()
    }

    /// Scenarios 1 to 4: leaves Screw at 58 and Leg at 8.
    fn run_to_assembled_issue(&self) {
        let ledger = &self.services.ledger;

        let receipt = ledger
            .issue(&self.screw, Quantity::from(30), &self.user, "order 1")
            .unwrap();
        assert_eq!(self.on_hand(&self.screw), Quantity::from(70));
        assert_eq!(receipt.records.len(), 1);
        assert_eq!(receipt.records[0].kind, MovementKind::Out);
        assert_eq!(receipt.records[0].quantity_change, Quantity::from(-30));

        let err = ledger
            .issue(&self.screw, Quantity::from(1000), &self.user, "order 2")
            .unwrap_err();
        assert_eq!(
            err.as_domain(),
            Some(&DomainError::insufficient(
                self.screw.clone(),
                Quantity::from(1000),
                Quantity::from(70)
            ))
        );
        assert_eq!(self.on_hand(&self.screw), Quantity::from(70));
        assert_eq!(self.log().len(), 1);

        let err = ledger
            .issue_assembled(&self.chair, Quantity::from(3), &self.user, "chairs")
            .unwrap_err();
        match err {
            LedgerError::Domain(DomainError::InsufficientStock { sku, shortfall, .. }) => {
                assert_eq!(sku, self.leg);
                assert_eq!(shortfall, Quantity::from(2));
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(self.on_hand(&self.screw), Quantity::from(70));
        assert_eq!(self.on_hand(&self.leg), Quantity::from(10));

        ledger
            .receive(&self.leg, Quantity::from(10), &self.user, "restock")
            .unwrap();
        let receipt = ledger
            .issue_assembled(&self.chair, Quantity::from(3), &self.user, "chairs")
            .unwrap();
        assert_eq!(self.on_hand(&self.screw), Quantity::from(58));
        assert_eq!(self.on_hand(&self.leg), Quantity::from(8));
        assert!(receipt.ref_code.as_str().starts_with("BOM-"));
        assert_eq!(receipt.records.len(), 2);
        assert!(receipt.records.iter().all(|r| r.kind == MovementKind::OutBom));
        assert!(receipt.records.iter().all(|r| r.ref_code == receipt.ref_code));
    }
}

#[test]
fn workshop_scenarios_keep_catalog_and_log_consistent() {
    let shop = Workshop::new();
    shop.run_to_assembled_issue();

    let flagged: Vec<Sku> = shop
        .services
        .low_stock
        .list_below_threshold()
        .unwrap()
        .into_iter()
        .map(|e| e.sku)
        .collect();
    assert_eq!(flagged, vec![shop.leg.clone()]);

    let screw_history = shop.services.history.for_sku(&shop.screw, None).unwrap();
    let net: Quantity = screw_history.iter().map(|r| r.quantity_change).sum();
    assert_eq!(net, Quantity::from(58 - 100));
    assert!(shop.services.history.reconcile().unwrap().is_empty());
}

#[test]
fn concurrent_issues_never_lose_an_update() {
    for _ in 0..20 {
        let shop = Workshop::new();
        shop.run_to_assembled_issue();

        let barrier = Arc::new(Barrier::new(2));
        let results: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let barrier = Arc::clone(&barrier);
                    let ledger = shop.services.ledger.clone();
                    let (screw, user) = (&shop.screw, &shop.user);
                    s.spawn(move || {
                        barrier.wait();
                        ledger.issue(screw, Quantity::from(50), user, "race")
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let (ok, failed): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
        assert_eq!(ok.len(), 1);
        assert_eq!(failed.len(), 1);
        let err = failed.into_iter().next().unwrap().unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(DomainError::InsufficientStock { .. })
        ));

        assert_eq!(shop.on_hand(&shop.screw), Quantity::from(8));
        assert!(shop.services.history.reconcile().unwrap().is_empty());
    }
}

#[test]
fn deleting_a_recipe_component_is_refused() {
    let shop = Workshop::new();

    let err = shop.services.catalog.delete_item(&shop.leg).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Domain(DomainError::ItemInUse { ref products, .. })
            if products == &vec![shop.chair.clone()]
    ));

    assert!(shop.services.recipes.remove_recipe(&shop.chair).unwrap());
    shop.services.catalog.delete_item(&shop.leg).unwrap();

    let err = shop
        .services
        .ledger
        .issue_assembled(&shop.chair, Quantity::from(1), &shop.user, "")
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Domain(DomainError::RecipeNotDefined(_))
    ));
}
