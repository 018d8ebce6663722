//! PostgreSQL store tests.
//!
//! Ignored by default; run with a disposable database:
//! `DATABASE_URL=postgres://... cargo test -p stockledger-infra -- --ignored`
//!
//! Every run uses its own SKU prefix and item names, so runs against the same
//! database do not collide.

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use stockledger_core::{Actor, DomainError, ProductId, Quantity};
use stockledger_infra::{
    LedgerConfig, LedgerError, PostgresInventoryStore, SkuFormat, StockServices,
};
use stockledger_inventory::{MovementKind, NewItem, RecipeLine, UnitOfMeasure};

struct Run {
    services: StockServices<PostgresInventoryStore>,
    tag: String,
}

async fn run() -> Run {
    stockledger_observability::init_for_tests();

    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for postgres tests");
    let pool = PgPool::connect(&url).await.expect("connect");

    let simple = Uuid::now_v7().simple().to_string();
    let tag = simple[simple.len() - 8..].to_uppercase();
    let config = LedgerConfig {
        sku_format: SkuFormat {
            prefix: format!("T{tag}-"),
            start: 1,
            width: 4,
        },
        ..LedgerConfig::default()
    };

    let store = PostgresInventoryStore::new(pool, config.sku_format.clone());
    store.migrate().await.expect("migrate");
    // Twice: the schema script must be re-runnable.
    store.migrate().await.expect("migrate again");

    Run {
        services: StockServices::new(Arc::new(store), &config),
        tag,
    }
}

impl Run {
    fn name(&self, base: &str) -> String {
        format!("{base} {}", self.tag)
    }
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires DATABASE_URL"]
async fn allocates_skus_and_enforces_unique_names() {
    let run = run().await;
    let catalog = &run.services.catalog;

    let first = catalog
        .create_item(
            NewItem::new(run.name("Screw"), UnitOfMeasure::Piece).with_opening_quantity(100),
        )
        .unwrap();
    let second = catalog
        .create_item(NewItem::new(run.name("Leg"), UnitOfMeasure::Piece))
        .unwrap();
    assert_eq!(first.sku.as_str(), format!("T{}-0001", run.tag));
    assert_eq!(second.sku.as_str(), format!("T{}-0002", run.tag));

    let err = catalog
        .create_item(NewItem::new(run.name("Screw"), UnitOfMeasure::Piece))
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Domain(DomainError::DuplicateKey { field: "name", .. })
    ));

    assert_eq!(catalog.get_item(&first.sku).unwrap(), first);
    assert_eq!(catalog.find_items(&run.tag).unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires DATABASE_URL"]
async fn assembled_issue_is_all_or_nothing() {
    let run = run().await;
    let s = &run.services;
    let user = Actor::parse("pg-test").unwrap();

    let screw = s
        .catalog
        .create_item(
            NewItem::new(run.name("Screw"), UnitOfMeasure::Piece).with_opening_quantity(70),
        )
        .unwrap()
        .sku;
    let leg = s
        .catalog
        .create_item(NewItem::new(run.name("Leg"), UnitOfMeasure::Piece).with_opening_quantity(10))
        .unwrap()
        .sku;
    let chair = ProductId::parse(run.name("Chair")).unwrap();
    s.recipes
        .define_recipe(
            chair.clone(),
            vec![RecipeLine::new(screw.clone(), 4), RecipeLine::new(leg.clone(), 4)],
        )
        .unwrap();

    let err = s
        .ledger
        .issue_assembled(&chair, Quantity::from(3), &user, "")
        .unwrap_err();
    assert!(matches!(
        err.as_domain(),
        Some(DomainError::InsufficientStock { sku, .. }) if *sku == leg
    ));
    assert_eq!(s.catalog.get_item(&screw).unwrap().quantity, Quantity::from(70));
    assert!(s.history.for_sku(&screw, None).unwrap().is_empty());

    s.ledger.receive(&leg, Quantity::from(10), &user, "").unwrap();
    let receipt = s
        .ledger
        .issue_assembled(&chair, Quantity::from(3), &user, "")
        .unwrap();
    assert_eq!(receipt.records.len(), 2);
    assert!(receipt.records.iter().all(|r| r.kind == MovementKind::OutBom));
    assert_eq!(s.catalog.get_item(&screw).unwrap().quantity, Quantity::from(58));
    assert_eq!(s.catalog.get_item(&leg).unwrap().quantity, Quantity::from(8));
    assert_eq!(s.history.for_ref(&receipt.ref_code).unwrap().len(), 2);

    let err = s.catalog.delete_item(&leg).unwrap_err();
    assert!(matches!(err, LedgerError::Domain(DomainError::ItemInUse { .. })));
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_issues_serialize_on_row_locks() {
    let run = run().await;
    let screw = run
        .services
        .catalog
        .create_item(
            NewItem::new(run.name("Screw"), UnitOfMeasure::Piece).with_opening_quantity(58),
        )
        .unwrap()
        .sku;

    let tasks: Vec<_> = (0..2)
        .map(|i| {
            let ledger = run.services.ledger.clone();
            let screw = screw.clone();
            tokio::task::spawn_blocking(move || {
                let user = Actor::parse(format!("worker-{i}")).unwrap();
                ledger.issue(&screw, Quantity::from(50), &user, "race")
            })
        })
        .collect();

    let mut ok = 0;
    let mut short = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => ok += 1,
            Err(LedgerError::Domain(DomainError::InsufficientStock { .. })) => short += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!((ok, short), (1, 1));
    assert_eq!(
        run.services.catalog.get_item(&screw).unwrap().quantity,
        Quantity::from(8)
    );
}
