use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use stockledger_core::{Actor, ProductId, Quantity, Sku};
use stockledger_infra::{InMemoryInventoryStore, LedgerConfig, StockServices};
use stockledger_inventory::{MovementLine, NewItem, RecipeLine, UnitOfMeasure};

/// Enough stock that no benchmark iteration count can exhaust it.
const PLENTY: i64 = 1_000_000_000_000;

fn setup(components: usize) -> (StockServices<InMemoryInventoryStore>, Vec<Sku>) {
    let config = LedgerConfig::default();
    let store = Arc::new(InMemoryInventoryStore::new(config.sku_format.clone()));
    let services = StockServices::new(store, &config);

    let skus = (0..components)
        .map(|i| {
            services
                .catalog
                .create_item(
                    NewItem::new(format!("Component {i}"), UnitOfMeasure::Piece)
                        .with_opening_quantity(PLENTY),
                )
                .unwrap()
                .sku
        })
        .collect();
    (services, skus)
}

fn bench_single_movement_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_movement_latency");
    let user = Actor::parse("bench").unwrap();

    group.bench_function("receive", |b| {
        let (services, skus) = setup(1);
        b.iter(|| {
            services
                .ledger
                .receive(&skus[0], black_box(Quantity::from(1)), &user, "")
                .unwrap()
        });
    });

    group.bench_function("issue", |b| {
        let (services, skus) = setup(1);
        b.iter(|| {
            services
                .ledger
                .issue(&skus[0], black_box(Quantity::from(1)), &user, "")
                .unwrap()
        });
    });

    group.finish();
}

fn bench_assembled_issue(c: &mut Criterion) {
    let mut group = c.benchmark_group("assembled_issue");
    let user = Actor::parse("bench").unwrap();

    for components in [1usize, 10, 100] {
        group.throughput(Throughput::Elements(components as u64));
        group.bench_with_input(
            BenchmarkId::new("components", components),
            &components,
            |b, &n| {
                let (services, skus) = setup(n);
                let product = ProductId::parse("Assembly").unwrap();
                services
                    .recipes
                    .define_recipe(
                        product.clone(),
                        skus.iter().map(|sku| RecipeLine::new(sku.clone(), 2)).collect(),
                    )
                    .unwrap();

                b.iter(|| {
                    services
                        .ledger
                        .issue_assembled(&product, black_box(Quantity::from(1)), &user, "")
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

fn bench_batch_issue(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_issue");
    let user = Actor::parse("bench").unwrap();

    for lines in [1usize, 10, 100] {
        group.throughput(Throughput::Elements(lines as u64));
        group.bench_with_input(BenchmarkId::new("lines", lines), &lines, |b, &n| {
            let (services, skus) = setup(n);
            b.iter(|| {
                let batch = skus
                    .iter()
                    .map(|sku| MovementLine::new(sku.clone(), 1))
                    .collect();
                services.ledger.issue_batch(batch, &user, "").unwrap()
            });
        });
    }

    group.finish();
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");
    let user = Actor::parse("bench").unwrap();

    for records in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(records as u64));
        group.bench_with_input(BenchmarkId::new("records", records), &records, |b, &n| {
            let (services, skus) = setup(10);
            for i in 0..n {
                services
                    .ledger
                    .receive(&skus[i % skus.len()], Quantity::from(1), &user, "")
                    .unwrap();
            }
            b.iter(|| black_box(services.history.reconcile().unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_single_movement_latency,
    bench_assembled_issue,
    bench_batch_issue,
    bench_reconcile
);
criterion_main!(benches);
