use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use wareflow_catalog::{Brand, ContactInfo, Customer, Dimensions, NewProduct, Product, ProductId};
use wareflow_core::UserId;
use wareflow_engine::{
    CreateOrder, Engine, EngineConfig, NoopAuditSink, RegisterCustomer, RegisterProduct,
    RequestedLine, Stores,
};
use wareflow_inventory::{
    Lot, LotId, LotStatus, Movement, MovementContext, MovementType, NewLot, fefo_lots, first_fit,
};

fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 7, 0, 0).unwrap()
}

/// `count` lots of one product with scattered expiry dates and sizes, each
/// paired with its opening movement.
fn scattered_lots(product: &Product, count: usize, scale: i64) -> Vec<(Lot, Movement)> {
    let today = at().date_naive();
    (0..count)
        .map(|i| {
            let expiry: Option<NaiveDate> =
                (i % 7 != 0).then(|| today + Duration::days(((i * 37) % 365) as i64 + 1));
            Lot::open(
                LotId::generate(),
                NewLot {
                    product_id: product.id,
                    lot_number: format!("L-{i:05}"),
                    expiration_date: expiry,
                    location: "R-01".into(),
                    status: LotStatus::Available,
                },
                (((i * 13) % 50) as i64 + 1) * scale,
                MovementType::In,
                MovementContext::new(UserId::new(), at()),
            )
            .unwrap()
        })
        .collect()
}

fn product() -> Product {
    Product::register(ProductId::generate(), new_product("BENCH-1"), at()).unwrap()
}

fn new_product(sku: &str) -> NewProduct {
    NewProduct {
        sku: sku.into(),
        name: "Frijoles refritos 430g".into(),
        brand: Brand::new("la costena").unwrap(),
        category: "enlatados".into(),
        barcode: None,
        dimensions: Dimensions::new(10.0, 10.0, 12.0).unwrap(),
        weight_kg: 0.45,
        is_fragile: false,
        unit_price: 2_900,
    }
}

fn bench_fefo_ordering(c: &mut Criterion) {
    let mut group = c.benchmark_group("fefo_ordering");
    let product = product();

    for lot_count in [10usize, 100, 1_000] {
        let lots: Vec<Lot> = scattered_lots(&product, lot_count, 1)
            .into_iter()
            .map(|(lot, _)| lot)
            .collect();
        group.throughput(Throughput::Elements(lot_count as u64));
        group.bench_with_input(
            BenchmarkId::new("sort_allocatable", lot_count),
            &lots,
            |b, lots| b.iter(|| fefo_lots(black_box(lots.clone()))),
        );

        let ordered = fefo_lots(lots);
        group.bench_with_input(
            BenchmarkId::new("first_fit", lot_count),
            &ordered,
            |b, ordered| b.iter(|| first_fit(black_box(ordered), black_box(45))),
        );
    }

    group.finish();
}

fn seeded_engine(lot_count: usize) -> (Engine, Customer, Product) {
    let engine = Engine::new(
        Stores::in_memory(),
        Arc::new(NoopAuditSink),
        EngineConfig::default(),
    );
    let actor = UserId::new();
    let product = engine
        .register_product(RegisterProduct {
            product: new_product("BENCH-2"),
            actor,
            occurred_at: at(),
        })
        .unwrap();
    let customer = engine
        .register_customer(RegisterCustomer {
            name: "Bench Retail".into(),
            tax_id: "BEN-000101".into(),
            address: "Calle 5".into(),
            contact: ContactInfo::default(),
            credit_limit: u64::MAX,
            actor,
            occurred_at: at(),
        })
        .unwrap();
    for (lot, opening) in scattered_lots(&product, lot_count, 100_000) {
        engine.stores().inventory.insert_lot(lot, opening).unwrap();
    }
    (engine, customer, product)
}

fn bench_order_reservation(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_reservation");
    group.sample_size(200);

    for lot_count in [10usize, 200] {
        let (engine, customer, product) = seeded_engine(lot_count);
        group.bench_with_input(
            BenchmarkId::new("create_order_single_line", lot_count),
            &lot_count,
            |b, _| {
                b.iter(|| {
                    engine
                        .create_order(CreateOrder {
                            customer_id: customer.id,
                            lines: vec![RequestedLine {
                                product_id: product.id,
                                quantity: 3,
                            }],
                            actor: UserId::new(),
                            occurred_at: at(),
                        })
                        .unwrap()
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_fefo_ordering, bench_order_reservation);
criterion_main!(benches);
