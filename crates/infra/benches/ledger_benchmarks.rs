use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::collections::HashMap;

use storeledger_auth::Requester;
use storeledger_core::{CustomerId, Decimal, ProductId, StoreId, UserId};
use storeledger_infra::workflows::inventory::AddInventory;
use storeledger_infra::workflows::orders::CreateOrder;
use storeledger_infra::{InMemoryStore, LedgerConfig, RetailService};
use storeledger_inventory::{InventoryKey, InventoryRecord, StockDelta, decrement, increment};
use storeledger_parties::{ContactInfo, Customer};
use storeledger_products::Product;
use storeledger_sales::{CartLine, OrderMode};

struct Setup {
    service: RetailService<InMemoryStore>,
    store_id: StoreId,
    customer_id: CustomerId,
    products: Vec<ProductId>,
}

fn setup(product_count: usize, stock: i64) -> Setup {
    let store = InMemoryStore::new();
    let products: Vec<ProductId> = (0..product_count).map(|_| ProductId::new()).collect();
    for (i, id) in products.iter().enumerate() {
        let product = Product::new(*id, format!("Product {i}"), Decimal::new(999, 2), Decimal::new(3, 1))
            .expect("valid product");
        store.insert_product(product).expect("insert product");
    }
    let customer_id = CustomerId::new();
    store
        .insert_customer(Customer::new(customer_id, None, "Walk-in", ContactInfo::default()).expect("valid customer"))
        .expect("insert customer");

    let service = RetailService::new(store, LedgerConfig::default());
    let store_id = StoreId::new();
    let admin = Requester::internal(UserId::new(), 9);
    for id in &products {
        service
            .add_inventory(
                admin,
                AddInventory {
                    store_id,
                    product_id: *id,
                    quantity: stock,
                    max_discount_amount: None,
                },
            )
            .expect("stock product");
    }

    Setup {
        service,
        store_id,
        customer_id,
        products,
    }
}

fn bench_order_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_lifecycle");

    for line_count in [1usize, 10, 50].iter() {
        group.throughput(Throughput::Elements(*line_count as u64));
        group.bench_with_input(
            BenchmarkId::new("create_then_cancel", line_count),
            line_count,
            |b, &line_count| {
                let s = setup(line_count, 1_000_000);
                let admin = Requester::internal(UserId::new(), 9);
                let lines: Vec<CartLine> = s
                    .products
                    .iter()
                    .map(|id| CartLine::new(*id, 2, Decimal::new(1, 1)))
                    .collect();
                b.iter(|| {
                    let order = s
                        .service
                        .create_order(
                            admin,
                            CreateOrder {
                                store_id: s.store_id,
                                customer_id: s.customer_id,
                                mode: OrderMode::Offline,
                                delivery_address: None,
                                lines: lines.clone(),
                            },
                        )
                        .expect("order placed");
                    black_box(
                        s.service
                            .cancel_order(admin, order.id_typed())
                            .expect("order cancelled"),
                    );
                });
            },
        );
    }

    group.finish();
}

fn bench_primitives(c: &mut Criterion) {
    let mut group = c.benchmark_group("inventory_primitives");

    for width in [1usize, 10, 100].iter() {
        let store_id = StoreId::new();
        let delta: StockDelta = (0..*width).map(|_| (ProductId::new(), 1)).collect();
        let seed: StockDelta = delta.keys().map(|p| (*p, i64::MAX / 2)).collect();
        let mut rows: HashMap<InventoryKey, InventoryRecord> = HashMap::new();
        increment(&mut rows, store_id, &seed).expect("seed rows");

        group.throughput(Throughput::Elements(*width as u64));
        group.bench_with_input(BenchmarkId::new("decrement", width), &delta, |b, delta| {
            b.iter(|| black_box(decrement(&mut rows, store_id, delta).expect("sufficient stock")));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_order_lifecycle, bench_primitives);
criterion_main!(benches);
