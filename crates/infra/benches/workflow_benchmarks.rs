use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use chrono::Utc;
use orderflow_auth::{ActingUser, Role};
use orderflow_core::{CustomerId, TenantId, UserId};
use orderflow_infra::{InMemoryStore, StoreError, WorkflowService, WorkflowStore};
use orderflow_products::ProductId;
use orderflow_sales::{
    NewOrderItem, NewSalesOrder, OrderAction, SaleStatus, SalesOrder, SalesOrderId,
    compute_permissions,
};

fn order(tenant_id: TenantId, id: i64, status: SaleStatus, lines: usize) -> SalesOrder {
    SalesOrder::import_legacy(
        NewSalesOrder {
            id: SalesOrderId::new(id),
            tenant_id,
            number: format!("SO-BENCH-{id}"),
            owner_id: UserId::new(1),
            customer_id: CustomerId::new(1),
            quotation_id: None,
            items: (0..lines)
                .map(|n| NewOrderItem {
                    product_id: ProductId::new(n as i64 + 1),
                    description: format!("item {n}"),
                    quantity: 2,
                    unit_price: 100,
                })
                .collect(),
            created_at: Utc::now(),
        },
        status,
        None,
    )
}

fn seeded_service(orders: usize) -> (WorkflowService<InMemoryStore>, TenantId) {
    let service = WorkflowService::new(InMemoryStore::new(), "01");
    let tenant = TenantId::new();
    service
        .store()
        .transact::<_, StoreError, _>(|tx| {
            for id in 1..=orders as i64 {
                tx.insert(order(tenant, id, SaleStatus::New, 5))?;
            }
            Ok(())
        })
        .unwrap();
    (service, tenant)
}

/// Pure permission computation across every status and role.
fn bench_compute_permissions(c: &mut Criterion) {
    let tenant = TenantId::new();
    let orders: Vec<SalesOrder> = SaleStatus::ALL
        .iter()
        .enumerate()
        .map(|(n, status)| order(tenant, n as i64 + 1, *status, 5))
        .collect();
    let users: Vec<ActingUser> = Role::ALL
        .iter()
        .enumerate()
        .map(|(n, role)| ActingUser::new(UserId::new(n as i64 + 1), *role))
        .collect();

    c.bench_function("compute_permissions_matrix", |b| {
        b.iter(|| {
            for order in &orders {
                for user in &users {
                    black_box(compute_permissions(black_box(order), Some(user)));
                }
            }
        })
    });
}

/// Guarded read + transition + commit, with the store holding N orders.
fn bench_perform_action(c: &mut Criterion) {
    let mut group = c.benchmark_group("perform_action_roundtrip");
    let owner = ActingUser::new(UserId::new(1), Role::Sales);
    let manager = ActingUser::new(UserId::new(2), Role::ManagerSales);

    for size in [10usize, 100, 1_000] {
        let (service, tenant) = seeded_service(size);
        let order_id = SalesOrderId::new(1);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                service
                    .perform_action(tenant, order_id, Some(&owner), OrderAction::UpdateStatusPr, None)
                    .unwrap();
                service
                    .perform_action(tenant, order_id, Some(&manager), OrderAction::ReopenToNew, None)
                    .unwrap();
            })
        });
    }
    group.finish();
}

fn bench_list_visible_orders(c: &mut Criterion) {
    let (service, tenant) = seeded_service(1_000);
    let stranger = ActingUser::new(UserId::new(77), Role::Sales);
    let warehouse = ActingUser::new(UserId::new(78), Role::Warehouse);

    let mut group = c.benchmark_group("list_sales_orders");
    group.bench_function("filtered_out", |b| {
        b.iter(|| black_box(service.list_sales_orders(tenant, Some(&stranger)).unwrap()))
    });
    group.bench_function("all_visible", |b| {
        b.iter(|| black_box(service.list_sales_orders(tenant, Some(&warehouse)).unwrap()))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_compute_permissions,
    bench_perform_action,
    bench_list_visible_orders
);
criterion_main!(benches);
