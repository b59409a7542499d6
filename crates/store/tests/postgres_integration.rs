//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use serial_test::serial;
use sqlx::PgPool;
use store::{
    Customer, CustomerId, InventoryStore, InventoryStoreExt, Invoice, InvoiceId, InvoiceItem,
    InvoiceQuery, InvoiceStatus, ListQuery, Money, PageRequest, PostgresStore, Product, ProductId,
    StoreError, User,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresStore::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let store = PostgresStore::connect(&info.connection_string, 5)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE invoice_items, invoices, products, customers, users")
        .execute(store.pool())
        .await
        .unwrap();

    store
}

fn product(sku: &str, stock: i32) -> Product {
    let now = Utc::now();
    Product {
        id: ProductId::new(),
        name: format!("Product {sku}"),
        sku: sku.to_string(),
        description: Some("test product".to_string()),
        category: Some("Electronics".to_string()),
        price: Money::from_cents(1999),
        stock,
        min_stock: 5,
        image_url: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn customer(name: &str) -> Customer {
    let now = Utc::now();
    Customer {
        id: CustomerId::new(),
        name: name.to_string(),
        email: Some(format!("{}@example.com", name.to_lowercase())),
        phone: None,
        address: None,
        city: None,
        state: None,
        zip_code: None,
        country: None,
        created_at: now,
        updated_at: now,
    }
}

fn invoice(number: &str, customer_id: CustomerId, items: Vec<InvoiceItem>) -> Invoice {
    let now = Utc::now();
    let subtotal: Money = items.iter().map(|i| i.total).sum();
    let tax = subtotal.percentage(1_000);
    Invoice {
        id: InvoiceId::new(),
        invoice_number: number.to_string(),
        customer_id,
        user_id: "demo-user-1".to_string(),
        issue_date: now,
        due_date: Some(now + Duration::days(30)),
        subtotal,
        tax,
        total: subtotal + tax,
        status: InvoiceStatus::Pending,
        notes: None,
        items,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
#[serial]
async fn product_round_trip() {
    let store = get_test_store().await;
    let created = store.insert_product(product("WH001", 25)).await.unwrap();

    let fetched = store.require_product(created.id).await.unwrap();
    assert_eq!(fetched.sku, "WH001");
    assert_eq!(fetched.price, Money::from_cents(1999));
    assert_eq!(fetched.category.as_deref(), Some("Electronics"));
}

#[tokio::test]
#[serial]
async fn duplicate_sku_maps_to_store_error() {
    let store = get_test_store().await;
    store.insert_product(product("WH001", 25)).await.unwrap();

    let result = store.insert_product(product("WH001", 1)).await;
    assert!(matches!(result, Err(StoreError::DuplicateSku(_))));
}

#[tokio::test]
#[serial]
async fn list_products_searches_and_pages() {
    let store = get_test_store().await;
    let base = Utc::now();
    for n in 0..3 {
        let mut p = product(&format!("CAB-{n}"), 10);
        p.name = format!("USB Cable {n}");
        p.created_at = base + Duration::seconds(n);
        store.insert_product(p).await.unwrap();
    }
    store.insert_product(product("LS002", 15)).await.unwrap();

    let page = store
        .list_products(
            &ListQuery::new()
                .search("usb cable")
                .page(PageRequest::new(1, 2)),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].sku, "CAB-2");

    // Wildcards in search text are literal
    let page = store
        .list_products(&ListQuery::new().search("%"))
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
#[serial]
async fn invoice_insert_decrements_stock_and_loads_lines() {
    let store = get_test_store().await;
    let c = store.insert_customer(customer("Jane")).await.unwrap();
    let a = store.insert_product(product("A-1", 10)).await.unwrap();
    let b = store.insert_product(product("B-1", 4)).await.unwrap();

    let created = store
        .insert_invoice(invoice(
            "INV-0001",
            c.id,
            vec![
                InvoiceItem::new(a.id, 3, a.price),
                InvoiceItem::new(b.id, 4, b.price),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(store.require_product(a.id).await.unwrap().stock, 7);
    assert_eq!(store.require_product(b.id).await.unwrap().stock, 0);

    let fetched = store.require_invoice(created.id).await.unwrap();
    assert_eq!(fetched.items.len(), 2);
    assert_eq!(fetched.items[0].product_id, a.id);
    assert_eq!(fetched.total, created.total);
}

#[tokio::test]
#[serial]
async fn invoice_insert_rolls_back_on_insufficient_stock() {
    let store = get_test_store().await;
    let c = store.insert_customer(customer("Jane")).await.unwrap();
    let a = store.insert_product(product("A-1", 10)).await.unwrap();
    let b = store.insert_product(product("B-1", 1)).await.unwrap();

    let result = store
        .insert_invoice(invoice(
            "INV-0001",
            c.id,
            vec![
                InvoiceItem::new(a.id, 3, a.price),
                InvoiceItem::new(b.id, 2, b.price),
            ],
        ))
        .await;

    assert!(matches!(
        result,
        Err(StoreError::InsufficientStock { available: 1, .. })
    ));
    assert_eq!(store.require_product(a.id).await.unwrap().stock, 10);
    assert!(store.latest_invoice_number().await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn invoice_for_missing_customer_is_not_found() {
    let store = get_test_store().await;
    let a = store.insert_product(product("A-1", 10)).await.unwrap();

    let result = store
        .insert_invoice(invoice(
            "INV-0001",
            CustomerId::new(),
            vec![InvoiceItem::new(a.id, 1, a.price)],
        ))
        .await;
    assert!(matches!(result, Err(StoreError::NotFound { .. })));
}

#[tokio::test]
#[serial]
async fn referenced_rows_are_protected() {
    let store = get_test_store().await;
    let c = store.insert_customer(customer("Jane")).await.unwrap();
    let a = store.insert_product(product("A-1", 10)).await.unwrap();
    let inv = store
        .insert_invoice(invoice(
            "INV-0001",
            c.id,
            vec![InvoiceItem::new(a.id, 1, a.price)],
        ))
        .await
        .unwrap();

    assert!(matches!(
        store.delete_product(a.id).await,
        Err(StoreError::Referenced { .. })
    ));
    assert!(matches!(
        store.delete_customer(c.id).await,
        Err(StoreError::Referenced { .. })
    ));

    assert!(store.delete_invoice(inv.id).await.unwrap());
    assert!(store.delete_customer(c.id).await.unwrap());
    assert!(store.delete_product(a.id).await.unwrap());
}

#[tokio::test]
#[serial]
async fn invoice_status_filter_and_update() {
    let store = get_test_store().await;
    let c = store.insert_customer(customer("Jane")).await.unwrap();
    let a = store.insert_product(product("A-1", 10)).await.unwrap();
    let inserted = store
        .insert_invoice(invoice(
            "INV-0001",
            c.id,
            vec![InvoiceItem::new(a.id, 1, a.price)],
        ))
        .await
        .unwrap();
    store
        .insert_invoice(invoice(
            "INV-0002",
            c.id,
            vec![InvoiceItem::new(a.id, 1, a.price)],
        ))
        .await
        .unwrap();

    let mut first = store.require_invoice(inserted.id).await.unwrap();
    let expected = first.updated_at;
    first.status = InvoiceStatus::Paid;
    let updated = store.update_invoice(first.clone(), expected).await.unwrap();
    assert_eq!(updated.status, InvoiceStatus::Paid);
    assert_eq!(updated.items.len(), 1);

    let paid = store
        .list_invoices(&InvoiceQuery::new().status(InvoiceStatus::Paid))
        .await
        .unwrap();
    assert_eq!(paid.total, 1);
    assert_eq!(paid.items[0].invoice_number, "INV-0001");

    let stats = store.dashboard_stats().await.unwrap();
    assert_eq!(stats.total_invoices, 2);
    assert_eq!(stats.pending_invoices, 1);
    assert_eq!(stats.total_revenue, first.total);
}

#[tokio::test]
#[serial]
async fn stale_product_update_conflicts_instead_of_restoring_stock() {
    let store = get_test_store().await;
    let c = store.insert_customer(customer("Jane")).await.unwrap();
    let a = store.insert_product(product("A-1", 10)).await.unwrap();

    let mut snapshot = store.require_product(a.id).await.unwrap();
    store
        .insert_invoice(invoice(
            "INV-0001",
            c.id,
            vec![InvoiceItem::new(a.id, 7, a.price)],
        ))
        .await
        .unwrap();

    let expected = snapshot.updated_at;
    snapshot.price = Money::from_cents(1);
    assert!(matches!(
        store.update_product(snapshot, expected).await,
        Err(StoreError::ConcurrencyConflict { .. })
    ));

    let current = store.require_product(a.id).await.unwrap();
    assert_eq!(current.stock, 3);

    let mut fresh = current.clone();
    fresh.price = Money::from_cents(1);
    let updated = store.update_product(fresh, current.updated_at).await.unwrap();
    assert_eq!(updated.stock, 3);
    assert_eq!(updated.price, Money::from_cents(1));

    let mut missing = product("GONE", 1);
    missing.name = "Missing".to_string();
    let expected = missing.updated_at;
    assert!(matches!(
        store.update_product(missing, expected).await,
        Err(StoreError::NotFound { .. })
    ));
}

fn next_number(latest: Option<&str>) -> String {
    let n = latest
        .and_then(|number| number.strip_prefix("INV-"))
        .and_then(|n| n.parse::<u32>().ok())
        .unwrap_or(0);
    format!("INV-{:04}", n + 1)
}

#[tokio::test]
#[serial]
async fn concurrent_numbered_invoices_get_distinct_numbers() {
    let store = get_test_store().await;
    let c = store.insert_customer(customer("Jane")).await.unwrap();
    let a = store.insert_product(product("A-1", 100)).await.unwrap();

    let customer_id = c.id;
    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let store = store.clone();
        let items = vec![InvoiceItem::new(a.id, 1, a.price)];
        tasks.spawn(async move {
            store
                .insert_numbered_invoice(invoice("", customer_id, items), next_number)
                .await
        });
    }

    let mut numbers = Vec::new();
    while let Some(result) = tasks.join_next().await {
        numbers.push(result.unwrap().unwrap().invoice_number);
    }
    numbers.sort();
    let expected: Vec<_> = (1..=8).map(|n| format!("INV-{n:04}")).collect();
    assert_eq!(numbers, expected);
    assert_eq!(store.require_product(a.id).await.unwrap().stock, 92);
}

#[tokio::test]
#[serial]
async fn adjust_stock_is_bounded_at_zero() {
    let store = get_test_store().await;
    let a = store.insert_product(product("A-1", 2)).await.unwrap();

    assert_eq!(store.adjust_stock(a.id, -2).await.unwrap().stock, 0);
    assert!(matches!(
        store.adjust_stock(a.id, -1).await,
        Err(StoreError::InsufficientStock { .. })
    ));
    assert_eq!(store.low_stock_products().await.unwrap().len(), 1);
}

#[tokio::test]
#[serial]
async fn upsert_user_keeps_created_at() {
    let store = get_test_store().await;
    let created = Utc::now() - Duration::days(1);
    let user = User {
        id: "demo-user-1".to_string(),
        email: Some("demo@example.com".to_string()),
        first_name: Some("Demo".to_string()),
        last_name: Some("User".to_string()),
        profile_image_url: None,
        created_at: created,
        updated_at: created,
    };
    store.upsert_user(user.clone()).await.unwrap();

    let again = User {
        created_at: Utc::now(),
        updated_at: Utc::now(),
        ..user
    };
    let stored = store.upsert_user(again).await.unwrap();
    // Postgres stores microseconds
    assert_eq!(
        stored.created_at.timestamp_micros(),
        created.timestamp_micros()
    );
    assert!(store.get_user("demo-user-1").await.unwrap().is_some());
}

#[tokio::test]
#[serial]
async fn users_may_share_an_email() {
    let store = get_test_store().await;
    let now = Utc::now();
    for id in ["user-a", "user-b"] {
        store
            .upsert_user(User {
                id: id.to_string(),
                email: Some("shared@example.com".to_string()),
                first_name: None,
                last_name: None,
                profile_image_url: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }
    assert!(store.get_user("user-a").await.unwrap().is_some());
    assert!(store.get_user("user-b").await.unwrap().is_some());
}
