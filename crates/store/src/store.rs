use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{CUSTOMER, INVOICE, PRODUCT};
use crate::{
    Customer, CustomerId, DashboardStats, Invoice, InvoiceId, InvoiceItem, InvoiceQuery,
    ListQuery, Page, Product, ProductId, Result, StoreError, User,
};

/// Core trait for storage backends.
///
/// Implementations must be thread-safe (Send + Sync). Writes that touch more
/// than one record (invoice creation, stock changes) are atomic. Every write
/// moves a row's `updated_at` forward, which the `update_*` methods use as
/// the expected version.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    // -- Users --

    async fn get_user(&self, id: &str) -> Result<Option<User>>;

    /// Inserts the user or replaces its profile fields.
    ///
    /// An existing user keeps its original `created_at`.
    async fn upsert_user(&self, user: User) -> Result<User>;

    // -- Products --

    /// Lists products, newest first.
    async fn list_products(&self, query: &ListQuery) -> Result<Page<Product>>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Fetches every product in `ids` that exists, in no particular order.
    async fn get_products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>>;

    /// Fails with `DuplicateSku` if the SKU is taken.
    async fn insert_product(&self, product: Product) -> Result<Product>;

    /// Replaces a stored product that was last modified at `expected`.
    ///
    /// Fails with `ConcurrencyConflict` if the row changed since, or with
    /// `NotFound` or `DuplicateSku`.
    async fn update_product(&self, product: Product, expected: DateTime<Utc>) -> Result<Product>;

    /// Returns false if no such product exists. Fails with `Referenced` if an
    /// invoice line points at it.
    async fn delete_product(&self, id: ProductId) -> Result<bool>;

    /// Adds `delta` (possibly negative) to a product's stock.
    ///
    /// Fails with `InsufficientStock` instead of going below zero.
    async fn adjust_stock(&self, id: ProductId, delta: i32) -> Result<Product>;

    /// All products whose stock is at or below their minimum.
    async fn low_stock_products(&self) -> Result<Vec<Product>>;

    // -- Customers --

    /// Lists customers, newest first.
    async fn list_customers(&self, query: &ListQuery) -> Result<Page<Customer>>;

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>>;

    async fn get_customers_by_ids(&self, ids: &[CustomerId]) -> Result<Vec<Customer>>;

    async fn insert_customer(&self, customer: Customer) -> Result<Customer>;

    /// Replaces a stored customer that was last modified at `expected`.
    async fn update_customer(
        &self,
        customer: Customer,
        expected: DateTime<Utc>,
    ) -> Result<Customer>;

    /// Returns false if no such customer exists. Fails with `Referenced` if
    /// the customer has invoices.
    async fn delete_customer(&self, id: CustomerId) -> Result<bool>;

    // -- Invoices --

    /// Lists invoices, newest first.
    async fn list_invoices(&self, query: &InvoiceQuery) -> Result<Page<Invoice>>;

    async fn get_invoice(&self, id: InvoiceId) -> Result<Option<Invoice>>;

    /// Inserts the invoice and decrements stock by each line's quantity.
    ///
    /// Either the invoice is stored and every decrement applied, or nothing
    /// changes. Fails with `NotFound` for a missing customer or product,
    /// `InsufficientStock`, or `DuplicateInvoiceNumber`.
    async fn insert_invoice(&self, invoice: Invoice) -> Result<Invoice>;

    /// Like `insert_invoice`, but first sets the invoice number to
    /// `next_number(latest)`, where `latest` is the number of the most
    /// recently created invoice, and stamps `created_at` with the current
    /// time so the new invoice becomes the latest.
    ///
    /// Numbering and insert are serialized, so concurrent callers never
    /// receive the same number.
    async fn insert_numbered_invoice(
        &self,
        invoice: Invoice,
        next_number: for<'n> fn(Option<&'n str>) -> String,
    ) -> Result<Invoice>;

    /// Replaces the header of an invoice last modified at `expected`. Lines
    /// are never rewritten and stock is not touched.
    async fn update_invoice(&self, invoice: Invoice, expected: DateTime<Utc>) -> Result<Invoice>;

    /// Removes the invoice. Stock is not restored.
    async fn delete_invoice(&self, id: InvoiceId) -> Result<bool>;

    /// Number of the most recently created invoice.
    async fn latest_invoice_number(&self) -> Result<Option<String>>;

    // -- Dashboard --

    async fn dashboard_stats(&self) -> Result<DashboardStats>;
}

/// Extension trait providing convenience methods for stores.
#[async_trait]
pub trait InventoryStoreExt: InventoryStore {
    /// Loads a product or fails with `NotFound`.
    async fn require_product(&self, id: ProductId) -> Result<Product> {
        self.get_product(id)
            .await?
            .ok_or_else(|| StoreError::not_found(PRODUCT, id))
    }

    /// Loads a customer or fails with `NotFound`.
    async fn require_customer(&self, id: CustomerId) -> Result<Customer> {
        self.get_customer(id)
            .await?
            .ok_or_else(|| StoreError::not_found(CUSTOMER, id))
    }

    /// Loads an invoice or fails with `NotFound`.
    async fn require_invoice(&self, id: InvoiceId) -> Result<Invoice> {
        self.get_invoice(id)
            .await?
            .ok_or_else(|| StoreError::not_found(INVOICE, id))
    }
}

impl<T: InventoryStore + ?Sized> InventoryStoreExt for T {}

/// Sums line quantities per product.
///
/// The map is ordered by id so backends lock product rows in a stable order.
pub(crate) fn stock_demand(items: &[InvoiceItem]) -> BTreeMap<ProductId, i64> {
    let mut demand = BTreeMap::new();
    for item in items {
        *demand.entry(item.product_id).or_insert(0) += i64::from(item.quantity);
    }
    demand
}
