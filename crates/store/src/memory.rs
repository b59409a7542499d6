use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::model::{CUSTOMER, INVOICE, PRODUCT};
use crate::store::{InventoryStore, stock_demand};
use crate::{
    Customer, CustomerId, DashboardStats, Invoice, InvoiceId, InvoiceQuery, InvoiceStatus,
    ListQuery, Page, PageRequest, Product, ProductId, Result, StoreError, User,
};

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    products: Vec<Product>,
    customers: Vec<Customer>,
    invoices: Vec<Invoice>,
}

/// In-memory store implementation.
///
/// All tables live behind one lock, so multi-record writes are applied
/// atomically. Provides the same interface as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl Tables {
    fn latest_invoice_number(&self) -> Option<String> {
        // `max_by_key` keeps the last maximum, i.e. the latest insert on ties.
        self.invoices
            .iter()
            .max_by_key(|i| i.created_at)
            .map(|i| i.invoice_number.clone())
    }

    fn insert_invoice(&mut self, invoice: Invoice) -> Result<Invoice> {
        if !self.customers.iter().any(|c| c.id == invoice.customer_id) {
            return Err(StoreError::not_found(CUSTOMER, invoice.customer_id));
        }
        if self
            .invoices
            .iter()
            .any(|i| i.invoice_number == invoice.invoice_number)
        {
            return Err(StoreError::DuplicateInvoiceNumber(invoice.invoice_number));
        }

        // Check every line before touching any stock.
        let demand = stock_demand(&invoice.items);
        for (&product_id, &requested) in &demand {
            let product = self
                .products
                .iter()
                .find(|p| p.id == product_id)
                .ok_or_else(|| StoreError::not_found(PRODUCT, product_id))?;
            if i64::from(product.stock) < requested {
                return Err(StoreError::InsufficientStock {
                    product_id,
                    requested,
                    available: product.stock,
                });
            }
        }

        let now = Utc::now();
        for product in self.products.iter_mut() {
            if let Some(&requested) = demand.get(&product.id) {
                product.stock = (i64::from(product.stock) - requested) as i32;
                product.updated_at = touch(product.updated_at, now);
            }
        }
        self.invoices.push(invoice.clone());

        tracing::debug!(invoice_number = %invoice.invoice_number, lines = invoice.items.len(), "invoice stored");
        Ok(invoice)
    }
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all tables.
    pub async fn clear(&self) {
        let mut tables = self.tables.write().await;
        *tables = Tables::default();
    }
}

/// Modification time for a row last changed at `previous`, always after it.
fn touch(previous: DateTime<Utc>, proposed: DateTime<Utc>) -> DateTime<Utc> {
    proposed.max(previous + Duration::nanoseconds(1))
}

/// Orders rows newest first (ties broken by later insertion) and cuts one page.
fn newest_first<'a, T, I, F>(rows: I, created_at: F, request: PageRequest) -> Page<T>
where
    T: Clone + 'a,
    I: DoubleEndedIterator<Item = &'a T>,
    F: Fn(&T) -> DateTime<Utc>,
{
    let mut matched: Vec<&T> = rows.rev().collect();
    matched.sort_by_key(|row| std::cmp::Reverse(created_at(*row)));

    let total = matched.len() as u64;
    let items = matched
        .into_iter()
        .skip(request.offset() as usize)
        .take(request.limit() as usize)
        .cloned()
        .collect();
    Page::new(items, total, request)
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn upsert_user(&self, mut user: User) -> Result<User> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.users.get(&user.id) {
            user.created_at = existing.created_at;
        }
        tables.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn list_products(&self, query: &ListQuery) -> Result<Page<Product>> {
        let tables = self.tables.read().await;
        let rows = tables.products.iter().filter(|p| query.matches(&p.name));
        Ok(newest_first(rows, |p| p.created_at, query.page))
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let tables = self.tables.read().await;
        Ok(tables.products.iter().find(|p| p.id == id).cloned())
    }

    async fn get_products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn insert_product(&self, product: Product) -> Result<Product> {
        let mut tables = self.tables.write().await;
        if tables.products.iter().any(|p| p.sku == product.sku) {
            return Err(StoreError::DuplicateSku(product.sku));
        }
        tables.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        mut product: Product,
        expected: DateTime<Utc>,
    ) -> Result<Product> {
        let mut tables = self.tables.write().await;
        if tables
            .products
            .iter()
            .any(|p| p.sku == product.sku && p.id != product.id)
        {
            return Err(StoreError::DuplicateSku(product.sku));
        }
        let slot = tables
            .products
            .iter_mut()
            .find(|p| p.id == product.id)
            .ok_or_else(|| StoreError::not_found(PRODUCT, product.id))?;
        if slot.updated_at != expected {
            return Err(StoreError::conflict(PRODUCT, product.id));
        }
        product.updated_at = touch(slot.updated_at, product.updated_at);
        *slot = product.clone();
        Ok(product)
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.invoices.iter().any(|i| i.references_product(id)) {
            return Err(StoreError::referenced(PRODUCT, id));
        }
        let before = tables.products.len();
        tables.products.retain(|p| p.id != id);
        Ok(tables.products.len() != before)
    }

    async fn adjust_stock(&self, id: ProductId, delta: i32) -> Result<Product> {
        let mut tables = self.tables.write().await;
        let product = tables
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::not_found(PRODUCT, id))?;

        let new_stock = product.stock.saturating_add(delta);
        if new_stock < 0 {
            return Err(StoreError::InsufficientStock {
                product_id: id,
                requested: -i64::from(delta),
                available: product.stock,
            });
        }
        product.stock = new_stock;
        product.updated_at = touch(product.updated_at, Utc::now());
        Ok(product.clone())
    }

    async fn low_stock_products(&self) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        let mut products: Vec<Product> = tables
            .products
            .iter()
            .filter(|p| p.is_low_stock())
            .cloned()
            .collect();
        products.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));
        Ok(products)
    }

    async fn list_customers(&self, query: &ListQuery) -> Result<Page<Customer>> {
        let tables = self.tables.read().await;
        let rows = tables.customers.iter().filter(|c| query.matches(&c.name));
        Ok(newest_first(rows, |c| c.created_at, query.page))
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let tables = self.tables.read().await;
        Ok(tables.customers.iter().find(|c| c.id == id).cloned())
    }

    async fn get_customers_by_ids(&self, ids: &[CustomerId]) -> Result<Vec<Customer>> {
        let tables = self.tables.read().await;
        Ok(tables
            .customers
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn insert_customer(&self, customer: Customer) -> Result<Customer> {
        self.tables.write().await.customers.push(customer.clone());
        Ok(customer)
    }

    async fn update_customer(
        &self,
        mut customer: Customer,
        expected: DateTime<Utc>,
    ) -> Result<Customer> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .customers
            .iter_mut()
            .find(|c| c.id == customer.id)
            .ok_or_else(|| StoreError::not_found(CUSTOMER, customer.id))?;
        if slot.updated_at != expected {
            return Err(StoreError::conflict(CUSTOMER, customer.id));
        }
        customer.updated_at = touch(slot.updated_at, customer.updated_at);
        *slot = customer.clone();
        Ok(customer)
    }

    async fn delete_customer(&self, id: CustomerId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.invoices.iter().any(|i| i.customer_id == id) {
            return Err(StoreError::referenced(CUSTOMER, id));
        }
        let before = tables.customers.len();
        tables.customers.retain(|c| c.id != id);
        Ok(tables.customers.len() != before)
    }

    async fn list_invoices(&self, query: &InvoiceQuery) -> Result<Page<Invoice>> {
        let tables = self.tables.read().await;
        let rows = tables.invoices.iter().filter(|i| {
            query.list.matches(&i.invoice_number)
                && query.status.is_none_or(|status| i.status == status)
        });
        Ok(newest_first(rows, |i| i.created_at, query.list.page))
    }

    async fn get_invoice(&self, id: InvoiceId) -> Result<Option<Invoice>> {
        let tables = self.tables.read().await;
        Ok(tables.invoices.iter().find(|i| i.id == id).cloned())
    }

    async fn insert_invoice(&self, invoice: Invoice) -> Result<Invoice> {
        self.tables.write().await.insert_invoice(invoice)
    }

    async fn insert_numbered_invoice(
        &self,
        mut invoice: Invoice,
        next_number: for<'n> fn(Option<&'n str>) -> String,
    ) -> Result<Invoice> {
        let mut tables = self.tables.write().await;
        invoice.invoice_number = next_number(tables.latest_invoice_number().as_deref());
        invoice.created_at = Utc::now();
        invoice.updated_at = invoice.created_at;
        tables.insert_invoice(invoice)
    }

    async fn update_invoice(
        &self,
        mut invoice: Invoice,
        expected: DateTime<Utc>,
    ) -> Result<Invoice> {
        let mut tables = self.tables.write().await;

        if !tables.customers.iter().any(|c| c.id == invoice.customer_id) {
            return Err(StoreError::not_found(CUSTOMER, invoice.customer_id));
        }
        if tables
            .invoices
            .iter()
            .any(|i| i.invoice_number == invoice.invoice_number && i.id != invoice.id)
        {
            return Err(StoreError::DuplicateInvoiceNumber(invoice.invoice_number));
        }

        let slot = tables
            .invoices
            .iter_mut()
            .find(|i| i.id == invoice.id)
            .ok_or_else(|| StoreError::not_found(INVOICE, invoice.id))?;
        if slot.updated_at != expected {
            return Err(StoreError::conflict(INVOICE, invoice.id));
        }
        invoice.updated_at = touch(slot.updated_at, invoice.updated_at);
        invoice.items = slot.items.clone();
        *slot = invoice.clone();
        Ok(invoice)
    }

    async fn delete_invoice(&self, id: InvoiceId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.invoices.len();
        tables.invoices.retain(|i| i.id != id);
        Ok(tables.invoices.len() != before)
    }

    async fn latest_invoice_number(&self) -> Result<Option<String>> {
        Ok(self.tables.read().await.latest_invoice_number())
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let tables = self.tables.read().await;
        Ok(DashboardStats {
            total_products: tables.products.len() as u64,
            total_customers: tables.customers.len() as u64,
            total_invoices: tables.invoices.len() as u64,
            total_revenue: tables
                .invoices
                .iter()
                .filter(|i| i.status == InvoiceStatus::Paid)
                .map(|i| i.total)
                .sum(),
            pending_invoices: tables
                .invoices
                .iter()
                .filter(|i| i.status == InvoiceStatus::Pending)
                .count() as u64,
            low_stock_count: tables.products.iter().filter(|p| p.is_low_stock()).count() as u64,
        })
    }
}
