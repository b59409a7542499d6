use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use crate::model::{CUSTOMER, INVOICE, PRODUCT};
use crate::store::{InventoryStore, stock_demand};
use crate::{
    Customer, CustomerId, DashboardStats, Invoice, InvoiceId, InvoiceItem, InvoiceQuery,
    InvoiceStatus, ListQuery, Money, Page, Product, ProductId, Result, StoreError, User,
};

const USER_COLUMNS: &str =
    "id, email, first_name, last_name, profile_image_url, created_at, updated_at";
const PRODUCT_COLUMNS: &str = "id, name, sku, description, category, price, stock, min_stock, image_url, is_active, created_at, updated_at";
const CUSTOMER_COLUMNS: &str =
    "id, name, email, phone, address, city, state, zip_code, country, created_at, updated_at";
const LATEST_INVOICE_NUMBER_SQL: &str =
    "SELECT invoice_number FROM invoices ORDER BY created_at DESC, id DESC LIMIT 1";
/// Advisory lock key serializing automatic invoice numbering.
const INVOICE_NUMBER_LOCK: i64 = 0x494E_565F_4E55_4D;
const INVOICE_COLUMNS: &str = "id, invoice_number, customer_id, user_id, issue_date, due_date, subtotal, tax, total, status, notes, created_at, updated_at";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Explains why an `UPDATE ... WHERE updated_at = expected` matched no row.
    async fn stale_or_missing(&self, table: &str, entity: &'static str, id: Uuid) -> StoreError {
        let exists = sqlx::query_scalar::<_, bool>(&format!(
            "SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1)"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await;
        match exists {
            Ok(true) => StoreError::conflict(entity, id),
            Ok(false) => StoreError::not_found(entity, id),
            Err(e) => StoreError::Database(e),
        }
    }

    /// Checks stock, decrements it and inserts the invoice with its lines.
    async fn write_invoice(conn: &mut PgConnection, invoice: &Invoice) -> Result<()> {
        // Hold the customer so it cannot be deleted mid-insert
        let customer_exists: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM customers WHERE id = $1 FOR SHARE")
                .bind(invoice.customer_id.as_uuid())
                .fetch_optional(&mut *conn)
                .await?;
        if customer_exists.is_none() {
            return Err(StoreError::not_found(CUSTOMER, invoice.customer_id));
        }

        // Lock product rows in id order, check, then decrement
        for (&product_id, &requested) in &stock_demand(&invoice.items) {
            let available: Option<i32> =
                sqlx::query_scalar("SELECT stock FROM products WHERE id = $1 FOR UPDATE")
                    .bind(product_id.as_uuid())
                    .fetch_optional(&mut *conn)
                    .await?;
            let available = available.ok_or_else(|| StoreError::not_found(PRODUCT, product_id))?;

            if i64::from(available) < requested {
                return Err(StoreError::InsufficientStock {
                    product_id,
                    requested,
                    available,
                });
            }

            sqlx::query(
                "UPDATE products SET stock = stock - $2, updated_at = GREATEST($3, updated_at + INTERVAL '1 microsecond') WHERE id = $1",
            )
            .bind(product_id.as_uuid())
            .bind(requested)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO invoices (id, invoice_number, customer_id, user_id, issue_date, due_date, subtotal, tax, total, status, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(invoice.id.as_uuid())
        .bind(&invoice.invoice_number)
        .bind(invoice.customer_id.as_uuid())
        .bind(&invoice.user_id)
        .bind(invoice.issue_date)
        .bind(invoice.due_date)
        .bind(invoice.subtotal.cents())
        .bind(invoice.tax.cents())
        .bind(invoice.total.cents())
        .bind(invoice.status.as_str())
        .bind(&invoice.notes)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            if is_constraint(&e, "unique_invoice_number") {
                return StoreError::DuplicateInvoiceNumber(invoice.invoice_number.clone());
            }
            StoreError::Database(e)
        })?;

        for (position, item) in invoice.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO invoice_items (invoice_id, position, product_id, quantity, unit_price, total)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(invoice.id.as_uuid())
            .bind(position as i32)
            .bind(item.product_id.as_uuid())
            // bounded by the stock check above
            .bind(item.quantity as i32)
            .bind(item.unit_price.cents())
            .bind(item.total.cents())
            .execute(&mut *conn)
            .await?;
        }

        tracing::debug!(invoice_number = %invoice.invoice_number, lines = invoice.items.len(), "invoice stored");
        Ok(())
    }

    fn row_to_user(row: PgRow) -> Result<User> {
        Ok(User {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            profile_image_url: row.try_get("profile_image_url")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            sku: row.try_get("sku")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            price: Money::from_cents(row.try_get("price")?),
            stock: row.try_get("stock")?,
            min_stock: row.try_get("min_stock")?,
            image_url: row.try_get("image_url")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_customer(row: PgRow) -> Result<Customer> {
        Ok(Customer {
            id: CustomerId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            city: row.try_get("city")?,
            state: row.try_get("state")?,
            zip_code: row.try_get("zip_code")?,
            country: row.try_get("country")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Maps an invoice header row; lines are attached separately.
    fn row_to_invoice(row: PgRow) -> Result<Invoice> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<InvoiceStatus>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Invoice {
            id: InvoiceId::from_uuid(row.try_get::<Uuid, _>("id")?),
            invoice_number: row.try_get("invoice_number")?,
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            user_id: row.try_get("user_id")?,
            issue_date: row.try_get("issue_date")?,
            due_date: row.try_get("due_date")?,
            subtotal: Money::from_cents(row.try_get("subtotal")?),
            tax: Money::from_cents(row.try_get("tax")?),
            total: Money::from_cents(row.try_get("total")?),
            status,
            notes: row.try_get("notes")?,
            items: Vec::new(),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Loads the lines of every invoice in `invoices`.
    async fn attach_items(&self, invoices: &mut [Invoice]) -> Result<()> {
        if invoices.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = invoices.iter().map(|i| i.id.as_uuid()).collect();

        let rows = sqlx::query(
            r#"
            SELECT invoice_id, product_id, quantity, unit_price, total
            FROM invoice_items
            WHERE invoice_id = ANY($1)
            ORDER BY invoice_id, position ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_invoice: HashMap<Uuid, Vec<InvoiceItem>> = HashMap::new();
        for row in rows {
            let invoice_id: Uuid = row.try_get("invoice_id")?;
            // quantity > 0 is enforced by a CHECK constraint
            let quantity: i32 = row.try_get("quantity")?;
            by_invoice.entry(invoice_id).or_default().push(InvoiceItem {
                product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
                quantity: quantity as u32,
                unit_price: Money::from_cents(row.try_get("unit_price")?),
                total: Money::from_cents(row.try_get("total")?),
            });
        }

        for invoice in invoices.iter_mut() {
            invoice.items = by_invoice.remove(&invoice.id.as_uuid()).unwrap_or_default();
        }
        Ok(())
    }
}

/// Turns search text into an `ILIKE` substring pattern.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn is_constraint(err: &sqlx::Error, name: &str) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.constraint() == Some(name))
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

#[async_trait]
impl InventoryStore for PostgresStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_user).transpose()
    }

    async fn upsert_user(&self, user: User) -> Result<User> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (id, email, first_name, last_name, profile_image_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                profile_image_url = EXCLUDED.profile_image_url,
                updated_at = EXCLUDED.updated_at
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.profile_image_url)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Self::row_to_user(row)
    }

    async fn list_products(&self, query: &ListQuery) -> Result<Page<Product>> {
        let pattern = query.search.as_deref().map(like_pattern);

        let rows = sqlx::query(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE ($1::TEXT IS NULL OR name ILIKE $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(&pattern)
        .bind(i64::from(query.page.limit()))
        .bind(query.page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE ($1::TEXT IS NULL OR name ILIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Self::row_to_product)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total as u64, query.page))
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_product).transpose()
    }

    async fn get_products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let ids: Vec<Uuid> = ids.iter().map(ProductId::as_uuid).collect();
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn insert_product(&self, product: Product) -> Result<Product> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products (id, name, sku, description, category, price, stock, min_stock, image_url, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.sku)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price.cents())
        .bind(product.stock)
        .bind(product.min_stock)
        .bind(&product.image_url)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_constraint(&e, "unique_product_sku") {
                return StoreError::DuplicateSku(product.sku.clone());
            }
            StoreError::Database(e)
        })?;
        Self::row_to_product(row)
    }

    async fn update_product(&self, product: Product, expected: DateTime<Utc>) -> Result<Product> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE products SET
                name = $2, sku = $3, description = $4, category = $5, price = $6,
                stock = $7, min_stock = $8, image_url = $9, is_active = $10,
                updated_at = GREATEST($11, updated_at + INTERVAL '1 microsecond')
            WHERE id = $1 AND updated_at = $12
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.sku)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price.cents())
        .bind(product.stock)
        .bind(product.min_stock)
        .bind(&product.image_url)
        .bind(product.is_active)
        .bind(product.updated_at)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_constraint(&e, "unique_product_sku") {
                return StoreError::DuplicateSku(product.sku.clone());
            }
            StoreError::Database(e)
        })?;

        match row {
            Some(row) => Self::row_to_product(row),
            None => Err(self
                .stale_or_missing("products", PRODUCT, product.id.as_uuid())
                .await),
        }
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    return StoreError::referenced(PRODUCT, id);
                }
                StoreError::Database(e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn adjust_stock(&self, id: ProductId, delta: i32) -> Result<Product> {
        let mut tx = self.pool.begin().await?;

        let current: Option<i32> =
            sqlx::query_scalar("SELECT stock FROM products WHERE id = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        let current = current.ok_or_else(|| StoreError::not_found(PRODUCT, id))?;

        let new_stock = current.saturating_add(delta);
        if new_stock < 0 {
            return Err(StoreError::InsufficientStock {
                product_id: id,
                requested: -i64::from(delta),
                available: current,
            });
        }

        let row = sqlx::query(&format!(
            "UPDATE products SET stock = $2, updated_at = GREATEST($3, updated_at + INTERVAL '1 microsecond') WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(new_stock)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Self::row_to_product(row)
    }

    async fn low_stock_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE stock <= min_stock ORDER BY stock ASC, name ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn list_customers(&self, query: &ListQuery) -> Result<Page<Customer>> {
        let pattern = query.search.as_deref().map(like_pattern);

        let rows = sqlx::query(&format!(
            r#"
            SELECT {CUSTOMER_COLUMNS} FROM customers
            WHERE ($1::TEXT IS NULL OR name ILIKE $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(&pattern)
        .bind(i64::from(query.page.limit()))
        .bind(query.page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM customers WHERE ($1::TEXT IS NULL OR name ILIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Self::row_to_customer)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total as u64, query.page))
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_customer).transpose()
    }

    async fn get_customers_by_ids(&self, ids: &[CustomerId]) -> Result<Vec<Customer>> {
        let ids: Vec<Uuid> = ids.iter().map(CustomerId::as_uuid).collect();
        let rows = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ANY($1)"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_customer).collect()
    }

    async fn insert_customer(&self, customer: Customer) -> Result<Customer> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO customers (id, name, email, phone, address, city, state, zip_code, country, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {CUSTOMER_COLUMNS}
            "#
        ))
        .bind(customer.id.as_uuid())
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(&customer.city)
        .bind(&customer.state)
        .bind(&customer.zip_code)
        .bind(&customer.country)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Self::row_to_customer(row)
    }

    async fn update_customer(
        &self,
        customer: Customer,
        expected: DateTime<Utc>,
    ) -> Result<Customer> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE customers SET
                name = $2, email = $3, phone = $4, address = $5, city = $6,
                state = $7, zip_code = $8, country = $9,
                updated_at = GREATEST($10, updated_at + INTERVAL '1 microsecond')
            WHERE id = $1 AND updated_at = $11
            RETURNING {CUSTOMER_COLUMNS}
            "#
        ))
        .bind(customer.id.as_uuid())
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(&customer.city)
        .bind(&customer.state)
        .bind(&customer.zip_code)
        .bind(&customer.country)
        .bind(customer.updated_at)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_customer(row),
            None => Err(self
                .stale_or_missing("customers", CUSTOMER, customer.id.as_uuid())
                .await),
        }
    }

    async fn delete_customer(&self, id: CustomerId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    return StoreError::referenced(CUSTOMER, id);
                }
                StoreError::Database(e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_invoices(&self, query: &InvoiceQuery) -> Result<Page<Invoice>> {
        let pattern = query.list.search.as_deref().map(like_pattern);

        // Build the shared WHERE clause
        let mut filter = String::from(" WHERE 1=1");
        let mut param_count = 0;
        if pattern.is_some() {
            param_count += 1;
            filter.push_str(&format!(" AND invoice_number ILIKE ${param_count}"));
        }
        if query.status.is_some() {
            param_count += 1;
            filter.push_str(&format!(" AND status = ${param_count}"));
        }

        let select_sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices{filter} ORDER BY created_at DESC, id DESC LIMIT ${} OFFSET ${}",
            param_count + 1,
            param_count + 2
        );
        let count_sql = format!("SELECT COUNT(*) FROM invoices{filter}");

        let mut select = sqlx::query(&select_sql);
        let mut count = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(ref pattern) = pattern {
            select = select.bind(pattern);
            count = count.bind(pattern);
        }
        if let Some(status) = query.status {
            select = select.bind(status.as_str());
            count = count.bind(status.as_str());
        }
        select = select
            .bind(i64::from(query.list.page.limit()))
            .bind(query.list.page.offset() as i64);

        let rows = select.fetch_all(&self.pool).await?;
        let total = count.fetch_one(&self.pool).await?;

        let mut invoices = rows
            .into_iter()
            .map(Self::row_to_invoice)
            .collect::<Result<Vec<_>>>()?;
        self.attach_items(&mut invoices).await?;
        Ok(Page::new(invoices, total as u64, query.list.page))
    }

    async fn get_invoice(&self, id: InvoiceId) -> Result<Option<Invoice>> {
        let row = sqlx::query(&format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let mut invoice = Self::row_to_invoice(row)?;
                self.attach_items(std::slice::from_mut(&mut invoice)).await?;
                Ok(Some(invoice))
            }
            None => Ok(None),
        }
    }

    async fn insert_invoice(&self, invoice: Invoice) -> Result<Invoice> {
        let mut tx = self.pool.begin().await?;
        Self::write_invoice(&mut *tx, &invoice).await?;
        tx.commit().await?;
        Ok(invoice)
    }

    async fn insert_numbered_invoice(
        &self,
        mut invoice: Invoice,
        next_number: for<'n> fn(Option<&'n str>) -> String,
    ) -> Result<Invoice> {
        let mut tx = self.pool.begin().await?;

        // Released at commit or rollback
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(INVOICE_NUMBER_LOCK)
            .execute(&mut *tx)
            .await?;
        let latest: Option<String> = sqlx::query_scalar(LATEST_INVOICE_NUMBER_SQL)
            .fetch_optional(&mut *tx)
            .await?;
        invoice.invoice_number = next_number(latest.as_deref());
        invoice.created_at = Utc::now();
        invoice.updated_at = invoice.created_at;

        Self::write_invoice(&mut *tx, &invoice).await?;
        tx.commit().await?;
        Ok(invoice)
    }

    async fn update_invoice(&self, invoice: Invoice, expected: DateTime<Utc>) -> Result<Invoice> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE invoices SET
                invoice_number = $2, customer_id = $3, user_id = $4, issue_date = $5,
                due_date = $6, subtotal = $7, tax = $8, total = $9, status = $10,
                notes = $11, updated_at = GREATEST($12, updated_at + INTERVAL '1 microsecond')
            WHERE id = $1 AND updated_at = $13
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(invoice.id.as_uuid())
        .bind(&invoice.invoice_number)
        .bind(invoice.customer_id.as_uuid())
        .bind(&invoice.user_id)
        .bind(invoice.issue_date)
        .bind(invoice.due_date)
        .bind(invoice.subtotal.cents())
        .bind(invoice.tax.cents())
        .bind(invoice.total.cents())
        .bind(invoice.status.as_str())
        .bind(&invoice.notes)
        .bind(invoice.updated_at)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_constraint(&e, "unique_invoice_number") {
                return StoreError::DuplicateInvoiceNumber(invoice.invoice_number.clone());
            }
            if is_foreign_key_violation(&e) {
                return StoreError::not_found(CUSTOMER, invoice.customer_id);
            }
            StoreError::Database(e)
        })?;

        let Some(row) = row else {
            return Err(self
                .stale_or_missing("invoices", INVOICE, invoice.id.as_uuid())
                .await);
        };
        let mut updated = Self::row_to_invoice(row)?;
        self.attach_items(std::slice::from_mut(&mut updated)).await?;
        Ok(updated)
    }

    async fn delete_invoice(&self, id: InvoiceId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn latest_invoice_number(&self) -> Result<Option<String>> {
        let number: Option<String> = sqlx::query_scalar(LATEST_INVOICE_NUMBER_SQL)
            .fetch_optional(&self.pool)
            .await?;
        Ok(number)
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let pool = &self.pool;
        let count = move |sql: &'static str| sqlx::query_scalar::<_, i64>(sql).fetch_one(pool);

        let (products, customers, invoices, revenue, pending, low_stock) = futures_util::try_join!(
            count("SELECT COUNT(*) FROM products"),
            count("SELECT COUNT(*) FROM customers"),
            count("SELECT COUNT(*) FROM invoices"),
            count("SELECT COALESCE(SUM(total), 0)::BIGINT FROM invoices WHERE status = 'paid'"),
            count("SELECT COUNT(*) FROM invoices WHERE status = 'pending'"),
            count("SELECT COUNT(*) FROM products WHERE stock <= min_stock"),
        )?;

        Ok(DashboardStats {
            total_products: products as u64,
            total_customers: customers as u64,
            total_invoices: invoices as u64,
            total_revenue: Money::from_cents(revenue),
            pending_invoices: pending as u64,
            low_stock_count: low_stock as u64,
        })
    }
}
