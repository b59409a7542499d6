//! Product service providing catalog, stock and sale operations.

use chrono::Utc;
use common::{Page, ProductId};
use store::{InventoryStore, InventoryStoreExt, ListQuery, Product, StoreError};

use crate::UPDATE_ATTEMPTS;
use crate::error::DomainError;
use crate::validation::{self, ValidationError};

use super::{NewProduct, ProductChanges, ProductWithStock, Sale, SaleReceipt};

/// Service for managing products.
pub struct ProductService<S: InventoryStore> {
    store: S,
}

impl<S: InventoryStore> ProductService<S> {
    /// Creates a new product service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self, query: &ListQuery) -> Result<Page<ProductWithStock>, DomainError> {
        let page = self.store.list_products(query).await?;
        Ok(page.map(ProductWithStock::from))
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: ProductId) -> Result<Option<ProductWithStock>, DomainError> {
        Ok(self.store.get_product(id).await?.map(ProductWithStock::from))
    }

    /// Products at or below their minimum stock.
    #[tracing::instrument(skip(self))]
    pub async fn low_stock(&self) -> Result<Vec<ProductWithStock>, DomainError> {
        let products = self.store.low_stock_products().await?;
        Ok(products.into_iter().map(ProductWithStock::from).collect())
    }

    /// Validates and stores a new product.
    #[tracing::instrument(skip(self), fields(sku = %input.sku))]
    pub async fn create(&self, input: NewProduct) -> Result<ProductWithStock, DomainError> {
        let product = input.into_product(Utc::now())?;
        let product = self.store.insert_product(product).await?;

        metrics::counter!("products_created_total").increment(1);
        tracing::info!(product_id = %product.id, "Product created");

        Ok(product.into())
    }

    /// Applies a partial update to the latest stored version.
    ///
    /// Stock sold or adjusted while the update is in flight is never
    /// overwritten: the store rejects the stale write and the changes are
    /// re-applied to a fresh read.
    #[tracing::instrument(skip(self))]
    pub async fn update(
        &self,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<ProductWithStock, DomainError> {
        let mut attempt = 1;
        loop {
            let mut product = self.store.require_product(id).await?;
            let expected = product.updated_at;
            changes.clone().apply(&mut product, Utc::now())?;

            match self.store.update_product(product, expected).await {
                Err(StoreError::ConcurrencyConflict { .. }) if attempt < UPDATE_ATTEMPTS => {
                    tracing::debug!(attempt, "product changed during update, retrying");
                    attempt += 1;
                }
                result => return Ok(result?.into()),
            }
        }
    }

    /// Returns false if the product did not exist.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<bool, DomainError> {
        let deleted = self.store.delete_product(id).await?;
        if deleted {
            tracing::info!(product_id = %id, "Product deleted");
        }
        Ok(deleted)
    }

    /// Adds `delta` units to stock; negative values remove stock.
    #[tracing::instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        id: ProductId,
        delta: i32,
    ) -> Result<ProductWithStock, DomainError> {
        let product = self.store.adjust_stock(id, delta).await?;
        metrics::counter!("stock_adjustments_total").increment(1);
        Ok(product.into())
    }

    /// Sells units from stock and reports the sale value.
    #[tracing::instrument(skip(self))]
    pub async fn sell(&self, sale: Sale) -> Result<SaleReceipt, DomainError> {
        let quantity = validation::quantity(sale.quantity)?;
        let product = self.store.require_product(sale.product_id).await?;

        let total_price = product
            .price
            .checked_multiply(quantity)
            .ok_or(ValidationError::AmountTooLarge {
                field: "total_price",
            })?;
        let delta = i32::try_from(quantity)
            .ok()
            .and_then(i32::checked_neg)
            .ok_or_else(|| insufficient(&product, quantity))?;
        let product = self.store.adjust_stock(product.id, delta).await?;

        metrics::counter!("sales_total").increment(1);
        tracing::info!(product_id = %product.id, quantity, "Sale recorded");

        Ok(SaleReceipt {
            total_price,
            quantity_sold: quantity,
            product: product.into(),
        })
    }
}

fn insufficient(product: &Product, quantity: u32) -> StoreError {
    StoreError::InsufficientStock {
        product_id: product.id,
        requested: i64::from(quantity),
        available: product.stock,
    }
}
