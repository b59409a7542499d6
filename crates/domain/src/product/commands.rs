//! Product inputs.

use chrono::{DateTime, Utc};
use common::{Money, ProductId};
use serde::Deserialize;
use store::Product;

use crate::validation::{
    self, CATEGORY_MAX, NAME_MAX, SKU_MAX, ValidationError, non_negative_count,
    non_negative_money,
};

/// Default minimum stock before a product counts as low.
pub const DEFAULT_MIN_STOCK: i32 = 10;

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Money,
    pub stock: Option<i32>,
    pub min_stock: Option<i32>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

impl NewProduct {
    /// Creates a product input with only the required fields set.
    pub fn new(name: impl Into<String>, sku: impl Into<String>, price: Money) -> Self {
        Self {
            name: name.into(),
            sku: sku.into(),
            description: None,
            category: None,
            price,
            stock: None,
            min_stock: None,
            image_url: None,
            is_active: None,
        }
    }

    pub fn with_stock(mut self, stock: i32, min_stock: i32) -> Self {
        self.stock = Some(stock);
        self.min_stock = Some(min_stock);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub(crate) fn into_product(self, now: DateTime<Utc>) -> Result<Product, ValidationError> {
        Ok(Product {
            id: ProductId::new(),
            name: validation::required("name", &self.name, NAME_MAX)?,
            sku: validation::required("sku", &self.sku, SKU_MAX)?,
            description: validation::optional("description", self.description.as_deref(), None)?,
            category: validation::optional("category", self.category.as_deref(), Some(CATEGORY_MAX))?,
            price: non_negative_money("price", self.price)?,
            stock: non_negative_count("stock", self.stock.unwrap_or(0))?,
            min_stock: non_negative_count(
                "min_stock",
                self.min_stock.unwrap_or(DEFAULT_MIN_STOCK),
            )?,
            image_url: validation::optional("image_url", self.image_url.as_deref(), None)?,
            is_active: self.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial product update. `None` leaves a field unchanged; blank text
/// clears an optional field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<i32>,
    pub min_stock: Option<i32>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

impl ProductChanges {
    pub(crate) fn apply(
        self,
        product: &mut Product,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        if let Some(name) = self.name {
            product.name = validation::required("name", &name, NAME_MAX)?;
        }
        if let Some(sku) = self.sku {
            product.sku = validation::required("sku", &sku, SKU_MAX)?;
        }
        if let Some(description) = self.description {
            product.description = validation::optional("description", Some(&description), None)?;
        }
        if let Some(category) = self.category {
            product.category =
                validation::optional("category", Some(&category), Some(CATEGORY_MAX))?;
        }
        if let Some(price) = self.price {
            product.price = non_negative_money("price", price)?;
        }
        if let Some(stock) = self.stock {
            product.stock = non_negative_count("stock", stock)?;
        }
        if let Some(min_stock) = self.min_stock {
            product.min_stock = non_negative_count("min_stock", min_stock)?;
        }
        if let Some(image_url) = self.image_url {
            product.image_url = validation::optional("image_url", Some(&image_url), None)?;
        }
        if let Some(is_active) = self.is_active {
            product.is_active = is_active;
        }
        product.updated_at = now;
        Ok(())
    }
}

/// Sells `quantity` units of a product from stock.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Sale {
    pub product_id: ProductId,
    pub quantity: u32,
}
