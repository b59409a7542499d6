//! Products, stock levels and sales.

mod commands;
mod service;

pub use commands::{DEFAULT_MIN_STOCK, NewProduct, ProductChanges, Sale};
pub use service::ProductService;

use common::Money;
use serde::Serialize;
use store::{Product, StockStatus};

/// Product response with its derived stock status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductWithStock {
    #[serde(flatten)]
    pub product: Product,
    pub stock_status: StockStatus,
}

impl From<Product> for ProductWithStock {
    fn from(product: Product) -> Self {
        let stock_status = product.stock_status();
        Self {
            product,
            stock_status,
        }
    }
}

/// Outcome of a recorded sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleReceipt {
    pub product: ProductWithStock,
    pub quantity_sold: u32,
    /// `price * quantity_sold` at the time of sale.
    pub total_price: Money,
}
