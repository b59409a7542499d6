use thiserror::Error;

use crate::ProductId;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Another product already uses this SKU.
    #[error("Product with SKU '{0}' already exists")]
    DuplicateSku(String),

    /// Another invoice already uses this number.
    #[error("Invoice number '{0}' already exists")]
    DuplicateInvoiceNumber(String),

    /// A stock decrement would make the product's stock negative.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i32,
    },

    /// The record changed after it was read; the write was not applied.
    #[error("{entity} {id} was modified concurrently")]
    ConcurrencyConflict { entity: &'static str, id: String },

    /// The record cannot be deleted while invoices point at it.
    #[error("{entity} {id} is referenced by existing invoices")]
    Referenced { entity: &'static str, id: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn conflict(entity: &'static str, id: impl ToString) -> Self {
        StoreError::ConcurrencyConflict {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn referenced(entity: &'static str, id: impl ToString) -> Self {
        StoreError::Referenced {
            entity,
            id: id.to_string(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
