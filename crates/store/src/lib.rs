//! Storage layer for the inventory service.
//!
//! The [`InventoryStore`] trait is implemented by [`InMemoryStore`] (tests,
//! demos, no `DATABASE_URL`) and [`PostgresStore`]. Both backends give the
//! same guarantees: SKU and invoice-number uniqueness, referential checks on
//! delete, and all-or-nothing invoice creation with stock decrement.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::{CustomerId, InvoiceId, Money, Page, PageRequest, ProductId};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use model::{
    Customer, DashboardStats, Invoice, InvoiceItem, InvoiceStatus, Product, StockStatus, User,
};
pub use postgres::PostgresStore;
pub use query::{InvoiceQuery, ListQuery};
pub use store::{InventoryStore, InventoryStoreExt};
