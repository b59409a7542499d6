//! Shared types used across the inventory service crates.

pub mod money;
pub mod page;
pub mod types;

pub use money::Money;
pub use page::{Page, PageRequest};
pub use types::{CustomerId, InvoiceId, ProductId};
