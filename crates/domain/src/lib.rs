//! Domain layer for the inventory service.
//!
//! This crate provides the business rules on top of the storage layer:
//! - Field validation for products, customers and invoices
//! - Invoice totals, tax and numbering
//! - Stock status, sales and stock adjustments
//! - Response views that resolve invoice references to customers and products

pub mod customer;
pub mod dashboard;
pub mod error;
pub mod invoice;
pub mod product;
pub mod user;
pub mod validation;

pub use customer::{CustomerChanges, CustomerService, NewCustomer};
pub use dashboard::DashboardService;
pub use error::DomainError;
pub use invoice::{
    DEFAULT_TAX_RATE_BPS, INVOICE_PREFIX, InvoiceChanges, InvoiceDetail, InvoiceLine,
    InvoiceService, InvoiceTotals, NewInvoice, NewInvoiceLine, next_invoice_number,
};
pub use product::{
    DEFAULT_MIN_STOCK, NewProduct, ProductChanges, ProductService, ProductWithStock, Sale,
    SaleReceipt,
};
pub use user::{DEMO_USER_ID, UserProfile, UserService};
pub use validation::ValidationError;

/// Times a read-modify-write is attempted before a concurrent change to the
/// same record is reported as a conflict.
pub(crate) const UPDATE_ATTEMPTS: u32 = 3;
