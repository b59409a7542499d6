//! Invoices: numbering, totals and population of references.

mod commands;
mod numbering;
mod service;
mod totals;
mod view;

pub use commands::{InvoiceChanges, NewInvoice, NewInvoiceLine};
pub use numbering::{INVOICE_PREFIX, next_invoice_number};
pub use service::InvoiceService;
pub use totals::{DEFAULT_TAX_RATE_BPS, InvoiceTotals};
pub use view::{InvoiceDetail, InvoiceLine};
