//! Customer records.

mod commands;
mod service;

pub use commands::{CustomerChanges, NewCustomer};
pub use service::CustomerService;
