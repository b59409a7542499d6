//! Invoices with their customer and product references resolved.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{CustomerId, InvoiceId, Money, ProductId};
use serde::Serialize;
use store::{Customer, Invoice, InvoiceStatus, Product};

/// Invoice response with the customer record and product names attached.
///
/// `customer` is `None` only if the record vanished between reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceDetail {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub customer_id: CustomerId,
    pub customer: Option<Customer>,
    pub user_id: String,
    pub issue_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    pub items: Vec<InvoiceLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceLine {
    pub product_id: ProductId,
    pub product_name: Option<String>,
    pub sku: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub total: Money,
}

/// Customers and products looked up for a batch of invoices.
#[derive(Debug, Default)]
pub(crate) struct References {
    customers: HashMap<CustomerId, Customer>,
    products: HashMap<ProductId, Product>,
}

impl References {
    pub(crate) fn new(
        customers: impl IntoIterator<Item = Customer>,
        products: impl IntoIterator<Item = Product>,
    ) -> Self {
        Self {
            customers: customers.into_iter().map(|c| (c.id, c)).collect(),
            products: products.into_iter().map(|p| (p.id, p)).collect(),
        }
    }

    pub(crate) fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id)
    }

    pub(crate) fn detail(&self, invoice: Invoice) -> InvoiceDetail {
        let items = invoice
            .items
            .into_iter()
            .map(|item| {
                let product = self.products.get(&item.product_id);
                InvoiceLine {
                    product_id: item.product_id,
                    product_name: product.map(|p| p.name.clone()),
                    sku: product.map(|p| p.sku.clone()),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    total: item.total,
                }
            })
            .collect();

        InvoiceDetail {
            id: invoice.id,
            invoice_number: invoice.invoice_number,
            customer_id: invoice.customer_id,
            customer: self.customers.get(&invoice.customer_id).cloned(),
            user_id: invoice.user_id,
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            subtotal: invoice.subtotal,
            tax: invoice.tax,
            total: invoice.total,
            status: invoice.status,
            notes: invoice.notes,
            items,
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
        }
    }
}

/// Distinct customer and product ids referenced by `invoices`.
pub(crate) fn referenced_ids(invoices: &[Invoice]) -> (Vec<CustomerId>, Vec<ProductId>) {
    let mut customers: Vec<CustomerId> = invoices.iter().map(|i| i.customer_id).collect();
    let mut products: Vec<ProductId> = invoices
        .iter()
        .flat_map(|i| i.items.iter().map(|item| item.product_id))
        .collect();
    customers.sort();
    customers.dedup();
    products.sort();
    products.dedup();
    (customers, products)
}
