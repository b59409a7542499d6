//! Invoice inputs.

use chrono::{DateTime, Utc};
use common::{CustomerId, Money, ProductId};
use serde::Deserialize;
use store::InvoiceStatus;

use crate::validation::{self, INVOICE_NUMBER_MAX, ValidationError, non_negative_money};

/// Input for creating an invoice.
#[derive(Debug, Clone, Deserialize)]
pub struct NewInvoice {
    pub customer_id: CustomerId,
    /// Assigned from the invoice sequence when absent.
    pub invoice_number: Option<String>,
    /// Defaults to the time of creation.
    pub issue_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<InvoiceStatus>,
    /// Overrides the configured tax rate when present.
    pub tax: Option<Money>,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<NewInvoiceLine>,
}

/// One requested invoice line.
#[derive(Debug, Clone, Deserialize)]
pub struct NewInvoiceLine {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Defaults to the product's current price.
    pub unit_price: Option<Money>,
}

impl NewInvoice {
    pub fn new(customer_id: CustomerId) -> Self {
        Self {
            customer_id,
            invoice_number: None,
            issue_date: None,
            due_date: None,
            status: None,
            tax: None,
            notes: None,
            items: Vec::new(),
        }
    }

    pub fn item(mut self, product_id: ProductId, quantity: u32) -> Self {
        self.items.push(NewInvoiceLine {
            product_id,
            quantity,
            unit_price: None,
        });
        self
    }

    pub fn priced_item(mut self, product_id: ProductId, quantity: u32, unit_price: Money) -> Self {
        self.items.push(NewInvoiceLine {
            product_id,
            quantity,
            unit_price: Some(unit_price),
        });
        self
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.invoice_number = Some(number.into());
        self
    }

    pub fn with_tax(mut self, tax: Money) -> Self {
        self.tax = Some(tax);
        self
    }

    /// Checks everything that does not need the store and normalizes text.
    pub(crate) fn validate(mut self) -> Result<Self, ValidationError> {
        if self.items.is_empty() {
            return Err(ValidationError::NoItems);
        }
        for line in &self.items {
            validation::quantity(line.quantity)?;
            if let Some(price) = line.unit_price {
                non_negative_money("unit_price", price)?;
            }
        }
        if let Some(tax) = self.tax {
            non_negative_money("tax", tax)?;
        }
        self.invoice_number = match self.invoice_number.take() {
            Some(number) => Some(validation::required(
                "invoice_number",
                &number,
                INVOICE_NUMBER_MAX,
            )?),
            None => None,
        };
        self.notes = validation::optional("notes", self.notes.as_deref(), None)?;
        Ok(self)
    }
}

/// Partial invoice header update. Lines cannot be changed after creation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceChanges {
    pub customer_id: Option<CustomerId>,
    pub issue_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<InvoiceStatus>,
    /// Replaces the tax amount; the total is recomputed.
    pub tax: Option<Money>,
    pub notes: Option<String>,
}
