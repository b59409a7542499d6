//! Invoice service providing creation, population and header updates.

use chrono::Utc;
use common::{InvoiceId, Page};
use store::model::PRODUCT;
use store::{
    Invoice, InvoiceItem, InvoiceQuery, InvoiceStatus, InventoryStore, InventoryStoreExt,
    StoreError,
};

use crate::UPDATE_ATTEMPTS;
use crate::error::DomainError;
use crate::validation::{self, ValidationError, non_negative_money};

use super::numbering::next_invoice_number;
use super::totals::{DEFAULT_TAX_RATE_BPS, InvoiceTotals};
use super::view::{References, referenced_ids};
use super::{InvoiceChanges, InvoiceDetail, NewInvoice};

/// Service for managing invoices.
///
/// Creation computes line and invoice totals on the server, assigns the next
/// invoice number when none is given, and decrements stock in the same
/// store write as the insert.
pub struct InvoiceService<S: InventoryStore> {
    store: S,
    tax_rate_bps: u32,
}

impl<S: InventoryStore> InvoiceService<S> {
    /// Creates a service using the default tax rate.
    pub fn new(store: S) -> Self {
        Self::with_tax_rate(store, DEFAULT_TAX_RATE_BPS)
    }

    /// Creates a service applying `tax_rate_bps` when an invoice has no
    /// explicit tax.
    pub fn with_tax_rate(store: S, tax_rate_bps: u32) -> Self {
        Self {
            store,
            tax_rate_bps,
        }
    }

    pub fn tax_rate_bps(&self) -> u32 {
        self.tax_rate_bps
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self, query: &InvoiceQuery) -> Result<Page<InvoiceDetail>, DomainError> {
        let page = self.store.list_invoices(query).await?;
        let references = self.load_references(&page.items).await?;
        Ok(page.map(|invoice| references.detail(invoice)))
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: InvoiceId) -> Result<Option<InvoiceDetail>, DomainError> {
        match self.store.get_invoice(id).await? {
            Some(invoice) => Ok(Some(self.populate(invoice).await?)),
            None => Ok(None),
        }
    }

    /// The number the next auto-numbered invoice would receive.
    #[tracing::instrument(skip(self))]
    pub async fn next_number(&self) -> Result<String, DomainError> {
        let latest = self.store.latest_invoice_number().await?;
        Ok(next_invoice_number(latest.as_deref()))
    }

    /// Creates an invoice issued by `user_id`.
    #[tracing::instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create(
        &self,
        input: NewInvoice,
        user_id: &str,
    ) -> Result<InvoiceDetail, DomainError> {
        let input = input.validate()?;
        let customer = self.store.require_customer(input.customer_id).await?;

        let mut product_ids: Vec<_> = input.items.iter().map(|line| line.product_id).collect();
        product_ids.sort();
        product_ids.dedup();
        let products = self.store.get_products_by_ids(&product_ids).await?;
        let references = References::new([customer], products);

        let items = input
            .items
            .iter()
            .map(|line| {
                let product = references
                    .product(line.product_id)
                    .ok_or_else(|| DomainError::not_found(PRODUCT, line.product_id))?;
                let unit_price = line.unit_price.unwrap_or(product.price);
                unit_price
                    .checked_multiply(line.quantity)
                    .ok_or(ValidationError::AmountTooLarge { field: "item total" })?;
                Ok::<_, DomainError>(InvoiceItem::new(line.product_id, line.quantity, unit_price))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let totals = InvoiceTotals::for_items(&items, input.tax, self.tax_rate_bps)?;

        let now = Utc::now();
        let invoice = Invoice {
            id: InvoiceId::new(),
            invoice_number: input.invoice_number.clone().unwrap_or_default(),
            customer_id: input.customer_id,
            user_id: user_id.to_string(),
            issue_date: input.issue_date.unwrap_or(now),
            due_date: input.due_date,
            subtotal: totals.subtotal,
            tax: totals.tax,
            total: totals.total,
            status: input.status.unwrap_or_default(),
            notes: input.notes,
            items,
            created_at: now,
            updated_at: now,
        };

        let invoice = match input.invoice_number {
            Some(_) => self.store.insert_invoice(invoice).await?,
            // Numbered by the store so concurrent creates never share a number.
            None => {
                self.store
                    .insert_numbered_invoice(invoice, next_invoice_number)
                    .await?
            }
        };

        metrics::counter!("invoices_created_total").increment(1);
        metrics::histogram!("invoice_total_cents").record(invoice.total.cents() as f64);
        tracing::info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            total = %invoice.total,
            "Invoice created"
        );

        Ok(references.detail(invoice))
    }

    /// Updates header fields. A new tax amount recomputes the total.
    ///
    /// The changes are applied to the latest stored version, so a concurrent
    /// status change is never reverted.
    #[tracing::instrument(skip(self, changes))]
    pub async fn update(
        &self,
        id: InvoiceId,
        changes: InvoiceChanges,
    ) -> Result<InvoiceDetail, DomainError> {
        if let Some(customer_id) = changes.customer_id {
            self.store.require_customer(customer_id).await?;
        }
        let notes = match &changes.notes {
            Some(notes) => Some(validation::optional("notes", Some(notes.as_str()), None)?),
            None => None,
        };
        let tax = changes
            .tax
            .map(|tax| non_negative_money("tax", tax))
            .transpose()?;

        let mut attempt = 1;
        loop {
            let mut invoice = self.store.require_invoice(id).await?;
            let expected = invoice.updated_at;

            if let Some(customer_id) = changes.customer_id {
                invoice.customer_id = customer_id;
            }
            if let Some(issue_date) = changes.issue_date {
                invoice.issue_date = issue_date;
            }
            if let Some(due_date) = changes.due_date {
                invoice.due_date = Some(due_date);
            }
            if let Some(status) = changes.status {
                invoice.status = status;
            }
            if let Some(notes) = &notes {
                invoice.notes = notes.clone();
            }
            if let Some(tax) = tax {
                let totals = InvoiceTotals::new(invoice.subtotal, tax)?;
                invoice.tax = totals.tax;
                invoice.total = totals.total;
            }
            invoice.updated_at = Utc::now();

            match self.store.update_invoice(invoice, expected).await {
                Err(StoreError::ConcurrencyConflict { .. }) if attempt < UPDATE_ATTEMPTS => {
                    tracing::debug!(attempt, "invoice changed during update, retrying");
                    attempt += 1;
                }
                result => return self.populate(result?).await,
            }
        }
    }

    /// Sets the status. Any status may follow any other.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: InvoiceId,
        status: InvoiceStatus,
    ) -> Result<InvoiceDetail, DomainError> {
        let changes = InvoiceChanges {
            status: Some(status),
            ..Default::default()
        };
        self.update(id, changes).await
    }

    /// Returns false if the invoice did not exist. Stock is not restored.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: InvoiceId) -> Result<bool, DomainError> {
        Ok(self.store.delete_invoice(id).await?)
    }

    async fn populate(&self, invoice: Invoice) -> Result<InvoiceDetail, DomainError> {
        let references = self.load_references(std::slice::from_ref(&invoice)).await?;
        Ok(references.detail(invoice))
    }

    async fn load_references(&self, invoices: &[Invoice]) -> Result<References, DomainError> {
        if invoices.is_empty() {
            return Ok(References::default());
        }
        let (customer_ids, product_ids) = referenced_ids(invoices);
        let customers = self.store.get_customers_by_ids(&customer_ids).await?;
        let products = self.store.get_products_by_ids(&product_ids).await?;
        Ok(References::new(customers, products))
    }
}
