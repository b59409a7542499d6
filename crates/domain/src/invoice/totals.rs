use common::Money;
use serde::Serialize;
use store::InvoiceItem;

use crate::validation::ValidationError;

/// Default tax rate in basis points (10%).
pub const DEFAULT_TAX_RATE_BPS: u32 = 1_000;

/// Subtotal, tax and total of an invoice. `total` is always
/// `subtotal + tax`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

impl InvoiceTotals {
    pub fn new(subtotal: Money, tax: Money) -> Result<Self, ValidationError> {
        let total = subtotal
            .checked_add(tax)
            .ok_or(ValidationError::AmountTooLarge { field: "total" })?;
        Ok(Self {
            subtotal,
            tax,
            total,
        })
    }

    /// Sums line totals. Tax is `explicit_tax` when given, otherwise the
    /// subtotal at `tax_rate_bps`.
    pub fn for_items(
        items: &[InvoiceItem],
        explicit_tax: Option<Money>,
        tax_rate_bps: u32,
    ) -> Result<Self, ValidationError> {
        let subtotal = items
            .iter()
            .try_fold(Money::zero(), |sum, item| sum.checked_add(item.total))
            .ok_or(ValidationError::AmountTooLarge { field: "subtotal" })?;
        let tax = match explicit_tax {
            Some(tax) => tax,
            None => subtotal
                .checked_percentage(tax_rate_bps)
                .ok_or(ValidationError::AmountTooLarge { field: "tax" })?,
        };
        Self::new(subtotal, tax)
    }
}
