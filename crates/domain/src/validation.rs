//! Field-level validation rules.

use common::Money;
use thiserror::Error;

/// A single rejected field value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required text field is missing or blank.
    #[error("{field} is required")]
    Required { field: &'static str },

    /// A text field exceeds its column length.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// A count or amount is below zero.
    #[error("{field} must not be negative")]
    Negative { field: &'static str },

    /// Email address without an `@`.
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// Invoice has no lines.
    #[error("Invoice must have at least one item")]
    NoItems,

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// A computed amount does not fit in the money range.
    #[error("{field} is too large")]
    AmountTooLarge { field: &'static str },
}

pub(crate) const NAME_MAX: usize = 255;
pub(crate) const SKU_MAX: usize = 100;
pub(crate) const CATEGORY_MAX: usize = 100;
pub(crate) const EMAIL_MAX: usize = 255;
pub(crate) const PHONE_MAX: usize = 50;
pub(crate) const REGION_MAX: usize = 100;
pub(crate) const ZIP_CODE_MAX: usize = 20;
pub(crate) const INVOICE_NUMBER_MAX: usize = 50;

/// Trims a required text value and checks its length.
pub(crate) fn required(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required { field });
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(value.to_string())
}

/// Trims an optional text value. Blank text becomes `None`.
pub(crate) fn optional(
    field: &'static str,
    value: Option<&str>,
    max: Option<usize>,
) -> Result<Option<String>, ValidationError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if let Some(max) = max
        && value.chars().count() > max
    {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(Some(value.to_string()))
}

pub(crate) fn email(value: Option<&str>) -> Result<Option<String>, ValidationError> {
    let email = optional("email", value, Some(EMAIL_MAX))?;
    match email {
        Some(email) if !email.contains('@') => Err(ValidationError::InvalidEmail(email)),
        other => Ok(other),
    }
}

pub(crate) fn non_negative_money(field: &'static str, value: Money) -> Result<Money, ValidationError> {
    if value.is_negative() {
        Err(ValidationError::Negative { field })
    } else {
        Ok(value)
    }
}

pub(crate) fn non_negative_count(field: &'static str, value: i32) -> Result<i32, ValidationError> {
    if value < 0 {
        Err(ValidationError::Negative { field })
    } else {
        Ok(value)
    }
}

pub(crate) fn quantity(quantity: u32) -> Result<u32, ValidationError> {
    if quantity == 0 {
        Err(ValidationError::InvalidQuantity { quantity })
    } else {
        Ok(quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("name", "  Widget ", 10).unwrap(), "Widget");
        assert_eq!(
            required("name", "   ", 10),
            Err(ValidationError::Required { field: "name" })
        );
        assert_eq!(
            required("sku", "ABCDEFGHIJK", 10),
            Err(ValidationError::TooLong { field: "sku", max: 10 })
        );
    }

    #[test]
    fn optional_blank_is_none() {
        assert_eq!(optional("city", Some("  "), Some(5)).unwrap(), None);
        assert_eq!(optional("city", None, Some(5)).unwrap(), None);
        assert_eq!(
            optional("city", Some(" Paris "), Some(5)).unwrap().as_deref(),
            Some("Paris")
        );
        assert!(optional("city", Some("Barcelona"), Some(5)).is_err());
        assert!(optional("notes", Some(&"x".repeat(10_000)), None).is_ok());
    }

    #[test]
    fn email_needs_at_sign() {
        assert!(email(Some("jane@example.com")).is_ok());
        assert_eq!(
            email(Some("jane.example.com")),
            Err(ValidationError::InvalidEmail("jane.example.com".to_string()))
        );
        assert_eq!(email(Some("")).unwrap(), None);
    }

    #[test]
    fn numbers_must_not_be_negative() {
        assert!(non_negative_money("price", Money::zero()).is_ok());
        assert!(non_negative_money("price", Money::from_cents(-1)).is_err());
        assert!(non_negative_count("stock", -1).is_err());
        assert!(quantity(0).is_err());
        assert_eq!(quantity(3), Ok(3));
    }
}
