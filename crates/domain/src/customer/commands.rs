//! Customer inputs.

use chrono::{DateTime, Utc};
use common::CustomerId;
use serde::Deserialize;
use store::Customer;

use crate::validation::{self, NAME_MAX, PHONE_MAX, REGION_MAX, ValidationError, ZIP_CODE_MAX};

/// Input for creating a customer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

impl NewCustomer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub(crate) fn into_customer(self, now: DateTime<Utc>) -> Result<Customer, ValidationError> {
        Ok(Customer {
            id: CustomerId::new(),
            name: validation::required("name", &self.name, NAME_MAX)?,
            email: validation::email(self.email.as_deref())?,
            phone: validation::optional("phone", self.phone.as_deref(), Some(PHONE_MAX))?,
            address: validation::optional("address", self.address.as_deref(), None)?,
            city: validation::optional("city", self.city.as_deref(), Some(REGION_MAX))?,
            state: validation::optional("state", self.state.as_deref(), Some(REGION_MAX))?,
            zip_code: validation::optional("zip_code", self.zip_code.as_deref(), Some(ZIP_CODE_MAX))?,
            country: validation::optional("country", self.country.as_deref(), Some(REGION_MAX))?,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial customer update. Blank text clears an optional field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

impl CustomerChanges {
    pub(crate) fn apply(
        self,
        customer: &mut Customer,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        if let Some(name) = self.name {
            customer.name = validation::required("name", &name, NAME_MAX)?;
        }
        if let Some(email) = self.email {
            customer.email = validation::email(Some(&email))?;
        }

        let optional_fields = [
            (&mut customer.phone, self.phone, "phone", Some(PHONE_MAX)),
            (&mut customer.address, self.address, "address", None),
            (&mut customer.city, self.city, "city", Some(REGION_MAX)),
            (&mut customer.state, self.state, "state", Some(REGION_MAX)),
            (&mut customer.zip_code, self.zip_code, "zip_code", Some(ZIP_CODE_MAX)),
            (&mut customer.country, self.country, "country", Some(REGION_MAX)),
        ];
        for (slot, value, field, max) in optional_fields {
            if let Some(value) = value {
                *slot = validation::optional(field, Some(&value), max)?;
            }
        }

        customer.updated_at = now;
        Ok(())
    }
}
