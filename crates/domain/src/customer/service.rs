//! Customer service.

use chrono::Utc;
use common::{CustomerId, Page};
use store::{Customer, InventoryStore, InventoryStoreExt, ListQuery, StoreError};

use crate::UPDATE_ATTEMPTS;
use crate::error::DomainError;

use super::{CustomerChanges, NewCustomer};

/// Service for managing customers.
pub struct CustomerService<S: InventoryStore> {
    store: S,
}

impl<S: InventoryStore> CustomerService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self, query: &ListQuery) -> Result<Page<Customer>, DomainError> {
        Ok(self.store.list_customers(query).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: CustomerId) -> Result<Option<Customer>, DomainError> {
        Ok(self.store.get_customer(id).await?)
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn create(&self, input: NewCustomer) -> Result<Customer, DomainError> {
        let customer = input.into_customer(Utc::now())?;
        let customer = self.store.insert_customer(customer).await?;

        metrics::counter!("customers_created_total").increment(1);
        tracing::info!(customer_id = %customer.id, "Customer created");

        Ok(customer)
    }

    /// Applies a partial update to the latest stored version, re-reading if
    /// the customer changes underneath.
    #[tracing::instrument(skip(self, changes))]
    pub async fn update(
        &self,
        id: CustomerId,
        changes: CustomerChanges,
    ) -> Result<Customer, DomainError> {
        let mut attempt = 1;
        loop {
            let mut customer = self.store.require_customer(id).await?;
            let expected = customer.updated_at;
            changes.clone().apply(&mut customer, Utc::now())?;

            match self.store.update_customer(customer, expected).await {
                Err(StoreError::ConcurrencyConflict { .. }) if attempt < UPDATE_ATTEMPTS => {
                    tracing::debug!(attempt, "customer changed during update, retrying");
                    attempt += 1;
                }
                result => return Ok(result?),
            }
        }
    }

    /// Returns false if the customer did not exist.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: CustomerId) -> Result<bool, DomainError> {
        Ok(self.store.delete_customer(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use store::InMemoryStore;

    use super::*;

    #[tokio::test]
    async fn deleted_customer_disappears_from_list() {
        let service = CustomerService::new(InMemoryStore::new());
        let jane = service.create(NewCustomer::new("Jane")).await.unwrap();
        service.create(NewCustomer::new("John")).await.unwrap();

        assert!(service.delete(jane.id).await.unwrap());
        assert!(!service.delete(jane.id).await.unwrap());

        let page = service.list(&ListQuery::new()).await.unwrap();
        assert_eq!(page.total, 1);
        assert!(page.items.iter().all(|c| c.id != jane.id));
    }

    #[tokio::test]
    async fn update_rejects_invalid_email() {
        let service = CustomerService::new(InMemoryStore::new());
        let jane = service.create(NewCustomer::new("Jane")).await.unwrap();

        let result = service
            .update(
                jane.id,
                CustomerChanges {
                    email: Some("not-an-email".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
