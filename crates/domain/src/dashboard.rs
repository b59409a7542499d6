//! Dashboard aggregates.

use store::{DashboardStats, InventoryStore};

use crate::error::DomainError;

pub struct DashboardService<S: InventoryStore> {
    store: S,
}

impl<S: InventoryStore> DashboardService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Counts, paid revenue and low-stock total across the whole store.
    #[tracing::instrument(skip(self))]
    pub async fn stats(&self) -> Result<DashboardStats, DomainError> {
        Ok(self.store.dashboard_stats().await?)
    }
}
