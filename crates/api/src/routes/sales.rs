//! Point-of-sale endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use domain::{Sale, SaleReceipt};
use store::InventoryStore;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::ApiJson;

/// POST /api/sales: sell units straight from stock.
#[tracing::instrument(skip(state))]
pub async fn create<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(sale): ApiJson<Sale>,
) -> Result<Json<SaleReceipt>, ApiError> {
    Ok(Json(state.products.sell(sale).await?))
}
