//! Dashboard endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use store::{DashboardStats, InventoryStore};

use crate::AppState;
use crate::error::ApiError;

/// GET /api/dashboard/stats
#[tracing::instrument(skip(state))]
pub async fn stats<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<DashboardStats>, ApiError> {
    Ok(Json(state.dashboard.stats().await?))
}
