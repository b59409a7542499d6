//! Current user endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::{Extension, Json};
use store::{InventoryStore, User};

use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;

/// GET /api/auth/user
#[tracing::instrument(skip(state))]
pub async fn current_user<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<User>, ApiError> {
    let id = user
        .id()
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized".to_string()))?;
    state
        .users
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User"))
}
