//! Customer endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::Page;
use domain::{CustomerChanges, NewCustomer};
use store::{Customer, CustomerId, InventoryStore};

use super::{ListParams, parse_id};
use crate::AppState;
use crate::error::ApiError;
use crate::extract::ApiJson;

fn parse_customer_id(id: &str) -> Result<CustomerId, ApiError> {
    parse_id(id, "customer")
}

/// GET /api/customers
#[tracing::instrument(skip(state))]
pub async fn list<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Customer>>, ApiError> {
    Ok(Json(state.customers.list(&params.query()).await?))
}

/// GET /api/customers/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Customer>, ApiError> {
    let id = parse_customer_id(&id)?;
    state
        .customers
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Customer"))
}

/// POST /api/customers
#[tracing::instrument(skip(state, input))]
pub async fn create<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(input): ApiJson<NewCustomer>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    let customer = state.customers.create(input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// PUT /api/customers/{id}
#[tracing::instrument(skip(state, changes))]
pub async fn update<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    ApiJson(changes): ApiJson<CustomerChanges>,
) -> Result<Json<Customer>, ApiError> {
    let id = parse_customer_id(&id)?;
    Ok(Json(state.customers.update(id, changes).await?))
}

/// DELETE /api/customers/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_customer_id(&id)?;
    if state.customers.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Customer"))
    }
}
