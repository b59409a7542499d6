//! Product catalog and stock endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::Page;
use domain::{NewProduct, ProductChanges, ProductWithStock};
use serde::Deserialize;
use store::{InventoryStore, ProductId};

use super::{ListParams, parse_id};
use crate::AppState;
use crate::error::ApiError;
use crate::extract::ApiJson;

#[derive(Debug, Deserialize)]
pub struct StockAdjustmentRequest {
    pub delta: i32,
}

fn parse_product_id(id: &str) -> Result<ProductId, ApiError> {
    parse_id(id, "product")
}

/// GET /api/products: newest first, filtered by name.
#[tracing::instrument(skip(state))]
pub async fn list<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<ProductWithStock>>, ApiError> {
    Ok(Json(state.products.list(&params.query()).await?))
}

/// GET /api/products/low-stock
#[tracing::instrument(skip(state))]
pub async fn low_stock<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<ProductWithStock>>, ApiError> {
    Ok(Json(state.products.low_stock().await?))
}

/// GET /api/products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductWithStock>, ApiError> {
    let id = parse_product_id(&id)?;
    state
        .products
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Product"))
}

/// POST /api/products
#[tracing::instrument(skip(state, input))]
pub async fn create<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(input): ApiJson<NewProduct>,
) -> Result<(StatusCode, Json<ProductWithStock>), ApiError> {
    let product = state.products.create(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/products/{id}: partial update.
#[tracing::instrument(skip(state, changes))]
pub async fn update<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    ApiJson(changes): ApiJson<ProductChanges>,
) -> Result<Json<ProductWithStock>, ApiError> {
    let id = parse_product_id(&id)?;
    Ok(Json(state.products.update(id, changes).await?))
}

/// DELETE /api/products/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_product_id(&id)?;
    if state.products.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Product"))
    }
}

/// POST /api/products/{id}/stock: add (or with a negative delta, remove) units.
#[tracing::instrument(skip(state))]
pub async fn adjust_stock<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StockAdjustmentRequest>,
) -> Result<Json<ProductWithStock>, ApiError> {
    let id = parse_product_id(&id)?;
    Ok(Json(state.products.adjust_stock(id, req.delta).await?))
}
