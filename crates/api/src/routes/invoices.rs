//! Invoice endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use common::Page;
use domain::{InvoiceChanges, InvoiceDetail, NewInvoice};
use serde::{Deserialize, Serialize};
use store::{InventoryStore, InvoiceId, InvoiceQuery, InvoiceStatus};

use super::{ListParams, parse_id};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::ApiJson;

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: InvoiceStatus,
}

#[derive(Serialize)]
pub struct NextNumberResponse {
    pub invoice_number: String,
}

fn parse_invoice_id(id: &str) -> Result<InvoiceId, ApiError> {
    parse_id(id, "invoice")
}

fn invoice_query(params: &ListParams) -> Result<InvoiceQuery, ApiError> {
    let mut query = InvoiceQuery {
        list: params.query(),
        status: None,
    };
    if let Some(status) = params.status.as_deref().map(str::trim)
        && !status.is_empty()
    {
        let status = status
            .parse::<InvoiceStatus>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        query = query.status(status);
    }
    Ok(query)
}

/// GET /api/invoices: search on number, optional exact status filter.
#[tracing::instrument(skip(state))]
pub async fn list<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<InvoiceDetail>>, ApiError> {
    let query = invoice_query(&params)?;
    Ok(Json(state.invoices.list(&query).await?))
}

/// GET /api/invoices/next-number
#[tracing::instrument(skip(state))]
pub async fn next_number<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<NextNumberResponse>, ApiError> {
    let invoice_number = state.invoices.next_number().await?;
    Ok(Json(NextNumberResponse { invoice_number }))
}

/// GET /api/invoices/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<InvoiceDetail>, ApiError> {
    let id = parse_invoice_id(&id)?;
    state
        .invoices
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Invoice"))
}

/// POST /api/invoices: totals are computed here, stock is decremented.
#[tracing::instrument(skip(state, input))]
pub async fn create<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(input): ApiJson<NewInvoice>,
) -> Result<(StatusCode, Json<InvoiceDetail>), ApiError> {
    let invoice = state
        .invoices
        .create(input, user.id_or_anonymous())
        .await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// PUT /api/invoices/{id}: header fields only.
#[tracing::instrument(skip(state, changes))]
pub async fn update<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    ApiJson(changes): ApiJson<InvoiceChanges>,
) -> Result<Json<InvoiceDetail>, ApiError> {
    let id = parse_invoice_id(&id)?;
    Ok(Json(state.invoices.update(id, changes).await?))
}

/// PATCH /api/invoices/{id}/status
#[tracing::instrument(skip(state))]
pub async fn update_status<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StatusUpdateRequest>,
) -> Result<Json<InvoiceDetail>, ApiError> {
    let id = parse_invoice_id(&id)?;
    Ok(Json(state.invoices.update_status(id, req.status).await?))
}

/// DELETE /api/invoices/{id}: stock is not restored.
#[tracing::instrument(skip(state))]
pub async fn delete<S: InventoryStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_invoice_id(&id)?;
    if state.invoices.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Invoice"))
    }
}
