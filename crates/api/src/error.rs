//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// No authenticated user.
    Unauthorized(String),
    /// Domain logic error.
    Domain(DomainError),
}

impl ApiError {
    pub fn not_found(entity: &str) -> Self {
        ApiError::NotFound(format!("{entity} not found"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        DomainError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        DomainError::Store(store_err) => match store_err {
            StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
            StoreError::DuplicateSku(_)
            | StoreError::DuplicateInvoiceNumber(_)
            | StoreError::InsufficientStock { .. }
            | StoreError::ConcurrencyConflict { .. }
            | StoreError::Referenced { .. } => (StatusCode::CONFLICT, err.to_string()),
            StoreError::Database(_) | StoreError::Migration(_) => {
                tracing::error!(error = %err, "store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        },
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

#[cfg(test)]
mod tests {
    use domain::ValidationError;
    use store::ProductId;

    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn domain_errors_map_to_status_codes() {
        assert_eq!(
            status_of(DomainError::Validation(ValidationError::NoItems).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(DomainError::Store(StoreError::DuplicateSku("WH001".to_string())).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(
                DomainError::Store(StoreError::InsufficientStock {
                    product_id: ProductId::new(),
                    requested: 5,
                    available: 1,
                })
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(
                DomainError::Store(StoreError::NotFound {
                    entity: "Customer",
                    id: "x".to_string(),
                })
                .into()
            ),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(
                DomainError::Store(StoreError::ConcurrencyConflict {
                    entity: "Product",
                    id: "x".to_string(),
                })
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(
                DomainError::Validation(ValidationError::AmountTooLarge { field: "total" }).into()
            ),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::Unauthorized("Unauthorized".to_string())),
            StatusCode::UNAUTHORIZED
        );
    }
}
