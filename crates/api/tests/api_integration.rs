//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::AppState;
use api::auth::AuthMode;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::InMemoryStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

async fn setup_with_mode(mode: AuthMode) -> axum::Router {
    let state = Arc::new(AppState::new(InMemoryStore::new(), 1_000, mode));
    api::seed_demo_user(&state).await.unwrap();
    api::create_app(state, get_metrics_handle())
}

async fn setup() -> axum::Router {
    setup_with_mode(AuthMode::Demo).await
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_product(app: &axum::Router, sku: &str, price: i64, stock: i32) -> Value {
    let (status, json) = send(
        app,
        "POST",
        "/api/products",
        Some(json!({
            "name": format!("Product {sku}"),
            "sku": sku,
            "price": price,
            "stock": stock,
            "min_stock": 5
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json
}

async fn create_customer(app: &axum::Router, name: &str) -> Value {
    let (status, json) = send(
        app,
        "POST",
        "/api/customers",
        Some(json!({ "name": name, "email": format!("{}@example.com", name.to_lowercase()) })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json
}

#[tokio::test]
async fn test_health_check() {
    let app = setup().await;
    let (status, json) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup().await;
    create_product(&app, "MET-1", 100, 1).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("products_created_total"));
}

mod products {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get_product() {
        let app = setup().await;
        let created = create_product(&app, "WH001", 9999, 25).await;
        assert_eq!(created["stock_status"], "in_stock");

        let id = created["id"].as_str().unwrap();
        let (status, json) = send(&app, "GET", &format!("/api/products/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["sku"], "WH001");
        assert_eq!(json["price"], 9999);
    }

    #[tokio::test]
    async fn test_duplicate_sku_conflicts() {
        let app = setup().await;
        create_product(&app, "WH001", 9999, 25).await;

        let (status, json) = send(
            &app,
            "POST",
            "/api/products",
            Some(json!({ "name": "Other", "sku": "WH001", "price": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(json["error"].as_str().unwrap().contains("WH001"));
    }

    #[tokio::test]
    async fn test_validation_errors_are_bad_requests() {
        let app = setup().await;
        let (status, json) = send(
            &app,
            "POST",
            "/api/products",
            Some(json!({ "name": "  ", "sku": "X-1", "price": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("name"));
    }

    #[tokio::test]
    async fn test_invalid_and_unknown_ids() {
        let app = setup().await;
        let (status, _) = send(&app, "GET", "/api/products/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let missing = store::ProductId::new();
        let (status, json) = send(&app, "GET", &format!("/api/products/{missing}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Product not found");

        let (status, _) = send(&app, "DELETE", &format!("/api/products/{missing}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_search_and_paging() {
        let app = setup().await;
        for n in 0..3 {
            create_product(&app, &format!("CAB-{n}"), 100, 10).await;
        }
        create_product(&app, "OTHER", 100, 10).await;

        let (status, json) = send(&app, "GET", "/api/products?search=cab&limit=2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total"], 3);
        assert_eq!(json["items"].as_array().unwrap().len(), 2);
        assert_eq!(json["total_pages"], 2);
        assert_eq!(json["page"], 1);

        let (_, json) = send(&app, "GET", "/api/products?page=0&limit=0", None).await;
        assert_eq!(json["page"], 1);
        assert_eq!(json["limit"], 1);
    }

    #[tokio::test]
    async fn test_update_stock_and_low_stock() {
        let app = setup().await;
        let created = create_product(&app, "LS002", 4999, 15).await;
        let id = created["id"].as_str().unwrap();

        let (status, json) = send(
            &app,
            "PUT",
            &format!("/api/products/{id}"),
            Some(json!({ "price": 3999 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["price"], 3999);
        assert_eq!(json["sku"], "LS002");

        let (status, json) = send(
            &app,
            "POST",
            &format!("/api/products/{id}/stock"),
            Some(json!({ "delta": -12 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["stock"], 3);
        assert_eq!(json["stock_status"], "low_stock");

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/products/{id}/stock"),
            Some(json!({ "delta": -4 })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, json) = send(&app, "GET", "/api/products/low-stock", None).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
    }
}

mod customers {
    use super::*;

    #[tokio::test]
    async fn test_deleted_customer_leaves_list() {
        let app = setup().await;
        let jane = create_customer(&app, "Jane").await;
        create_customer(&app, "John").await;
        let id = jane["id"].as_str().unwrap();

        let (status, _) = send(&app, "DELETE", &format!("/api/customers/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, json) = send(&app, "GET", "/api/customers", None).await;
        assert_eq!(json["total"], 1);
        assert_eq!(json["items"][0]["name"], "John");
    }

    #[tokio::test]
    async fn test_invalid_email_is_rejected() {
        let app = setup().await;
        let (status, _) = send(
            &app,
            "POST",
            "/api/customers",
            Some(json!({ "name": "Jane", "email": "jane.example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

mod invoices {
    use super::*;

    #[tokio::test]
    async fn test_invoice_lifecycle() {
        let app = setup().await;
        let customer = create_customer(&app, "Jane").await;
        let product = create_product(&app, "WH001", 5000, 10).await;
        let product_id = product["id"].as_str().unwrap();

        let (_, json) = send(&app, "GET", "/api/invoices/next-number", None).await;
        assert_eq!(json["invoice_number"], "INV-0001");

        let (status, invoice) = send(
            &app,
            "POST",
            "/api/invoices",
            Some(json!({
                "customer_id": customer["id"],
                "items": [{ "product_id": product_id, "quantity": 2 }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(invoice["invoice_number"], "INV-0001");
        assert_eq!(invoice["subtotal"], 10_000);
        assert_eq!(invoice["tax"], 1_000);
        assert_eq!(invoice["total"], 11_000);
        assert_eq!(invoice["status"], "pending");
        assert_eq!(invoice["user_id"], "demo-user-1");
        assert_eq!(invoice["customer"]["name"], "Jane");
        assert_eq!(invoice["items"][0]["sku"], "WH001");

        let (_, json) = send(&app, "GET", &format!("/api/products/{product_id}"), None).await;
        assert_eq!(json["stock"], 8);

        let id = invoice["id"].as_str().unwrap();
        let (status, json) = send(
            &app,
            "PATCH",
            &format!("/api/invoices/{id}/status"),
            Some(json!({ "status": "paid" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "paid");

        let (_, stats) = send(&app, "GET", "/api/dashboard/stats", None).await;
        assert_eq!(stats["total_invoices"], 1);
        assert_eq!(stats["total_revenue"], 11_000);
        assert_eq!(stats["pending_invoices"], 0);

        let (_, json) = send(&app, "GET", "/api/invoices?status=paid", None).await;
        assert_eq!(json["total"], 1);

        let (status, _) = send(&app, "DELETE", &format!("/api/invoices/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &format!("/api/invoices/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_insufficient_stock_conflicts() {
        let app = setup().await;
        let customer = create_customer(&app, "Jane").await;
        let product = create_product(&app, "DCK-1", 9000, 1).await;

        let (status, json) = send(
            &app,
            "POST",
            "/api/invoices",
            Some(json!({
                "customer_id": customer["id"],
                "items": [{ "product_id": product["id"], "quantity": 2 }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(json["error"].as_str().unwrap().contains("Insufficient stock"));
    }

    #[tokio::test]
    async fn test_empty_invoice_and_unknown_status() {
        let app = setup().await;
        let customer = create_customer(&app, "Jane").await;

        let (status, _) = send(
            &app,
            "POST",
            "/api/invoices",
            Some(json!({ "customer_id": customer["id"], "items": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "GET", "/api/invoices?status=refunded", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_json_bad_requests() {
        let app = setup().await;
        let customer = create_customer(&app, "Jane").await;
        let product = create_product(&app, "WH001", 5000, 10).await;
        let (_, invoice) = send(
            &app,
            "POST",
            "/api/invoices",
            Some(json!({
                "customer_id": customer["id"],
                "items": [{ "product_id": product["id"], "quantity": 1 }]
            })),
        )
        .await;
        let id = invoice["id"].as_str().unwrap();

        let (status, json) = send(
            &app,
            "PATCH",
            &format!("/api/invoices/{id}/status"),
            Some(json!({ "status": "refunded" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());

        let (status, json) = send(
            &app,
            "POST",
            "/api/invoices",
            Some(json!({
                "customer_id": "not-a-uuid",
                "items": [{ "product_id": product["id"], "quantity": 1 }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());

        let request = Request::builder()
            .method("POST")
            .uri("/api/customers")
            .body(Body::from(r#"{"name":"Jane"}"#))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_overflowing_invoice_total_is_rejected() {
        let app = setup().await;
        let customer = create_customer(&app, "Jane").await;
        let product = create_product(&app, "WH001", 5000, 10).await;

        let (status, json) = send(
            &app,
            "POST",
            "/api/invoices",
            Some(json!({
                "customer_id": customer["id"],
                "items": [{
                    "product_id": product["id"],
                    "quantity": 2,
                    "unit_price": i64::MAX
                }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("too large"));

        let id = product["id"].as_str().unwrap();
        let (_, json) = send(&app, "GET", &format!("/api/products/{id}"), None).await;
        assert_eq!(json["stock"], 10);
    }

    #[tokio::test]
    async fn test_referenced_customer_cannot_be_deleted() {
        let app = setup().await;
        let customer = create_customer(&app, "Jane").await;
        let product = create_product(&app, "WH001", 5000, 10).await;
        send(
            &app,
            "POST",
            "/api/invoices",
            Some(json!({
                "customer_id": customer["id"],
                "items": [{ "product_id": product["id"], "quantity": 1 }]
            })),
        )
        .await;

        let id = customer["id"].as_str().unwrap();
        let (status, _) = send(&app, "DELETE", &format!("/api/customers/{id}"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}

mod sales {
    use super::*;

    #[tokio::test]
    async fn test_sale_decrements_stock() {
        let app = setup().await;
        let product = create_product(&app, "CAB-1", 250, 10).await;

        let (status, json) = send(
            &app,
            "POST",
            "/api/sales",
            Some(json!({ "product_id": product["id"], "quantity": 4 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["quantity_sold"], 4);
        assert_eq!(json["total_price"], 1000);
        assert_eq!(json["product"]["stock"], 6);

        let (status, _) = send(
            &app,
            "POST",
            "/api/sales",
            Some(json!({ "product_id": product["id"], "quantity": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = send(
            &app,
            "POST",
            "/api/sales",
            Some(json!({ "product_id": product["id"], "quantity": -1 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }
}

mod auth {
    use super::*;

    #[tokio::test]
    async fn test_demo_user_is_current() {
        let app = setup().await;
        let (status, json) = send(&app, "GET", "/api/auth/user", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["id"], "demo-user-1");
        assert_eq!(json["email"], "demo@example.com");
    }

    #[tokio::test]
    async fn test_bearer_mode_requires_token() {
        let app = setup_with_mode(AuthMode::Bearer).await;
        let (status, json) = send(&app, "GET", "/api/products", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "Unauthorized");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/products")
                    .header("authorization", "Bearer user-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Health stays public
        let (status, _) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_disabled_mode_has_no_user() {
        let app = setup_with_mode(AuthMode::Disabled).await;
        let (status, _) = send(&app, "GET", "/api/auth/user", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
