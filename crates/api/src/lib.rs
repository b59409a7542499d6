//! HTTP API server with observability for the inventory service.
//!
//! Provides REST endpoints for products, customers, invoices, sales and the
//! dashboard, with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, patch, post};
use domain::{
    CustomerService, DashboardService, DomainError, InvoiceService, ProductService, UserProfile,
    UserService,
};
use metrics_exporter_prometheus::PrometheusHandle;
use store::InventoryStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::AuthMode;
use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<S: InventoryStore> {
    pub products: ProductService<S>,
    pub customers: CustomerService<S>,
    pub invoices: InvoiceService<S>,
    pub dashboard: DashboardService<S>,
    pub users: UserService<S>,
    pub auth_mode: AuthMode,
}

impl<S: InventoryStore + Clone> AppState<S> {
    pub fn new(store: S, tax_rate_bps: u32, auth_mode: AuthMode) -> Self {
        Self {
            products: ProductService::new(store.clone()),
            customers: CustomerService::new(store.clone()),
            invoices: InvoiceService::with_tax_rate(store.clone(), tax_rate_bps),
            dashboard: DashboardService::new(store.clone()),
            users: UserService::new(store),
            auth_mode,
        }
    }
}

/// Creates the application state for `store` using the configured tax rate
/// and auth mode.
pub fn create_state<S: InventoryStore + Clone>(store: S, config: &Config) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store, config.tax_rate_bps, config.auth_mode))
}

/// Stores the demo user when running in demo mode.
pub async fn seed_demo_user<S: InventoryStore>(state: &AppState<S>) -> Result<(), DomainError> {
    if state.auth_mode == AuthMode::Demo {
        let user = state.users.upsert(UserProfile::demo()).await?;
        tracing::info!(user_id = %user.id, "demo user ready");
    }
    Ok(())
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: InventoryStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    use routes::{auth, customers, dashboard, invoices, products, sales};

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let api = Router::new()
        .route(
            "/products",
            get(products::list::<S>).post(products::create::<S>),
        )
        .route("/products/low-stock", get(products::low_stock::<S>))
        .route(
            "/products/{id}",
            get(products::get::<S>)
                .put(products::update::<S>)
                .delete(products::delete::<S>),
        )
        .route("/products/{id}/stock", post(products::adjust_stock::<S>))
        .route(
            "/customers",
            get(customers::list::<S>).post(customers::create::<S>),
        )
        .route(
            "/customers/{id}",
            get(customers::get::<S>)
                .put(customers::update::<S>)
                .delete(customers::delete::<S>),
        )
        .route(
            "/invoices",
            get(invoices::list::<S>).post(invoices::create::<S>),
        )
        .route("/invoices/next-number", get(invoices::next_number::<S>))
        .route(
            "/invoices/{id}",
            get(invoices::get::<S>)
                .put(invoices::update::<S>)
                .delete(invoices::delete::<S>),
        )
        .route("/invoices/{id}/status", patch(invoices::update_status::<S>))
        .route("/sales", post(sales::create::<S>))
        .route("/dashboard/stats", get(dashboard::stats::<S>))
        .route("/auth/user", get(auth::current_user::<S>))
        .route_layer(middleware::from_fn_with_state(
            state.auth_mode,
            crate::auth::authenticate,
        ))
        .with_state(state);

    Router::new()
        .route("/health", get(routes::health::check))
        .nest("/api", api)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
