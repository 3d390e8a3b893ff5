//! HTTP boundary for the commerce back office.
//!
//! Maps the engine's operations onto a role-scoped JSON API: bearer-token
//! authentication, capability gates per route, error-taxonomy → status-code
//! mapping, CORS, request tracing, and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Extension;
use axum::Router;
use axum::routing::{delete, get, patch, post};
use common::Role;
use domain::{CatalogService, CustomerService, DashboardService, DomainError, OrderService};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{CommerceStore, CustomerDirectory, NewCustomer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::AuthContext;
use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<S: CommerceStore> {
    pub orders: OrderService<S>,
    pub catalog: CatalogService<S>,
    pub customers: CustomerService<S>,
    pub dashboard: DashboardService<S>,
    /// Direct store access for the login flow's credential lookup.
    pub store: S,
    pub auth: Arc<AuthContext>,
}

/// Builds the application state from a store backend and configuration.
pub fn create_state<S: CommerceStore>(store: S, config: &Config) -> Arc<AppState<S>> {
    Arc::new(AppState {
        orders: OrderService::new(store.clone()),
        catalog: CatalogService::new(store.clone()),
        customers: CustomerService::new(store.clone()),
        dashboard: DashboardService::new(store.clone()),
        store,
        auth: Arc::new(AuthContext::new(&config.jwt_secret, config.token_ttl_secs)),
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: CommerceStore>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let auth_ctx = state.auth.clone();

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/auth/login", post(routes::auth::login::<S>))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/status", patch(routes::orders::set_status::<S>))
        .route("/products", post(routes::products::create::<S>))
        .route("/products", get(routes::products::list::<S>))
        .route("/products/{id}/stock", patch(routes::products::set_stock::<S>))
        .route("/products/{id}", delete(routes::products::delete::<S>))
        .route("/customers", post(routes::customers::create::<S>))
        .route("/customers", get(routes::customers::list::<S>))
        .route("/customers/{id}/role", patch(routes::customers::set_role::<S>))
        .route("/customers/{id}", delete(routes::customers::delete::<S>))
        .route("/dashboard/stats", get(routes::dashboard::stats::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(Extension(auth_ctx))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Errors that can abort startup.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("failed to hash administrator password: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Ensures the configured administrator account exists.
///
/// Idempotent across restarts: an existing account (any role) is left
/// untouched.
pub async fn bootstrap_admin<S: CommerceStore>(
    store: &S,
    config: &Config,
) -> Result<(), BootstrapError> {
    if store
        .find_by_email(&config.admin_email)
        .await
        .map_err(DomainError::from)?
        .is_some()
    {
        return Ok(());
    }

    let password_hash = auth::hash_password(&config.admin_password)?;
    let customers = CustomerService::new(store.clone());
    customers
        .create_customer(NewCustomer {
            name: "Administrator".to_string(),
            email: config.admin_email.clone(),
            password_hash,
            role: Role::Administrator,
        })
        .await?;

    tracing::info!(email = %config.admin_email, "administrator account created");
    Ok(())
}
