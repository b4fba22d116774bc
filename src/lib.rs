//! Back Office API Library
//!
//! Thin HTTP gateway over the commerce database: catalog, category
//! hierarchy, order intake, and API key management behind static
//! per-user bearer keys.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod openapi;
pub mod services;
pub mod tracing;

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use serde_json::json;
use tower_http::{compression::CompressionLayer, cors::CorsLayer};

use crate::auth::{AuthRouterExt, AuthService};
use crate::config::AppConfig;
use crate::handlers::AppServices;

/// Shared application state available to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: AppConfig,
    pub auth: Arc<AuthService>,
    pub services: AppServices,
}

impl AppState {
    /// Builds the full state from an established connection. The connection
    /// is injected rather than opened here so tests can run the production
    /// wiring against a database of their own choosing.
    pub fn new(db: Arc<DatabaseConnection>, config: AppConfig) -> Self {
        let auth = Arc::new(AuthService::new(db.clone(), config.api_key_prefix.clone()));
        let services = AppServices::new(db.clone());
        Self {
            db,
            config,
            auth,
            services,
        }
    }
}

/// All `/api` routes. Every route in here sits behind the API key
/// middleware; unauthenticated surfaces live in [`app_router`].
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/products/:id",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .route(
            "/categories",
            get(handlers::categories::list_categories).post(handlers::categories::create_category),
        )
        .route(
            "/categories/tree",
            get(handlers::categories::category_tree),
        )
        .route(
            "/categories/:id",
            get(handlers::categories::get_category)
                .put(handlers::categories::update_category)
                .delete(handlers::categories::delete_category),
        )
        .route(
            "/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route("/orders/:id", get(handlers::orders::get_order))
        .route("/keys/current", get(handlers::keys::current_key))
        .route("/keys/regenerate", post(handlers::keys::regenerate_key))
        .with_auth()
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "backoffice-api",
        "version": env!("CARGO_PKG_VERSION"),
        "docs": "/api-docs"
    }))
}

/// Assembles the complete application: public surfaces, the key-gated
/// `/api` router, Swagger UI, and the middleware stack. The CORS layer is
/// passed in because its construction from config can fail and is handled
/// at startup.
pub fn app_router(state: AppState, cors_layer: CorsLayer) -> Router {
    let auth_service = state.auth.clone();

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health::health_check))
        .nest("/api", api_routes())
        .merge(openapi::swagger_ui())
        .layer(tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        // Inject AuthService into request extensions for the auth middleware
        .layer(axum::middleware::from_fn_with_state(
            auth_service,
            |State(auth): State<Arc<AuthService>>, mut req: Request, next: Next| async move {
                req.extensions_mut().insert(auth);
                next.run(req).await
            },
        ))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(tracing::request_id_middleware))
        .with_state(state)
}
