use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok" when every check passed, "degraded" otherwise.
    pub status: String,
    pub version: String,
    /// "ok" or "unavailable", based on a live ping of the pool.
    pub database: String,
    pub timestamp: String,
}

/// Health check with a database ping
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    summary = "Health check",
    description = "Pings the database and reports overall service health. No authentication required.",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database_up = match crate::db::check_connection(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Database ping failed during health check");
            false
        }
    };

    let response = HealthResponse {
        status: if database_up { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if database_up { "ok" } else { "unavailable" }.to_string(),
        timestamp: Utc::now().to_rfc3339(),
    };

    let code = if database_up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(response))
}
