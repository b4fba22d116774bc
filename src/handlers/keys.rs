use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::api_key;
use crate::errors::{ApiError, ServiceError};
use crate::AppState;

/// An API key record as returned to its owner.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiKeyResponse {
    pub user_id: Uuid,
    pub key: String,
    pub created_at: DateTime<Utc>,
}

impl From<api_key::Model> for ApiKeyResponse {
    fn from(model: api_key::Model) -> Self {
        Self {
            user_id: model.user_id,
            key: model.key,
            created_at: model.created_at,
        }
    }
}

/// Show the caller's current API key
#[utoipa::path(
    get,
    path = "/api/keys/current",
    tag = "Keys",
    summary = "Get current API key",
    description = "Returns the key record the caller authenticated with.",
    responses(
        (status = 200, description = "The caller's key record", body = ApiKeyResponse),
        (status = 401, description = "Missing or invalid API key", body = crate::errors::ErrorResponse),
        (status = 404, description = "No key on record", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn current_key(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .auth
        .current_key(auth_user.user_id)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| ApiError::NotFound("API key not found".to_string()))?;

    Ok(Json(ApiKeyResponse::from(record)))
}

/// Rotate the caller's API key
#[utoipa::path(
    post,
    path = "/api/keys/regenerate",
    tag = "Keys",
    summary = "Regenerate API key",
    description = "Mints a fresh key for the caller and replaces the stored one in a single upsert. The previous key stops authenticating immediately.",
    responses(
        (status = 201, description = "The replacement key record", body = ApiKeyResponse),
        (status = 401, description = "Missing or invalid API key", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn regenerate_key(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .auth
        .rotate_key(auth_user.user_id)
        .await
        .map_err(ServiceError::from)?;

    Ok((StatusCode::CREATED, Json(ApiKeyResponse::from(record))))
}
