/*!
 * # Authentication Module
 *
 * Every `/api` route is gated by a static per-user API key presented as an
 * HTTP bearer token. Keys live in the `api_keys` table, one active key per
 * user, and are matched by exact string comparison. There are no sessions,
 * no expiry and no scopes; rotation is the only revocation mechanism.
 */

use async_trait::async_trait;
use axum::{
    extract::Request,
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use rand::{thread_rng, RngCore};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::entities::api_key;
use crate::errors::ServiceError;

/// Authenticated principal resolved from a bearer API key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Authentication service backed by the `api_keys` table
#[derive(Debug, Clone)]
pub struct AuthService {
    db: Arc<DatabaseConnection>,
    key_prefix: String,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(db: Arc<DatabaseConnection>, key_prefix: String) -> Self {
        Self { db, key_prefix }
    }

    /// Validate an API key against the `api_keys` table
    ///
    /// Any key string present in the table authenticates, full stop. A miss
    /// is indistinguishable from a revoked key.
    #[instrument(skip(self, api_key))]
    pub async fn validate_api_key(&self, api_key: &str) -> Result<AuthUser, AuthError> {
        let row = api_key::Entity::find()
            .filter(api_key::Column::Key.eq(api_key))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        match row {
            Some(record) => Ok(AuthUser {
                user_id: record.user_id,
            }),
            None => Err(AuthError::InvalidApiKey),
        }
    }

    /// Fetch the caller's current key, if one has been issued
    pub async fn current_key(&self, user_id: Uuid) -> Result<Option<api_key::Model>, AuthError> {
        api_key::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))
    }

    /// Issue a fresh key for the user, replacing any existing one
    ///
    /// A single upsert keyed on `user_id` covers both first issuance and
    /// rotation. The old key stops validating the moment the row commits.
    #[instrument(skip(self))]
    pub async fn rotate_key(&self, user_id: Uuid) -> Result<api_key::Model, AuthError> {
        let model = api_key::Model {
            user_id,
            key: mint_key(&self.key_prefix),
            created_at: chrono::Utc::now(),
        };

        let active = api_key::ActiveModel {
            user_id: Set(model.user_id),
            key: Set(model.key.clone()),
            created_at: Set(model.created_at),
        };

        api_key::Entity::insert(active)
            .on_conflict(
                OnConflict::column(api_key::Column::UserId)
                    .update_columns([api_key::Column::Key, api_key::Column::CreatedAt])
                    .to_owned(),
            )
            .exec(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        debug!(user_id = %user_id, "issued replacement API key");
        Ok(model)
    }
}

/// Mints a fresh API key: the configured prefix followed by 64 hex
/// characters from 32 bytes of OS-seeded randomness.
fn mint_key(prefix: &str) -> String {
    let mut bytes = [0u8; 32];
    thread_rng().fill_bytes(&mut bytes);
    format!("{}{}", prefix, hex::encode(bytes))
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingAuth | AuthError::InvalidApiKey => {
                ServiceError::AuthError(err.to_string())
            }
            AuthError::DatabaseError(msg) => ServiceError::DatabaseError(DbErr::Custom(msg)),
            AuthError::InternalError(msg) => ServiceError::InternalError(msg),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // Delegate so auth rejections share the standard error envelope
        ServiceError::from(self).into_response()
    }
}

/// Authentication middleware that validates the bearer API key
///
/// Expects `Arc<AuthService>` to have been injected into request extensions
/// by an outer layer. On success the resolved [`AuthUser`] is inserted into
/// the request extensions for handlers to extract.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let headers = request.headers().clone();

    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service not available",
            )
                .into_response();
        }
    };

    match extract_auth_from_headers(&headers, &auth_service).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Extract authentication info from request headers
///
/// A missing or malformed `Authorization` header is rejected before any
/// database lookup happens.
async fn extract_auth_from_headers(
    headers: &HeaderMap,
    auth_service: &AuthService,
) -> Result<AuthUser, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuth)?;
    let auth_value = auth_header.to_str().map_err(|_| AuthError::MissingAuth)?;
    let token = auth_value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MissingAuth)?;

    auth_service.validate_api_key(token.trim()).await
}

#[async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }
}
