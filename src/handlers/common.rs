use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::errors::ApiError;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

pub fn default_page() -> u64 {
    DEFAULT_PAGE
}

pub fn default_limit() -> u64 {
    DEFAULT_PAGE_SIZE
}

/// Clamps a caller-supplied page size into the allowed window.
pub fn clamp_limit(limit: u64) -> u64 {
    limit.clamp(1, MAX_PAGE_SIZE)
}

/// `Json` extractor whose rejections use the standard error envelope with a
/// 400 status, so malformed or incomplete bodies do not surface as axum's
/// default 422.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::ValidationError(rejection.body_text())),
        }
    }
}
