use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::product::ProductStatus;
use crate::errors::ApiError;
use crate::handlers::common::{clamp_limit, default_limit, default_page, ApiJson};
use crate::services::products::{CreateProductRequest, UpdateProductRequest};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub category_id: Option<Uuid>,
    pub status: Option<ProductStatus>,
}

/// List products with pagination and filtering
#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Products",
    summary = "List products",
    description = "Returns one page of products, newest first, optionally filtered by category and status.",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 10, max: 100)"),
        ("category_id" = Option<Uuid>, Query, description = "Only products in this category"),
        ("status" = Option<String>, Query, description = "Only products with this status (draft, active)")
    ),
    responses(
        (status = 200, description = "Products for the requested page", body = Vec<crate::services::products::ProductResponse>),
        (status = 401, description = "Missing or invalid API key", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let products = state
        .services
        .products
        .list_products(
            query.page,
            clamp_limit(query.limit),
            query.category_id,
            query.status,
        )
        .await?;

    Ok(Json(products))
}

/// Get a single product by id
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "Products",
    summary = "Get product",
    params(
        ("id" = Uuid, Path, description = "Product id")
    ),
    responses(
        (status = 200, description = "The product", body = crate::services::products::ProductResponse),
        (status = 401, description = "Missing or invalid API key", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .products
        .get_product(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    Ok(Json(product))
}

/// Create a product
#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Products",
    summary = "Create product",
    description = "Creates a product owned by the authenticated user.",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = crate::services::products::ProductResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_product(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ApiJson(request): ApiJson<CreateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .products
        .create_product(request, auth_user.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(product)))
}

/// Update a product
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    tag = "Products",
    summary = "Update product",
    description = "Applies a partial update; fields left out of the body keep their stored value.",
    request_body = UpdateProductRequest,
    params(
        ("id" = Uuid, Path, description = "Product id")
    ),
    responses(
        (status = 200, description = "Product updated", body = crate::services::products::ProductResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<UpdateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.services.products.update_product(id, request).await?;

    Ok(Json(product))
}

/// Delete a product
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    tag = "Products",
    summary = "Delete product",
    params(
        ("id" = Uuid, Path, description = "Product id")
    ),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 401, description = "Missing or invalid API key", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.products.delete_product(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
