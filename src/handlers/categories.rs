use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::handlers::common::ApiJson;
use crate::services::categories::{CreateCategoryRequest, UpdateCategoryRequest};
use crate::AppState;

/// List all categories as a flat collection
#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "Categories",
    summary = "List categories",
    description = "Returns every category ordered by name. Parent relationships are exposed through `parent_id`.",
    responses(
        (status = 200, description = "All categories", body = Vec<crate::services::categories::CategoryResponse>),
        (status = 401, description = "Missing or invalid API key", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let categories = state.services.categories.list_categories().await?;

    Ok(Json(categories))
}

/// Get the category hierarchy as nested nodes
#[utoipa::path(
    get,
    path = "/api/categories/tree",
    tag = "Categories",
    summary = "Get category tree",
    description = "Returns the hierarchy as a forest of nested nodes with children ordered by name. A corrupted hierarchy is reported as an internal error instead of hanging the request.",
    responses(
        (status = 200, description = "Category forest", body = Vec<crate::services::categories::CategoryTreeNode>),
        (status = 401, description = "Missing or invalid API key", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn category_tree(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let forest = state.services.categories.category_tree().await?;

    Ok(Json(forest))
}

/// Get a single category by id
#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    tag = "Categories",
    summary = "Get category",
    params(
        ("id" = Uuid, Path, description = "Category id")
    ),
    responses(
        (status = 200, description = "The category", body = crate::services::categories::CategoryResponse),
        (status = 401, description = "Missing or invalid API key", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .services
        .categories
        .get_category(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

    Ok(Json(category))
}

/// Create a category
#[utoipa::path(
    post,
    path = "/api/categories",
    tag = "Categories",
    summary = "Create category",
    description = "Creates a category. The slug is derived from the name on the server and the parent, when given, must already exist.",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = crate::services::categories::CategoryResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_category(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.services.categories.create_category(request).await?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// Update a category
#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    tag = "Categories",
    summary = "Update category",
    description = "Renames a category or moves it in the hierarchy. Renaming re-derives the slug; a parent change is rejected when it would create a cycle. Sending `\"parent_id\": null` moves the category to the root level.",
    request_body = UpdateCategoryRequest,
    params(
        ("id" = Uuid, Path, description = "Category id")
    ),
    responses(
        (status = 200, description = "Category updated", body = crate::services::categories::CategoryResponse),
        (status = 400, description = "Invalid request or cyclic parent assignment", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .services
        .categories
        .update_category(id, request)
        .await?;

    Ok(Json(category))
}

/// Delete a category
#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    tag = "Categories",
    summary = "Delete category",
    description = "Deletes a category. Its direct children are reparented to the deleted node's own parent.",
    params(
        ("id" = Uuid, Path, description = "Category id")
    ),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 401, description = "Missing or invalid API key", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.categories.delete_category(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
