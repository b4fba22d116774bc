use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::order::OrderStatus;
use crate::errors::ApiError;
use crate::handlers::common::{clamp_limit, default_limit, default_page, ApiJson};
use crate::services::orders::CreateOrderRequest;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub status: Option<OrderStatus>,
}

/// List orders with pagination and filtering
#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "Orders",
    summary = "List orders",
    description = "Returns one page of order headers, newest first. Item lines are not embedded here; fetch a single order to get them.",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 10, max: 100)"),
        ("status" = Option<String>, Query, description = "Only orders with this status (pending, completed, cancelled)")
    ),
    responses(
        (status = 200, description = "Orders for the requested page", body = Vec<crate::services::orders::OrderResponse>),
        (status = 401, description = "Missing or invalid API key", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state
        .services
        .orders
        .list_orders(query.page, clamp_limit(query.limit), query.status)
        .await?;

    Ok(Json(orders))
}

/// Get a single order with its item lines
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "Orders",
    summary = "Get order",
    description = "Returns the order with its item lines embedded under `items`.",
    params(
        ("id" = Uuid, Path, description = "Order id")
    ),
    responses(
        (status = 200, description = "The order with items", body = crate::services::orders::OrderWithItems),
        (status = 401, description = "Missing or invalid API key", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get_order(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    Ok(Json(order))
}

/// Create an order with its item lines
#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Orders",
    summary = "Create order",
    description = "Creates an order and all of its item lines in one transaction. The total is computed on the server from `price * quantity` of the submitted lines; a client-provided total is rejected as an unknown field.",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = crate::services::orders::OrderWithItems),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ApiJson(request): ApiJson<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .create_order(request, auth_user.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}
