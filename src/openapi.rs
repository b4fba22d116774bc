use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Back Office API",
        description = r#"
# Back Office Gateway

A thin HTTP gateway over the commerce database. It re-exposes the catalog,
category hierarchy, and order intake behind static per-user API keys, and
promotes the operations the admin panel used to run against the database
directly to first-class endpoints.

## Authentication

Every `/api` endpoint requires a bearer API key:

```
Authorization: Bearer pk_<hex>
```

Keys are static per user. A key can be rotated through
`POST /api/keys/regenerate`, which invalidates the previous one immediately.

## Pagination

List endpoints accept `page` (default: 1) and `limit` (default: 10, max: 100)
query parameters and return a bare JSON array for the requested window.
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Products", description = "Catalog management endpoints"),
        (name = "Categories", description = "Category hierarchy endpoints"),
        (name = "Orders", description = "Order intake and lookup endpoints"),
        (name = "Keys", description = "API key management endpoints"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,

        crate::handlers::categories::list_categories,
        crate::handlers::categories::category_tree,
        crate::handlers::categories::get_category,
        crate::handlers::categories::create_category,
        crate::handlers::categories::update_category,
        crate::handlers::categories::delete_category,

        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::create_order,

        crate::handlers::keys::current_key,
        crate::handlers::keys::regenerate_key,

        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            crate::services::products::CreateProductRequest,
            crate::services::products::UpdateProductRequest,
            crate::services::products::ProductResponse,
            crate::entities::product::ProductStatus,

            crate::services::categories::CreateCategoryRequest,
            crate::services::categories::UpdateCategoryRequest,
            crate::services::categories::CategoryResponse,
            crate::services::categories::CategoryTreeNode,

            crate::services::orders::CreateOrderRequest,
            crate::services::orders::OrderItemInput,
            crate::services::orders::OrderResponse,
            crate::services::orders::OrderItemResponse,
            crate::services::orders::OrderWithItems,
            crate::entities::order::OrderStatus,

            crate::handlers::keys::ApiKeyResponse,
            crate::handlers::health::HealthResponse,

            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

/// Serves the interactive docs at `/api-docs` and the raw document at
/// `/api-docs/openapi.json`. Both are reachable without an API key.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/api-docs")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
