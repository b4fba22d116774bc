use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::category;
use crate::entities::product::{self, Entity as ProductEntity, ProductStatus};
use crate::errors::ServiceError;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(custom = "super::validate_non_negative_decimal")]
    pub price: Decimal,
    #[validate(range(min = 0, message = "Inventory must be zero or greater"))]
    pub inventory: i32,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Partial update. Missing fields keep their stored value; `category_id`
/// accepts an explicit `null` to detach the product from its category.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "super::validate_non_negative_decimal")]
    pub price: Option<Decimal>,
    #[validate(range(min = 0, message = "Inventory must be zero or greater"))]
    pub inventory: Option<i32>,
    #[serde(default, deserialize_with = "super::double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub category_id: Option<Option<Uuid>>,
    pub status: Option<ProductStatus>,
    pub images: Option<Vec<String>>,
}

impl UpdateProductRequest {
    fn is_noop(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.inventory.is_none()
            && self.category_id.is_none()
            && self.status.is_none()
            && self.images.is_none()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub inventory: i32,
    pub category_id: Option<Uuid>,
    pub status: ProductStatus,
    pub images: Vec<String>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<product::Model> for ProductResponse {
    fn from(model: product::Model) -> Self {
        // A malformed images column degrades to an empty list instead of
        // failing the whole response.
        let images = serde_json::from_value(model.images).unwrap_or_default();
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            price: model.price,
            inventory: model.inventory,
            category_id: model.category_id,
            status: model.status,
            images,
            user_id: model.user_id,
            created_at: model.created_at,
        }
    }
}

#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Returns one page of products, newest first, optionally filtered by
    /// category and status.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        page: u64,
        limit: u64,
        category_id: Option<Uuid>,
        status: Option<ProductStatus>,
    ) -> Result<Vec<ProductResponse>, ServiceError> {
        let db = &*self.db_pool;

        let mut query = ProductEntity::find().order_by_desc(product::Column::CreatedAt);
        if let Some(category_id) = category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(status) = status {
            query = query.filter(product::Column::Status.eq(status));
        }

        let products = query
            .paginate(db, limit)
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch products from database");
                ServiceError::DatabaseError(e)
            })?;

        Ok(products.into_iter().map(ProductResponse::from).collect())
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(
        &self,
        product_id: Uuid,
    ) -> Result<Option<ProductResponse>, ServiceError> {
        let db = &*self.db_pool;

        let found = ProductEntity::find_by_id(product_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, product_id = %product_id, "Failed to fetch product from database");
                ServiceError::DatabaseError(e)
            })?;

        Ok(found.map(ProductResponse::from))
    }

    /// Creates a product owned by the authenticated user.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
        user_id: Uuid,
    ) -> Result<ProductResponse, ServiceError> {
        request.validate().map_err(|e| {
            warn!(error = %e, "Invalid product creation request");
            ServiceError::ValidationError(e.to_string())
        })?;

        let db = &*self.db_pool;

        if let Some(category_id) = request.category_id {
            ensure_category_exists(db, category_id).await?;
        }

        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(request.title),
            description: Set(request.description),
            price: Set(request.price),
            inventory: Set(request.inventory),
            category_id: Set(request.category_id),
            status: Set(request.status),
            images: Set(serde_json::Value::from(request.images)),
            user_id: Set(user_id),
            created_at: Set(Utc::now()),
        };

        let created = model.insert(db).await.map_err(|e| {
            error!(error = %e, "Failed to create product in database");
            ServiceError::DatabaseError(e)
        })?;

        info!(product_id = %created.id, user_id = %user_id, "Product created successfully");
        Ok(ProductResponse::from(created))
    }

    /// Applies a partial update to a product.
    #[instrument(skip(self, request), fields(product_id = %product_id))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        request.validate().map_err(|e| {
            warn!(error = %e, "Invalid product update request");
            ServiceError::ValidationError(e.to_string())
        })?;

        let db = &*self.db_pool;

        let existing = ProductEntity::find_by_id(product_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, product_id = %product_id, "Failed to fetch product from database");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| {
                warn!(product_id = %product_id, "Product not found for update");
                ServiceError::NotFound("Product not found".to_string())
            })?;

        if request.is_noop() {
            return Ok(ProductResponse::from(existing));
        }

        if let Some(Some(category_id)) = request.category_id {
            ensure_category_exists(db, category_id).await?;
        }

        let mut active: product::ActiveModel = existing.into();
        if let Some(title) = request.title {
            active.title = Set(title);
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(inventory) = request.inventory {
            active.inventory = Set(inventory);
        }
        if let Some(category_change) = request.category_id {
            active.category_id = Set(category_change);
        }
        if let Some(status) = request.status {
            active.status = Set(status);
        }
        if let Some(images) = request.images {
            active.images = Set(serde_json::Value::from(images));
        }

        let updated = active.update(db).await.map_err(|e| {
            error!(error = %e, product_id = %product_id, "Failed to update product in database");
            ServiceError::DatabaseError(e)
        })?;

        info!(product_id = %updated.id, "Product updated successfully");
        Ok(ProductResponse::from(updated))
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let result = ProductEntity::delete_by_id(product_id)
            .exec(db)
            .await
            .map_err(|e| {
                error!(error = %e, product_id = %product_id, "Failed to delete product from database");
                ServiceError::DatabaseError(e)
            })?;

        if result.rows_affected == 0 {
            warn!(product_id = %product_id, "Product not found for deletion");
            return Err(ServiceError::NotFound("Product not found".to_string()));
        }

        info!(product_id = %product_id, "Product deleted successfully");
        Ok(())
    }
}

async fn ensure_category_exists<C: ConnectionTrait>(
    conn: &C,
    category_id: Uuid,
) -> Result<(), ServiceError> {
    let found = category::Entity::find_by_id(category_id).one(conn).await?;
    if found.is_none() {
        warn!(category_id = %category_id, "Rejected reference to nonexistent category");
        return Err(ServiceError::ValidationError(
            "Category does not exist".to_string(),
        ));
    }
    Ok(())
}
