use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::order::{self, Entity as OrderEntity, OrderStatus};
use crate::entities::order_item::{self, Entity as OrderItemEntity};
use crate::errors::ServiceError;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(custom = "super::validate_non_negative_decimal")]
    pub price: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<order_item::Model> for OrderItemResponse {
    fn from(model: order_item::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            quantity: model.quantity,
            price: model.price,
            created_at: model.created_at,
        }
    }
}

/// An order header without its item lines, as returned by the list endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub total: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl From<order::Model> for OrderResponse {
    fn from(model: order::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            total: model.total,
            status: model.status,
            created_at: model.created_at,
        }
    }
}

/// An order header with its item lines embedded under `items`.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub total: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

impl OrderWithItems {
    fn from_parts(order: order::Model, items: Vec<order_item::Model>) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            first_name: order.first_name,
            last_name: order.last_name,
            email: order.email,
            total: order.total,
            status: order.status,
            created_at: order.created_at,
            items: items.into_iter().map(OrderItemResponse::from).collect(),
        }
    }
}

/// Sums `price * quantity` over the submitted lines. The stored total comes
/// from here, never from a client-provided figure.
fn compute_total(items: &[OrderItemInput]) -> Decimal {
    items
        .iter()
        .map(|item| item.price * Decimal::from(item.quantity))
        .sum()
}

#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Creates the order header and every item line in one transaction. If
    /// any insert fails the transaction is rolled back and no partial order
    /// survives.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
        user_id: Uuid,
    ) -> Result<OrderWithItems, ServiceError> {
        request.validate().map_err(|e| {
            warn!(error = %e, "Invalid order creation request");
            ServiceError::ValidationError(e.to_string())
        })?;
        for item in &request.items {
            item.validate().map_err(|e| {
                warn!(error = %e, product_id = %item.product_id, "Invalid order item");
                ServiceError::ValidationError(e.to_string())
            })?;
        }

        let order_id = Uuid::new_v4();
        let now = Utc::now();
        let total = compute_total(&request.items);

        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let order_active = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(user_id),
            first_name: Set(request.first_name.clone()),
            last_name: Set(request.last_name.clone()),
            email: Set(request.email.clone()),
            total: Set(total),
            status: Set(OrderStatus::Pending),
            created_at: Set(now),
        };

        let order_model = match order_active.insert(&txn).await {
            Ok(model) => model,
            Err(e) => {
                error!(error = %e, order_id = %order_id, "Failed to create order in database");
                return Err(roll_back(txn, e).await);
            }
        };

        let mut item_models = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let item_active = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                price: Set(item.price),
                created_at: Set(now),
            };
            match item_active.insert(&txn).await {
                Ok(model) => item_models.push(model),
                Err(e) => {
                    error!(
                        error = %e,
                        order_id = %order_id,
                        product_id = %item.product_id,
                        "Failed to insert order item, rolling back order"
                    );
                    return Err(roll_back(txn, e).await);
                }
            }
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit order creation");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            order_id = %order_id,
            user_id = %user_id,
            total = %order_model.total,
            item_count = item_models.len(),
            "Order created successfully"
        );

        Ok(OrderWithItems::from_parts(order_model, item_models))
    }

    /// Fetches one order with its item lines embedded.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<Option<OrderWithItems>, ServiceError> {
        let db = &*self.db_pool;

        let order_model = OrderEntity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to fetch order from database");
                ServiceError::DatabaseError(e)
            })?;

        let Some(order_model) = order_model else {
            return Ok(None);
        };

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to fetch order items from database");
                ServiceError::DatabaseError(e)
            })?;

        Ok(Some(OrderWithItems::from_parts(order_model, items)))
    }

    /// Returns one page of order headers, newest first, optionally filtered
    /// by status. Item lines are not loaded here.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: u64,
        limit: u64,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderResponse>, ServiceError> {
        let db = &*self.db_pool;

        let mut query = OrderEntity::find().order_by_desc(order::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }

        let orders = query
            .paginate(db, limit)
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch orders from database");
                ServiceError::DatabaseError(e)
            })?;

        Ok(orders.into_iter().map(OrderResponse::from).collect())
    }
}

/// Rolls the transaction back after `cause`. When the rollback itself fails
/// the result is reported as a compensation failure and both errors are
/// logged, since the database may be holding a partially written order.
async fn roll_back(txn: DatabaseTransaction, cause: DbErr) -> ServiceError {
    if let Err(rollback_err) = txn.rollback().await {
        error!(
            error = %rollback_err,
            original_error = %cause,
            "Rollback failed after order write error"
        );
        return ServiceError::CompensationError(format!(
            "order write failed ({}) and rollback failed ({})",
            cause, rollback_err
        ));
    }
    ServiceError::DatabaseError(cause)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn line(quantity: i32, price: Decimal) -> OrderItemInput {
        OrderItemInput {
            product_id: Uuid::new_v4(),
            quantity,
            price,
        }
    }

    #[test]
    fn total_sums_price_times_quantity() {
        let items = vec![line(2, dec!(19.99)), line(1, dec!(5.00))];
        assert_eq!(compute_total(&items), dec!(44.98));
    }

    #[test]
    fn total_of_no_items_is_zero() {
        assert_eq!(compute_total(&[]), Decimal::ZERO);
    }

    #[test]
    fn request_requires_at_least_one_item() {
        let request = CreateOrderRequest {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            items: Vec::new(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn request_rejects_invalid_email() {
        let request = CreateOrderRequest {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "not-an-email".to_string(),
            items: vec![line(1, dec!(1.00))],
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn item_rejects_zero_quantity() {
        assert!(line(0, dec!(1.00)).validate().is_err());
    }

    #[test]
    fn item_rejects_negative_price() {
        assert!(line(1, dec!(-1.00)).validate().is_err());
    }

    #[test]
    fn response_embeds_items_under_items_key() {
        let order_model = order::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            total: dec!(44.98),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };
        let item_model = order_item::Model {
            id: Uuid::new_v4(),
            order_id: order_model.id,
            product_id: Uuid::new_v4(),
            quantity: 2,
            price: dec!(19.99),
            created_at: order_model.created_at,
        };

        let response = OrderWithItems::from_parts(order_model.clone(), vec![item_model]);
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["id"], json!(order_model.id));
        assert_eq!(value["status"], json!("pending"));
        assert_eq!(value["items"].as_array().unwrap().len(), 1);
        assert_eq!(value["items"][0]["quantity"], json!(2));
    }
}
