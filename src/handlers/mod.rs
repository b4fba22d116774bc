use std::sync::Arc;

use crate::db::DbPool;
use crate::services::{CategoryService, OrderService, ProductService};

pub mod categories;
pub mod common;
pub mod health;
pub mod keys;
pub mod orders;
pub mod products;

/// All resource services, constructed once at startup and shared through
/// `AppState`.
#[derive(Clone)]
pub struct AppServices {
    pub categories: Arc<CategoryService>,
    pub products: Arc<ProductService>,
    pub orders: Arc<OrderService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            categories: Arc::new(CategoryService::new(db_pool.clone())),
            products: Arc::new(ProductService::new(db_pool.clone())),
            orders: Arc::new(OrderService::new(db_pool)),
        }
    }
}
