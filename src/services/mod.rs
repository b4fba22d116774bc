/*!
 * # Service Layer
 *
 * Business logic for the back-office gateway. Each service owns one
 * resource family, borrows the shared database pool, and returns
 * `ServiceError` so handlers can translate failures uniformly.
 */

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use validator::ValidationError;

pub mod categories;
pub mod orders;
pub mod products;

pub use categories::CategoryService;
pub use orders::OrderService;
pub use products::ProductService;

/// Deserializes an update field so an explicit JSON `null` survives as
/// `Some(None)`. Update requests use this to distinguish "clear this
/// value" from "leave it alone" (a missing field).
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Shared validator for money fields. Zero is allowed, negative is not.
pub(crate) fn validate_non_negative_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        let mut error = ValidationError::new("non_negative");
        error.message = Some("Must be zero or greater".into());
        return Err(error);
    }
    Ok(())
}
