use common::{CustomerId, OrderId, ProductId};
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The email is already registered to another customer.
    #[error("email already registered: {0}")]
    DuplicateEmail(String),

    /// A product referenced by the order does not hold enough stock to
    /// commit the finalization. No stock was decremented.
    #[error("insufficient stock for product {product_id}")]
    InsufficientStock { product_id: ProductId },

    /// The order is not in the Open state, so the requested transition
    /// cannot be committed.
    #[error("order {0} is not open")]
    OrderNotOpen(OrderId),

    /// The order disappeared between the caller's read and the commit.
    #[error("order not found: {0}")]
    OrderMissing(OrderId),

    /// The customer disappeared between the caller's read and the commit.
    #[error("customer not found: {0}")]
    CustomerMissing(CustomerId),

    /// A stored row could not be decoded back into its domain type.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
