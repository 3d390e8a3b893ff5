//! Business error taxonomy.

use common::OrderStatus;
use store::StoreError;
use thiserror::Error;

/// Errors surfaced by the business layer.
///
/// Every variant except `Store` is a deliberate, user-facing outcome; the
/// boundary maps them onto 4xx responses. `Store` wraps unexpected
/// persistence faults and is reported opaquely.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Malformed or out-of-range input, rejected before any business logic.
    #[error("{0}")]
    Invalid(String),

    /// Uniqueness violation.
    #[error("email already registered: {0}")]
    EmailTaken(String),

    /// The operation is illegal for the order's current lifecycle state.
    #[error("cannot change status of a {status} order")]
    NotOpen { status: OrderStatus },

    /// A concurrent transition closed the order between the caller's read
    /// and the commit.
    #[error("order was closed by a concurrent transition")]
    AlreadyClosed,

    /// A finalization found a product without enough stock. Nothing was
    /// decremented.
    #[error("insufficient stock for product: {product}")]
    InsufficientStock { product: String },

    /// The product is referenced by at least one order and cannot be
    /// deleted.
    #[error("product {name} is referenced by existing orders")]
    ProductReferenced { name: String },

    /// The customer owns orders and cannot be deleted.
    #[error("customer {name} has existing orders")]
    CustomerHasOrders { name: String },

    /// An administrator tried to change or delete their own account.
    #[error("administrators cannot {action} their own account")]
    SelfModification { action: &'static str },

    /// The caller's role or ownership does not permit the operation.
    #[error("access denied")]
    Forbidden,

    /// Unexpected persistence failure.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail(email) => DomainError::EmailTaken(email),
            StoreError::OrderNotOpen(_) => DomainError::AlreadyClosed,
            StoreError::OrderMissing(id) => DomainError::NotFound {
                entity: "order",
                id: id.to_string(),
            },
            StoreError::CustomerMissing(id) => DomainError::NotFound {
                entity: "customer",
                id: id.to_string(),
            },
            StoreError::InsufficientStock { product_id } => DomainError::InsufficientStock {
                product: product_id.to_string(),
            },
            other => DomainError::Store(other),
        }
    }
}
