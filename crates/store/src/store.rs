//! Storage contracts consumed by the engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, Money, OrderId, OrderStatus, ProductId, Role};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::records::{
    Customer, CustomerActivity, NewCustomer, NewOrder, NewProduct, Order, Product, ProductSales,
};

/// A single row of an order listing, joined with the owning customer's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummaryRow {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub total: Money,
    pub status: OrderStatus,
    pub customer_name: String,
}

/// Catalog persistence: product CRUD and stock updates.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_product(&self, new: NewProduct) -> Result<Product>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Batch lookup. Missing ids are simply absent from the result; callers
    /// decide whether that is an error.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>>;

    /// Returns one page of products ordered by name, plus the total count.
    async fn list_products(&self, limit: i64, offset: i64) -> Result<(Vec<Product>, i64)>;

    /// Absolute stock replacement. Returns the updated product, or `None`
    /// if the product does not exist.
    async fn set_stock(&self, id: ProductId, stock: u32) -> Result<Option<Product>>;

    /// Deletes the product row. Returns false if it did not exist.
    async fn delete_product(&self, id: ProductId) -> Result<bool>;
}

/// Customer identity persistence.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Fails with [`crate::StoreError::DuplicateEmail`] if the email is taken.
    async fn insert_customer(&self, new: NewCustomer) -> Result<Customer>;

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>>;

    /// All customers, oldest first.
    async fn list_customers(&self) -> Result<Vec<Customer>>;

    /// Returns the updated customer, or `None` if absent.
    async fn set_role(&self, id: CustomerId, role: Role) -> Result<Option<Customer>>;

    /// Deletes the customer row. Returns false if it did not exist.
    async fn delete_customer(&self, id: CustomerId) -> Result<bool>;
}

/// Order persistence and the transactional lifecycle commits.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persists the order and all of its items atomically.
    async fn insert_order(&self, new: NewOrder) -> Result<Order>;

    /// Loads an order with its items eagerly, in insertion order.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Summaries of the customer's orders, newest first.
    async fn list_for_customer(&self, email: &str) -> Result<Vec<OrderSummaryRow>>;

    /// Summaries of all orders. Ordered newest first with the id as a
    /// tiebreak so a given snapshot always lists identically.
    async fn list_all(&self) -> Result<Vec<OrderSummaryRow>>;

    /// Flips the order from Open to Cancelled. Fails with `OrderNotOpen`
    /// if a concurrent transition got there first. No stock effect.
    async fn cancel_order(&self, id: OrderId) -> Result<()>;

    /// Flips the order from Open to Finalized and decrements every
    /// referenced product's stock by the ordered quantity.
    ///
    /// The whole commit is one transaction serialized per product: either
    /// every item passes the sufficiency check and every decrement plus the
    /// status flip commit together, or nothing is written and the first
    /// failing product is reported via `InsufficientStock`.
    async fn finalize_order(&self, id: OrderId) -> Result<()>;

    /// True if any order item references the product.
    async fn product_referenced(&self, id: ProductId) -> Result<bool>;

    /// True if the customer owns any order.
    async fn customer_has_orders(&self, id: CustomerId) -> Result<bool>;

    /// Sum of totals over Finalized orders.
    async fn revenue_total(&self) -> Result<Money>;

    async fn order_count(&self) -> Result<u64>;

    async fn order_count_by_status(&self, status: OrderStatus) -> Result<u64>;

    /// Top products by units sold across all orders, descending.
    async fn top_products(&self, limit: usize) -> Result<Vec<ProductSales>>;

    /// Top customers by number of orders placed, descending.
    async fn top_customers(&self, limit: usize) -> Result<Vec<CustomerActivity>>;
}

/// Blanket alias for a full backend, usable as a single generic bound.
pub trait CommerceStore:
    CatalogStore + CustomerDirectory + OrderRepository + Clone + Send + Sync + 'static
{
}

impl<T> CommerceStore for T where
    T: CatalogStore + CustomerDirectory + OrderRepository + Clone + Send + Sync + 'static
{
}
