//! Persistence layer for the commerce back office.
//!
//! Defines the storage contracts the engine runs against (catalog, customer
//! directory, order repository) together with two interchangeable
//! backends: [`MemoryStore`] (tests, local development) and [`PostgresStore`]
//! (production, sqlx).
//!
//! The compound writes the business layer depends on (order insert,
//! finalization with stock decrement, status cancellation) are single trait
//! operations so every backend can honor their all-or-nothing contract.

mod error;
mod memory;
mod postgres;
mod records;
mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use records::{
    Customer, CustomerActivity, NewCustomer, NewOrder, NewProduct, Order, OrderItem, Product,
    ProductSales,
};
pub use store::{CatalogStore, CommerceStore, CustomerDirectory, OrderRepository, OrderSummaryRow};
