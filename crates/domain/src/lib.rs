//! Business layer for the commerce back office.
//!
//! This crate owns the order lifecycle engine (creation with price
//! snapshotting, the Open → Finalized/Cancelled state machine, the atomic
//! stock commit), catalog and customer management rules, the role/capability
//! access policy, and the projection of results into response views.
//!
//! Everything runs against the `store` crate's persistence traits, so the
//! same rules apply over the in-memory backend and PostgreSQL.

mod catalog;
mod customers;
mod dashboard;
mod error;
mod orders;
pub mod policy;
mod views;

pub use catalog::CatalogService;
pub use customers::CustomerService;
pub use dashboard::DashboardService;
pub use error::DomainError;
pub use orders::{OrderItemInput, OrderService};
pub use policy::{Caller, Capability};
pub use views::{
    CustomerView, DashboardStats, OrderCreated, OrderDetail, OrderItemView, OrderSummary,
    ProductPage, ProductView,
};
