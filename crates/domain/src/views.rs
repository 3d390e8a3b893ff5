//! Response views projected from engine results.
//!
//! These are the shapes the boundary serializes; none of them leak the
//! credential hash or other internals. Money fields carry the `_cents`
//! suffix and serialize as plain integers.

use chrono::{DateTime, Utc};
use common::{CustomerId, Money, OrderId, OrderStatus, ProductId, Role};
use serde::Serialize;
use store::{Customer, CustomerActivity, Product, ProductSales};

/// Result of a successful order creation.
#[derive(Debug, Clone, Serialize)]
pub struct OrderCreated {
    pub id: OrderId,
    pub status: OrderStatus,
}

/// One row of an order listing.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub total_cents: Money,
    pub status: OrderStatus,
    pub customer_name: String,
}

impl From<store::OrderSummaryRow> for OrderSummary {
    fn from(row: store::OrderSummaryRow) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
            total_cents: row.total,
            status: row.status,
            customer_name: row.customer_name,
        }
    }
}

/// A line item with its product name resolved for display.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItemView {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: Money,
}

/// A fully loaded order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub id: OrderId,
    pub customer_name: String,
    pub customer_email: String,
    pub status: OrderStatus,
    pub total_cents: Money,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemView>,
}

/// A catalog product as shown to callers.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price_cents: Money,
    pub stock: u32,
}

impl From<Product> for ProductView {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            price_cents: p.price,
            stock: p.stock,
        }
    }
}

/// One page of the catalog listing.
#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub products: Vec<ProductView>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// A customer account, without the credential.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerView {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<Customer> for CustomerView {
    fn from(c: Customer) -> Self {
        Self {
            id: c.id,
            name: c.name,
            email: c.email,
            role: c.role,
            created_at: c.created_at,
        }
    }
}

/// Back-office dashboard aggregates.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub revenue_cents: Money,
    pub total_orders: u64,
    pub open_orders: u64,
    pub top_products: Vec<ProductSales>,
    pub top_customers: Vec<CustomerActivity>,
}
