//! Back-office dashboard aggregates.

use store::CommerceStore;

use crate::error::DomainError;
use crate::views::DashboardStats;

const TOP_N: usize = 5;

/// Read-only aggregate queries for the administrator dashboard.
pub struct DashboardService<S> {
    store: S,
}

impl<S: CommerceStore> DashboardService<S> {
    /// Creates a new dashboard service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Revenue over finalized orders, order counts, and the top-5 products
    /// and customers.
    #[tracing::instrument(skip(self))]
    pub async fn stats(&self) -> Result<DashboardStats, DomainError> {
        Ok(DashboardStats {
            revenue_cents: self.store.revenue_total().await?,
            total_orders: self.store.order_count().await?,
            open_orders: self
                .store
                .order_count_by_status(common::OrderStatus::Open)
                .await?,
            top_products: self.store.top_products(TOP_N).await?,
            top_customers: self.store.top_customers(TOP_N).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Money, Role};
    use store::{
        CatalogStore, CustomerDirectory, MemoryStore, NewCustomer, NewOrder, NewProduct,
        OrderItem, OrderRepository,
    };

    #[tokio::test]
    async fn test_stats_over_mixed_orders() {
        let store = MemoryStore::new();
        let service = DashboardService::new(store.clone());

        let ada = store
            .insert_customer(NewCustomer {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::Customer,
            })
            .await
            .unwrap();
        let widget = store
            .insert_product(NewProduct {
                name: "Widget".to_string(),
                description: String::new(),
                price: Money::from_cents(1000),
                stock: 100,
            })
            .await
            .unwrap();

        let order = |qty: u32| NewOrder {
            customer_id: ada.id,
            items: vec![OrderItem {
                product_id: widget.id,
                quantity: qty,
                unit_price: widget.price,
            }],
            total: widget.price.multiply(qty),
        };

        let finalized = store.insert_order(order(3)).await.unwrap();
        store.finalize_order(finalized.id).await.unwrap();
        store.insert_order(order(1)).await.unwrap();

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.revenue_cents.cents(), 3000);
        assert_eq!(stats.total_orders, 2);
        assert_eq!(stats.open_orders, 1);
        assert_eq!(stats.top_products[0].name, "Widget");
        assert_eq!(stats.top_products[0].units, 4);
        assert_eq!(stats.top_customers[0].name, "Ada");
        assert_eq!(stats.top_customers[0].orders, 2);
    }
}
