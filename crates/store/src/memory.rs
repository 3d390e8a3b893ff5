use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{CustomerId, Money, OrderId, OrderStatus, ProductId, Role};
use tokio::sync::RwLock;

use crate::records::{
    Customer, CustomerActivity, NewCustomer, NewOrder, NewProduct, Order, Product, ProductSales,
};
use crate::store::{CatalogStore, CustomerDirectory, OrderRepository, OrderSummaryRow};
use crate::{Result, StoreError};

#[derive(Default)]
struct Inner {
    products: HashMap<ProductId, Product>,
    customers: HashMap<CustomerId, Customer>,
    orders: HashMap<OrderId, Order>,
}

/// In-memory store implementation for tests and local development.
///
/// Provides the same interface and transactional guarantees as the
/// PostgreSQL implementation: every compound write happens under a single
/// write lock, so a finalization either commits all of its stock decrements
/// together with the status flip, or nothing at all.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn customer_name(&self, id: CustomerId) -> String {
        self.customers
            .get(&id)
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }

    fn summary_row(&self, order: &Order) -> OrderSummaryRow {
        OrderSummaryRow {
            id: order.id,
            created_at: order.created_at,
            total: order.total,
            status: order.status,
            customer_name: self.customer_name(order.customer_id),
        }
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn insert_product(&self, new: NewProduct) -> Result<Product> {
        let product = Product {
            id: ProductId::new(),
            name: new.name,
            description: new.description,
            price: new.price,
            stock: new.stock,
            created_at: Utc::now(),
        };
        let mut inner = self.inner.write().await;
        inner.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.inner.read().await.products.get(&id).cloned())
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.products.get(id).cloned())
            .collect())
    }

    async fn list_products(&self, limit: i64, offset: i64) -> Result<(Vec<Product>, i64)> {
        let inner = self.inner.read().await;
        let total = inner.products.len() as i64;

        let mut products: Vec<Product> = inner.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        let page = products
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn set_stock(&self, id: ProductId, stock: u32) -> Result<Option<Product>> {
        let mut inner = self.inner.write().await;
        Ok(inner.products.get_mut(&id).map(|product| {
            product.stock = stock;
            product.clone()
        }))
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        Ok(self.inner.write().await.products.remove(&id).is_some())
    }
}

#[async_trait]
impl CustomerDirectory for MemoryStore {
    async fn insert_customer(&self, new: NewCustomer) -> Result<Customer> {
        let mut inner = self.inner.write().await;
        if inner.customers.values().any(|c| c.email == new.email) {
            return Err(StoreError::DuplicateEmail(new.email));
        }

        let customer = Customer {
            id: CustomerId::new(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            created_at: Utc::now(),
        };
        inner.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        Ok(self.inner.read().await.customers.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>> {
        let inner = self.inner.read().await;
        Ok(inner.customers.values().find(|c| c.email == email).cloned())
    }

    async fn list_customers(&self) -> Result<Vec<Customer>> {
        let inner = self.inner.read().await;
        let mut customers: Vec<Customer> = inner.customers.values().cloned().collect();
        customers.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.email.cmp(&b.email)));
        Ok(customers)
    }

    async fn set_role(&self, id: CustomerId, role: Role) -> Result<Option<Customer>> {
        let mut inner = self.inner.write().await;
        Ok(inner.customers.get_mut(&id).map(|customer| {
            customer.role = role;
            customer.clone()
        }))
    }

    async fn delete_customer(&self, id: CustomerId) -> Result<bool> {
        Ok(self.inner.write().await.customers.remove(&id).is_some())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn insert_order(&self, new: NewOrder) -> Result<Order> {
        let mut inner = self.inner.write().await;
        if !inner.customers.contains_key(&new.customer_id) {
            return Err(StoreError::CustomerMissing(new.customer_id));
        }

        let order = Order {
            id: OrderId::new(),
            customer_id: new.customer_id,
            items: new.items,
            status: OrderStatus::Open,
            total: new.total,
            created_at: Utc::now(),
        };
        inner.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.inner.read().await.orders.get(&id).cloned())
    }

    async fn list_for_customer(&self, email: &str) -> Result<Vec<OrderSummaryRow>> {
        let inner = self.inner.read().await;
        let Some(customer) = inner.customers.values().find(|c| c.email == email) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<OrderSummaryRow> = inner
            .orders
            .values()
            .filter(|o| o.customer_id == customer.id)
            .map(|o| inner.summary_row(o))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn list_all(&self) -> Result<Vec<OrderSummaryRow>> {
        let inner = self.inner.read().await;
        let mut rows: Vec<OrderSummaryRow> =
            inner.orders.values().map(|o| inner.summary_row(o)).collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn cancel_order(&self, id: OrderId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let order = inner
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderMissing(id))?;
        if order.status != OrderStatus::Open {
            return Err(StoreError::OrderNotOpen(id));
        }
        order.status = OrderStatus::Cancelled;
        Ok(())
    }

    async fn finalize_order(&self, id: OrderId) -> Result<()> {
        let mut inner = self.inner.write().await;

        let order = inner.orders.get(&id).ok_or(StoreError::OrderMissing(id))?;
        if order.status != OrderStatus::Open {
            return Err(StoreError::OrderNotOpen(id));
        }
        // Aggregate quantities per product (an order may carry several items
        // for the same product) and validate everything before touching any
        // stock.
        let mut needed: Vec<(ProductId, u32)> = Vec::new();
        for item in &order.items {
            match needed.iter_mut().find(|(id, _)| *id == item.product_id) {
                Some((_, qty)) => *qty += item.quantity,
                None => needed.push((item.product_id, item.quantity)),
            }
        }

        for (product_id, quantity) in &needed {
            let product = inner.products.get(product_id).ok_or_else(|| {
                StoreError::Corrupt(format!("order item references missing product {product_id}"))
            })?;
            if product.stock < *quantity {
                return Err(StoreError::InsufficientStock {
                    product_id: *product_id,
                });
            }
        }

        for (product_id, quantity) in &needed {
            if let Some(product) = inner.products.get_mut(product_id) {
                product.stock -= quantity;
            }
        }
        if let Some(order) = inner.orders.get_mut(&id) {
            order.status = OrderStatus::Finalized;
        }
        Ok(())
    }

    async fn product_referenced(&self, id: ProductId) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .orders
            .values()
            .any(|o| o.items.iter().any(|i| i.product_id == id)))
    }

    async fn customer_has_orders(&self, id: CustomerId) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner.orders.values().any(|o| o.customer_id == id))
    }

    async fn revenue_total(&self) -> Result<Money> {
        let inner = self.inner.read().await;
        Ok(inner
            .orders
            .values()
            .filter(|o| o.status == OrderStatus::Finalized)
            .map(|o| o.total)
            .sum())
    }

    async fn order_count(&self) -> Result<u64> {
        Ok(self.inner.read().await.orders.len() as u64)
    }

    async fn order_count_by_status(&self, status: OrderStatus) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner.orders.values().filter(|o| o.status == status).count() as u64)
    }

    async fn top_products(&self, limit: usize) -> Result<Vec<ProductSales>> {
        let inner = self.inner.read().await;
        let mut units_by_name: HashMap<String, i64> = HashMap::new();
        for order in inner.orders.values() {
            for item in &order.items {
                let name = inner
                    .products
                    .get(&item.product_id)
                    .map(|p| p.name.clone())
                    .unwrap_or_default();
                *units_by_name.entry(name).or_default() += i64::from(item.quantity);
            }
        }

        let mut sales: Vec<ProductSales> = units_by_name
            .into_iter()
            .map(|(name, units)| ProductSales { name, units })
            .collect();
        sales.sort_by(|a, b| b.units.cmp(&a.units).then(a.name.cmp(&b.name)));
        sales.truncate(limit);
        Ok(sales)
    }

    async fn top_customers(&self, limit: usize) -> Result<Vec<CustomerActivity>> {
        let inner = self.inner.read().await;
        let mut orders_by_name: HashMap<String, i64> = HashMap::new();
        for order in inner.orders.values() {
            *orders_by_name
                .entry(inner.customer_name(order.customer_id))
                .or_default() += 1;
        }

        let mut activity: Vec<CustomerActivity> = orders_by_name
            .into_iter()
            .map(|(name, orders)| CustomerActivity { name, orders })
            .collect();
        activity.sort_by(|a, b| b.orders.cmp(&a.orders).then(a.name.cmp(&b.name)));
        activity.truncate(limit);
        Ok(activity)
    }
}
