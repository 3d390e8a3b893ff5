//! Order lifecycle engine.
//!
//! Creation snapshots unit prices from the catalog and never touches stock;
//! stock is checked and decremented only when an Open order is finalized,
//! and that commit is all-or-nothing. Cancellation has no stock effect.

use std::collections::HashMap;

use common::{Money, OrderId, OrderStatus, ProductId};
use serde::Deserialize;
use store::{CommerceStore, NewOrder, Order, OrderItem, StoreError};

use crate::error::DomainError;
use crate::policy::{self, Caller, Capability};
use crate::views::{OrderCreated, OrderDetail, OrderItemView, OrderSummary};

/// One requested order line: which product, how many.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemInput {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Service for creating orders, transitioning their status, and reading
/// them back.
pub struct OrderService<S> {
    store: S,
}

impl<S: CommerceStore> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates an Open order owned by the customer with the given email.
    ///
    /// Every product must exist; the whole operation fails before anything
    /// is persisted otherwise. Unit prices are snapshotted from the
    /// catalog's current prices and the total is computed in exact cents.
    /// Stock is not checked and not reserved here.
    #[tracing::instrument(skip(self, items))]
    pub async fn create_order(
        &self,
        customer_email: &str,
        items: &[OrderItemInput],
    ) -> Result<OrderCreated, DomainError> {
        if items.is_empty() {
            return Err(DomainError::Invalid(
                "order must contain at least one item".to_string(),
            ));
        }
        if let Some(bad) = items.iter().find(|i| i.quantity == 0) {
            return Err(DomainError::Invalid(format!(
                "item quantity must be greater than zero (product {})",
                bad.product_id
            )));
        }

        let customer = self
            .store
            .find_by_email(customer_email)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "customer",
                id: customer_email.to_string(),
            })?;

        let ids: Vec<ProductId> = items.iter().map(|i| i.product_id).collect();
        let products: HashMap<ProductId, store::Product> = self
            .store
            .get_products(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut snapshots = Vec::with_capacity(items.len());
        let mut total = Money::zero();
        for item in items {
            let product =
                products
                    .get(&item.product_id)
                    .ok_or_else(|| DomainError::NotFound {
                        entity: "product",
                        id: item.product_id.to_string(),
                    })?;
            snapshots.push(OrderItem {
                product_id: product.id,
                quantity: item.quantity,
                unit_price: product.price,
            });
            total += product.price.multiply(item.quantity);
        }

        let order = self
            .store
            .insert_order(NewOrder {
                customer_id: customer.id,
                items: snapshots,
                total,
            })
            .await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id, customer = %customer.email, total = %order.total, "order created");

        Ok(OrderCreated {
            id: order.id,
            status: order.status,
        })
    }

    /// Transitions an Open order to Finalized or Cancelled.
    ///
    /// Finalization verifies and decrements stock for every item as one
    /// atomic commit; the first insufficient product aborts the whole
    /// transition with nothing written. Terminal orders reject any further
    /// transition.
    #[tracing::instrument(skip(self))]
    pub async fn set_status(
        &self,
        id: OrderId,
        target: OrderStatus,
    ) -> Result<OrderSummary, DomainError> {
        let order = self.load_order(id).await?;
        if !order.status.is_open() {
            return Err(DomainError::NotOpen {
                status: order.status,
            });
        }

        match target {
            OrderStatus::Open => {
                return Err(DomainError::Invalid(
                    "an order cannot transition back to Open".to_string(),
                ));
            }
            OrderStatus::Finalized => match self.store.finalize_order(id).await {
                Ok(()) => {
                    metrics::counter!("orders_finalized_total").increment(1);
                }
                Err(StoreError::InsufficientStock { product_id }) => {
                    metrics::counter!("stock_conflicts_total").increment(1);
                    let product = self
                        .store
                        .get_product(product_id)
                        .await?
                        .map(|p| p.name)
                        .unwrap_or_else(|| product_id.to_string());
                    return Err(DomainError::InsufficientStock { product });
                }
                Err(e) => return Err(e.into()),
            },
            OrderStatus::Cancelled => {
                self.store.cancel_order(id).await?;
                metrics::counter!("orders_cancelled_total").increment(1);
            }
        }

        let order = self.load_order(id).await?;
        let customer_name = self
            .store
            .get_customer(order.customer_id)
            .await?
            .map(|c| c.name)
            .unwrap_or_default();
        tracing::info!(order_id = %id, status = %order.status, "order status changed");

        Ok(OrderSummary {
            id: order.id,
            created_at: order.created_at,
            total_cents: order.total,
            status: order.status,
            customer_name,
        })
    }

    /// Loads an order with items and resolved product names.
    ///
    /// Post-authorization: the ownership decision needs the loaded order,
    /// so the policy predicate runs after the fetch. Non-owners without a
    /// managerial role get `Forbidden`.
    #[tracing::instrument(skip(self, caller))]
    pub async fn get_order(&self, id: OrderId, caller: &Caller) -> Result<OrderDetail, DomainError> {
        let order = self.load_order(id).await?;
        let customer = self
            .store
            .get_customer(order.customer_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "customer",
                id: order.customer_id.to_string(),
            })?;

        if !policy::can_view_order(caller, &customer.email) {
            return Err(DomainError::Forbidden);
        }

        let ids: Vec<ProductId> = order.items.iter().map(|i| i.product_id).collect();
        let names: HashMap<ProductId, String> = self
            .store
            .get_products(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        let items = order
            .items
            .iter()
            .map(|item| OrderItemView {
                product_id: item.product_id,
                product_name: names
                    .get(&item.product_id)
                    .cloned()
                    .unwrap_or_else(|| item.product_id.to_string()),
                quantity: item.quantity,
                unit_price_cents: item.unit_price,
            })
            .collect();

        Ok(OrderDetail {
            id: order.id,
            customer_name: customer.name,
            customer_email: customer.email,
            status: order.status,
            total_cents: order.total,
            created_at: order.created_at,
            items,
        })
    }

    /// Lists order summaries: all orders for managerial callers, the
    /// caller's own orders (newest first) otherwise.
    #[tracing::instrument(skip(self, caller))]
    pub async fn list_orders(&self, caller: &Caller) -> Result<Vec<OrderSummary>, DomainError> {
        let rows = if policy::allows(caller.role, Capability::ViewAllOrders) {
            self.store.list_all().await?
        } else {
            self.store.list_for_customer(&caller.email).await?
        };
        Ok(rows.into_iter().map(OrderSummary::from).collect())
    }

    async fn load_order(&self, id: OrderId) -> Result<Order, DomainError> {
        self.store
            .get_order(id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "order",
                id: id.to_string(),
            })
    }
}
