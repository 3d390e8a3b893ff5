use async_trait::async_trait;
use chrono::Utc;
use common::{CustomerId, Money, OrderId, OrderStatus, ProductId, Role};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::records::{
    Customer, CustomerActivity, NewCustomer, NewOrder, NewProduct, Order, OrderItem, Product,
    ProductSales,
};
use crate::store::{CatalogStore, CustomerDirectory, OrderRepository, OrderSummaryRow};
use crate::{Result, StoreError};

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: row.try_get::<i32, _>("stock")? as u32,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_customer(row: PgRow) -> Result<Customer> {
        let role: String = row.try_get("role")?;
        Ok(Customer {
            id: CustomerId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: role
                .parse::<Role>()
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_summary(row: PgRow) -> Result<OrderSummaryRow> {
        let status: String = row.try_get("status")?;
        Ok(OrderSummaryRow {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            created_at: row.try_get("created_at")?,
            total: Money::from_cents(row.try_get("total_cents")?),
            status: status
                .parse::<OrderStatus>()
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            customer_name: row.try_get("customer_name")?,
        })
    }

    async fn load_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(OrderItem {
                    product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
                    quantity: row.try_get::<i32, _>("quantity")? as u32,
                    unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
                })
            })
            .collect()
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn insert_product(&self, new: NewProduct) -> Result<Product> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price_cents, stock, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, description, price_cents, stock, created_at
            "#,
        )
        .bind(ProductId::new().as_uuid())
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.price.cents())
        .bind(new.stock as i32)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_product(row)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, description, price_cents, stock, created_at FROM products WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, price_cents, stock, created_at
            FROM products
            WHERE id = ANY($1)
            "#,
        )
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn list_products(&self, limit: i64, offset: i64) -> Result<(Vec<Product>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(
            r#"
            SELECT id, name, description, price_cents, stock, created_at
            FROM products
            ORDER BY name ASC, id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let products = rows
            .into_iter()
            .map(Self::row_to_product)
            .collect::<Result<Vec<_>>>()?;
        Ok((products, total))
    }

    async fn set_stock(&self, id: ProductId, stock: u32) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            UPDATE products SET stock = $2
            WHERE id = $1
            RETURNING id, name, description, price_cents, stock, created_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(stock as i32)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CustomerDirectory for PostgresStore {
    async fn insert_customer(&self, new: NewCustomer) -> Result<Customer> {
        let row = sqlx::query(
            r#"
            INSERT INTO customers (id, name, email, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, email, password_hash, role, created_at
            "#,
        )
        .bind(CustomerId::new().as_uuid())
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Unique violation on the email column surfaces as a conflict,
            // not an opaque database error.
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("customers_email_key")
            {
                return StoreError::DuplicateEmail(new.email.clone());
            }
            StoreError::Database(e)
        })?;

        Self::row_to_customer(row)
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query(
            "SELECT id, name, email, password_hash, role, created_at FROM customers WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_customer).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>> {
        let row = sqlx::query(
            "SELECT id, name, email, password_hash, role, created_at FROM customers WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_customer).transpose()
    }

    async fn list_customers(&self) -> Result<Vec<Customer>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, email, password_hash, role, created_at
            FROM customers
            ORDER BY created_at ASC, email ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_customer).collect()
    }

    async fn set_role(&self, id: CustomerId, role: Role) -> Result<Option<Customer>> {
        let row = sqlx::query(
            r#"
            UPDATE customers SET role = $2
            WHERE id = $1
            RETURNING id, name, email, password_hash, role, created_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_customer).transpose()
    }

    async fn delete_customer(&self, id: CustomerId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl OrderRepository for PostgresStore {
    async fn insert_order(&self, new: NewOrder) -> Result<Order> {
        let order_id = OrderId::new();
        let created_at = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, status, total_cents, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(new.customer_id.as_uuid())
        .bind(OrderStatus::Open.as_str())
        .bind(new.total.cents())
        .bind(created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("orders_customer_id_fkey")
            {
                return StoreError::CustomerMissing(new.customer_id);
            }
            StoreError::Database(e)
        })?;

        for item in &new.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(order_id.as_uuid())
            .bind(item.product_id.as_uuid())
            .bind(item.quantity as i32)
            .bind(item.unit_price.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Order {
            id: order_id,
            customer_id: new.customer_id,
            items: new.items,
            status: OrderStatus::Open,
            total: new.total,
            created_at,
        })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            "SELECT id, customer_id, status, total_cents, created_at FROM orders WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status: String = row.try_get("status")?;
        let order = Order {
            id,
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            items: self.load_items(id).await?,
            status: status
                .parse::<OrderStatus>()
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            total: Money::from_cents(row.try_get("total_cents")?),
            created_at: row.try_get("created_at")?,
        };
        Ok(Some(order))
    }

    async fn list_for_customer(&self, email: &str) -> Result<Vec<OrderSummaryRow>> {
        let rows = sqlx::query(
            r#"
            SELECT o.id, o.created_at, o.total_cents, o.status, c.name AS customer_name
            FROM orders o
            JOIN customers c ON c.id = o.customer_id
            WHERE c.email = $1
            ORDER BY o.created_at DESC, o.id DESC
            "#,
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_summary).collect()
    }

    async fn list_all(&self) -> Result<Vec<OrderSummaryRow>> {
        let rows = sqlx::query(
            r#"
            SELECT o.id, o.created_at, o.total_cents, o.status, c.name AS customer_name
            FROM orders o
            JOIN customers c ON c.id = o.customer_id
            ORDER BY o.created_at DESC, o.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_summary).collect()
    }

    async fn cancel_order(&self, id: OrderId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        match status.as_deref() {
            None => return Err(StoreError::OrderMissing(id)),
            Some("Open") => {}
            Some(_) => return Err(StoreError::OrderNotOpen(id)),
        }

        sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(OrderStatus::Cancelled.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn finalize_order(&self, id: OrderId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        match status.as_deref() {
            None => return Err(StoreError::OrderMissing(id)),
            Some("Open") => {}
            Some(_) => return Err(StoreError::OrderNotOpen(id)),
        }

        // Lock the product rows in deterministic id order so two
        // finalizations touching the same products cannot deadlock.
        let locked = sqlx::query(
            r#"
            SELECT id, stock
            FROM products
            WHERE id IN (SELECT product_id FROM order_items WHERE order_id = $1)
            ORDER BY id ASC
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *tx)
        .await?;

        // Quantities aggregated per product: an order may carry several
        // items for the same product. Validate everything against locked
        // stock before writing anything.
        let wanted = sqlx::query(
            r#"
            SELECT product_id, SUM(quantity) AS quantity
            FROM order_items
            WHERE order_id = $1
            GROUP BY product_id
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *tx)
        .await?;

        let mut decrements: Vec<(Uuid, i64)> = Vec::with_capacity(wanted.len());
        for row in wanted {
            let product_id: Uuid = row.try_get("product_id")?;
            let quantity: i64 = row.try_get("quantity")?;
            let stock: i64 = locked
                .iter()
                .find_map(|l| {
                    let id: Uuid = l.try_get("id").ok()?;
                    (id == product_id)
                        .then(|| l.try_get::<i32, _>("stock").ok().map(i64::from))
                        .flatten()
                })
                .ok_or_else(|| {
                    StoreError::Corrupt(format!(
                        "order item references missing product {product_id}"
                    ))
                })?;
            if stock < quantity {
                return Err(StoreError::InsufficientStock {
                    product_id: ProductId::from_uuid(product_id),
                });
            }
            decrements.push((product_id, quantity));
        }

        for (product_id, quantity) in decrements {
            sqlx::query("UPDATE products SET stock = stock - $2 WHERE id = $1")
                .bind(product_id)
                .bind(quantity as i32)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(OrderStatus::Finalized.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn product_referenced(&self, id: ProductId) -> Result<bool> {
        let referenced: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM order_items WHERE product_id = $1)")
                .bind(id.as_uuid())
                .fetch_one(&self.pool)
                .await?;
        Ok(referenced)
    }

    async fn customer_has_orders(&self, id: CustomerId) -> Result<bool> {
        let has_orders: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE customer_id = $1)")
                .bind(id.as_uuid())
                .fetch_one(&self.pool)
                .await?;
        Ok(has_orders)
    }

    async fn revenue_total(&self) -> Result<Money> {
        // SUM over BIGINT widens to NUMERIC, so cast back for the decode.
        let cents: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_cents), 0)::BIGINT FROM orders WHERE status = $1",
        )
        .bind(OrderStatus::Finalized.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::from_cents(cents))
    }

    async fn order_count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn order_count_by_status(&self, status: OrderStatus) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn top_products(&self, limit: usize) -> Result<Vec<ProductSales>> {
        let rows = sqlx::query(
            r#"
            SELECT p.name, SUM(oi.quantity) AS units
            FROM order_items oi
            JOIN products p ON p.id = oi.product_id
            GROUP BY p.name
            ORDER BY units DESC, p.name ASC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(ProductSales {
                    name: row.try_get("name")?,
                    units: row.try_get("units")?,
                })
            })
            .collect()
    }

    async fn top_customers(&self, limit: usize) -> Result<Vec<CustomerActivity>> {
        let rows = sqlx::query(
            r#"
            SELECT c.name, COUNT(*) AS orders
            FROM orders o
            JOIN customers c ON c.id = o.customer_id
            GROUP BY c.name
            ORDER BY orders DESC, c.name ASC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(CustomerActivity {
                    name: row.try_get("name")?,
                    orders: row.try_get("orders")?,
                })
            })
            .collect()
    }
}
