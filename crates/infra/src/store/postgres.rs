//! Postgres-backed stores.
//!
//! The ledger's check-and-decrement is a single conditional `UPDATE`
//! (`... SET remaining = remaining - $q WHERE id = $id AND remaining >= $q`),
//! so the stock comparison and the write are one statement and per-product
//! serialization holds across server instances. A read-then-write in two
//! round trips would not be correct here.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use stockfront_catalog::{Product, ProductPatch};
use stockfront_core::{OrderId, ProductId, UserId};
use stockfront_orders::{CustomerInfo, LineItem, Order, OrderPatch};
use stockfront_parties::User;

use super::{OrderStore, ProductStore, ReserveError, StoreError, UserDirectory};

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn price_from_row(value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::backend("negative unit_price in storage"))
}

fn product_from_row(row: &sqlx::postgres::PgRow) -> Result<Product, StoreError> {
    Ok(Product {
        id: ProductId::from_uuid(row.get::<Uuid, _>("id")),
        name: row.get("name"),
        unit_price: price_from_row(row.get::<i64, _>("unit_price"))?,
        remaining: row.get("remaining"),
        description: row.get("description"),
    })
}

fn order_from_row(row: &sqlx::postgres::PgRow) -> Result<Order, StoreError> {
    let lines: Vec<LineItem> = serde_json::from_value(row.get::<serde_json::Value, _>("lines"))
        .map_err(|e| StoreError::backend(format!("malformed order lines: {e}")))?;
    Ok(Order {
        id: OrderId::from_uuid(row.get::<Uuid, _>("id")),
        placed_at: row.get::<DateTime<Utc>, _>("placed_at"),
        lines,
        customer: CustomerInfo {
            name: row.get("customer_name"),
            phone: row.get("phone_number"),
            address: row.get("address"),
        },
        total_amount: price_from_row(row.get::<i64, _>("total_amount"))?,
        user_id: row.get::<Option<Uuid>, _>("user_id").map(UserId::from_uuid),
    })
}

/// The three Postgres stores sharing one connection pool.
pub struct PgStores {
    pub products: Arc<PgProductStore>,
    pub orders: Arc<PgOrderStore>,
    pub users: Arc<PgUserDirectory>,
}

impl PgStores {
    /// Connect, ensure the schema exists, and hand back the stores.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(backend)?;
        ensure_schema(&pool).await?;
        let pool = Arc::new(pool);
        Ok(Self {
            products: Arc::new(PgProductStore { pool: pool.clone() }),
            orders: Arc::new(PgOrderStore { pool: pool.clone() }),
            users: Arc::new(PgUserDirectory { pool }),
        })
    }
}

async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id           UUID PRIMARY KEY,
            name         TEXT NOT NULL,
            unit_price   BIGINT NOT NULL CHECK (unit_price >= 0),
            remaining    BIGINT NOT NULL CHECK (remaining >= 0),
            description  TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(backend)?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id            UUID PRIMARY KEY,
            placed_at     TIMESTAMPTZ NOT NULL,
            lines         JSONB NOT NULL,
            customer_name TEXT NOT NULL,
            phone_number  TEXT NOT NULL,
            address       TEXT NOT NULL,
            total_amount  BIGINT NOT NULL CHECK (total_amount >= 0),
            user_id       UUID
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(backend)?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id          UUID PRIMARY KEY,
            name        TEXT NOT NULL,
            department  TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(backend)?;

    Ok(())
}

#[derive(Debug, Clone)]
pub struct PgProductStore {
    pool: Arc<PgPool>,
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn insert(&self, product: Product) -> Result<(), StoreError> {
        let unit_price = i64::try_from(product.unit_price)
            .map_err(|_| StoreError::backend("unit_price exceeds storage range"))?;
        sqlx::query(
            "INSERT INTO products (id, name, unit_price, remaining, description)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(*product.id.as_uuid())
        .bind(&product.name)
        .bind(unit_price)
        .bind(product.remaining)
        .bind(&product.description)
        .execute(&*self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, unit_price, remaining, description FROM products WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(backend)?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query(
            "SELECT id, name, unit_price, remaining, description
             FROM products WHERE id = ANY($1)",
        )
        .bind(&uuids)
        .fetch_all(&*self.pool)
        .await
        .map_err(backend)?;
        rows.iter().map(product_from_row).collect()
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, unit_price, remaining, description
             FROM products ORDER BY id DESC",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(backend)?;
        rows.iter().map(product_from_row).collect()
    }

    async fn update(&self, id: ProductId, patch: ProductPatch) -> Result<Product, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let row = sqlx::query(
            "SELECT id, name, unit_price, remaining, description
             FROM products WHERE id = $1 FOR UPDATE",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?
        .ok_or(StoreError::NotFound)?;

        let mut product = product_from_row(&row)?;
        patch.apply(&mut product)?;

        let unit_price = i64::try_from(product.unit_price)
            .map_err(|_| StoreError::backend("unit_price exceeds storage range"))?;
        sqlx::query(
            "UPDATE products SET name = $2, unit_price = $3, remaining = $4, description = $5
             WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .bind(&product.name)
        .bind(unit_price)
        .bind(product.remaining)
        .bind(&product.description)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;
        tx.commit().await.map_err(backend)?;
        Ok(product)
    }

    async fn delete(&self, id: ProductId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn reserve(&self, id: ProductId, quantity: i64) -> Result<i64, ReserveError> {
        if quantity < 1 {
            return Err(ReserveError::InvalidQuantity(quantity));
        }
        // Check and decrement in one statement.
        let row = sqlx::query(
            "UPDATE products SET remaining = remaining - $2
             WHERE id = $1 AND remaining >= $2
             RETURNING remaining",
        )
        .bind(*id.as_uuid())
        .bind(quantity)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| ReserveError::Store(backend(e)))?;

        if let Some(row) = row {
            return Ok(row.get::<i64, _>("remaining"));
        }

        // Did not match: distinguish a missing product from a short one.
        let available = sqlx::query("SELECT remaining FROM products WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| ReserveError::Store(backend(e)))?;
        match available {
            None => Err(ReserveError::ProductNotFound(id)),
            Some(row) => Err(ReserveError::InsufficientStock {
                product_id: id,
                requested: quantity,
                available: row.get::<i64, _>("remaining"),
            }),
        }
    }

    async fn release(&self, id: ProductId, quantity: i64) -> Result<i64, ReserveError> {
        if quantity < 1 {
            return Err(ReserveError::InvalidQuantity(quantity));
        }
        let row = sqlx::query(
            "UPDATE products SET remaining = remaining + $2 WHERE id = $1 RETURNING remaining",
        )
        .bind(*id.as_uuid())
        .bind(quantity)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| ReserveError::Store(backend(e)))?;
        match row {
            Some(row) => Ok(row.get::<i64, _>("remaining")),
            None => Err(ReserveError::ProductNotFound(id)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: Arc<PgPool>,
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: Order) -> Result<(), StoreError> {
        let lines = serde_json::to_value(&order.lines)
            .map_err(|e| StoreError::backend(format!("serialize order lines: {e}")))?;
        let total = i64::try_from(order.total_amount)
            .map_err(|_| StoreError::backend("total_amount exceeds storage range"))?;
        sqlx::query(
            "INSERT INTO orders
                 (id, placed_at, lines, customer_name, phone_number, address, total_amount, user_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(*order.id.as_uuid())
        .bind(order.placed_at)
        .bind(lines)
        .bind(&order.customer.name)
        .bind(&order.customer.phone)
        .bind(&order.customer.address)
        .bind(total)
        .bind(order.user_id.map(|u| *u.as_uuid()))
        .execute(&*self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(
            "SELECT id, placed_at, lines, customer_name, phone_number, address, total_amount, user_id
             FROM orders WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(backend)?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, placed_at, lines, customer_name, phone_number, address, total_amount, user_id
             FROM orders ORDER BY placed_at DESC, id DESC",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(backend)?;
        rows.iter().map(order_from_row).collect()
    }

    async fn update(&self, id: OrderId, patch: OrderPatch) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let row = sqlx::query(
            "SELECT id, placed_at, lines, customer_name, phone_number, address, total_amount, user_id
             FROM orders WHERE id = $1 FOR UPDATE",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?
        .ok_or(StoreError::NotFound)?;

        let mut order = order_from_row(&row)?;
        patch.apply(&mut order)?;

        // Only the whitelisted contact fields are written back.
        sqlx::query(
            "UPDATE orders SET customer_name = $2, phone_number = $3, address = $4 WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .bind(&order.customer.name)
        .bind(&order.customer.phone)
        .bind(&order.customer.address)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;
        tx.commit().await.map_err(backend)?;
        Ok(order)
    }

    async fn delete(&self, id: OrderId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PgUserDirectory {
    pool: Arc<PgPool>,
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn insert(&self, user: User) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO users (id, name, department) VALUES ($1, $2, $3)")
            .bind(*user.id.as_uuid())
            .bind(&user.name)
            .bind(&user.department)
            .execute(&*self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("SELECT id, name, department FROM users WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(backend)?;
        Ok(row.map(|row| User {
            id: UserId::from_uuid(row.get::<Uuid, _>("id")),
            name: row.get("name"),
            department: row.get("department"),
        }))
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query("SELECT id, name, department FROM users ORDER BY id DESC")
            .fetch_all(&*self.pool)
            .await
            .map_err(backend)?;
        Ok(rows
            .into_iter()
            .map(|row| User {
                id: UserId::from_uuid(row.get::<Uuid, _>("id")),
                name: row.get("name"),
                department: row.get("department"),
            })
            .collect())
    }
}
