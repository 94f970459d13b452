//! Storage interfaces consumed by the coordinator, the composer, and the
//! HTTP glue. Backends: in-memory (tests/dev) and Postgres.

use async_trait::async_trait;
use thiserror::Error;

use stockfront_catalog::{Product, ProductPatch};
use stockfront_core::{DomainError, OrderId, ProductId, UserId};
use stockfront_orders::{Order, OrderPatch};
use stockfront_parties::User;

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryOrderStore, InMemoryProductStore, InMemoryUserDirectory};
pub use postgres::{PgOrderStore, PgProductStore, PgStores, PgUserDirectory};

/// Storage-layer error shared by all stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed record does not exist.
    #[error("not found")]
    NotFound,

    /// A domain rule rejected the write (e.g. a patch failed validation).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The backend itself failed (connection, serialization, constraint).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Failure of an inventory ledger operation.
///
/// `InsufficientStock` carries both quantities so callers can react (e.g.
/// offer the available amount) instead of showing a generic failure.
#[derive(Debug, Error)]
pub enum ReserveError {
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    #[error("ledger quantity must be >= 1, got {0}")]
    InvalidQuantity(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Product catalog plus the inventory ledger over it.
///
/// `reserve`/`release` are the only paths order placement uses to touch
/// stock; the CRUD methods are catalog-management glue.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert(&self, product: Product) -> Result<(), StoreError>;
    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError>;
    /// Fetch several products at once. Unknown ids are silently skipped.
    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError>;
    /// All products, newest first.
    async fn list(&self) -> Result<Vec<Product>, StoreError>;
    async fn update(&self, id: ProductId, patch: ProductPatch) -> Result<Product, StoreError>;
    async fn delete(&self, id: ProductId) -> Result<(), StoreError>;

    /// Atomically check and decrement stock on behalf of a pending order.
    ///
    /// Behaves as if serialized per product: the existence check, the
    /// stock comparison, and the decrement happen as one operation, so two
    /// concurrent reservations can never jointly take more than is
    /// available. Returns the new stock level.
    async fn reserve(&self, id: ProductId, quantity: i64) -> Result<i64, ReserveError>;

    /// Inverse of [`reserve`](Self::reserve): restore stock after a failed
    /// or aborted order attempt. Call at most once per successful reserve.
    async fn release(&self, id: ProductId, quantity: i64) -> Result<i64, ReserveError>;
}

/// Persistence for committed orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: Order) -> Result<(), StoreError>;
    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError>;
    /// All orders, newest first.
    async fn list(&self) -> Result<Vec<Order>, StoreError>;
    /// Apply a whitelisted contact-field patch. Lines and total are not
    /// updatable through any store path.
    async fn update(&self, id: OrderId, patch: OrderPatch) -> Result<Order, StoreError>;
    async fn delete(&self, id: OrderId) -> Result<(), StoreError>;
}

/// Read-mostly user directory; consulted only for view denormalization and
/// the thin user CRUD glue.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn insert(&self, user: User) -> Result<(), StoreError>;
    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError>;
    async fn list(&self) -> Result<Vec<User>, StoreError>;
}
