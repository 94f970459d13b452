//! In-memory stores.
//!
//! Intended for tests/dev. The ledger's check-and-decrement runs inside one
//! write-lock critical section, which gives the same per-product
//! serialization the Postgres conditional update gives.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use stockfront_catalog::{Product, ProductPatch};
use stockfront_core::{OrderId, ProductId, UserId};
use stockfront_orders::{Order, OrderPatch};
use stockfront_parties::User;

use super::{OrderStore, ProductStore, ReserveError, StoreError, UserDirectory};

fn poisoned() -> StoreError {
    StoreError::backend("lock poisoned")
}

#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn insert(&self, product: Product) -> Result<(), StoreError> {
        let mut products = self.products.write().map_err(|_| poisoned())?;
        products.insert(product.id, product);
        Ok(())
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let products = self.products.read().map_err(|_| poisoned())?;
        Ok(products.get(&id).cloned())
    }

    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        let products = self.products.read().map_err(|_| poisoned())?;
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let products = self.products.read().map_err(|_| poisoned())?;
        let mut all: Vec<Product> = products.values().cloned().collect();
        // UUIDv7 ids are time-ordered; descending id = newest first.
        all.sort_by(|a, b| b.id.as_uuid().cmp(a.id.as_uuid()));
        Ok(all)
    }

    async fn update(&self, id: ProductId, patch: ProductPatch) -> Result<Product, StoreError> {
        let mut products = self.products.write().map_err(|_| poisoned())?;
        let product = products.get_mut(&id).ok_or(StoreError::NotFound)?;
        let mut updated = product.clone();
        patch.apply(&mut updated)?;
        *product = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, id: ProductId) -> Result<(), StoreError> {
        let mut products = self.products.write().map_err(|_| poisoned())?;
        products.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }

    async fn reserve(&self, id: ProductId, quantity: i64) -> Result<i64, ReserveError> {
        if quantity < 1 {
            return Err(ReserveError::InvalidQuantity(quantity));
        }
        let mut products = self.products.write().map_err(|_| poisoned())?;
        let product = products.get_mut(&id).ok_or(ReserveError::ProductNotFound(id))?;
        if product.remaining < quantity {
            return Err(ReserveError::InsufficientStock {
                product_id: id,
                requested: quantity,
                available: product.remaining,
            });
        }
        product.remaining -= quantity;
        Ok(product.remaining)
    }

    async fn release(&self, id: ProductId, quantity: i64) -> Result<i64, ReserveError> {
        if quantity < 1 {
            return Err(ReserveError::InvalidQuantity(quantity));
        }
        let mut products = self.products.write().map_err(|_| poisoned())?;
        let product = products.get_mut(&id).ok_or(ReserveError::ProductNotFound(id))?;
        product.remaining += quantity;
        Ok(product.remaining)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<(), StoreError> {
        let mut orders = self.orders.write().map_err(|_| poisoned())?;
        orders.insert(order.id, order);
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let orders = self.orders.read().map_err(|_| poisoned())?;
        Ok(orders.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().map_err(|_| poisoned())?;
        let mut all: Vec<Order> = orders.values().cloned().collect();
        all.sort_by(|a, b| {
            b.placed_at
                .cmp(&a.placed_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        Ok(all)
    }

    async fn update(&self, id: OrderId, patch: OrderPatch) -> Result<Order, StoreError> {
        let mut orders = self.orders.write().map_err(|_| poisoned())?;
        let order = orders.get_mut(&id).ok_or(StoreError::NotFound)?;
        let mut updated = order.clone();
        patch.apply(&mut updated)?;
        *order = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, id: OrderId) -> Result<(), StoreError> {
        let mut orders = self.orders.write().map_err(|_| poisoned())?;
        orders.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn insert(&self, user: User) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        users.insert(user.id, user);
        Ok(())
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|a, b| b.id.as_uuid().cmp(a.id.as_uuid()));
        Ok(all)
    }
}
