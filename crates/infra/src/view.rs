//! Read-side composition of orders into denormalized views.
//!
//! A view is computed at read time against the *current* catalog and
//! directory: product snapshots reflect price/description changes made after
//! the order was placed. That staleness is accepted behavior, not a bug —
//! the quantities and total captured at commit time are what the order
//! actually bought.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use stockfront_catalog::Product;
use stockfront_core::{OrderId, ProductId};
use stockfront_orders::{CustomerInfo, Order};
use stockfront_parties::User;

use crate::store::{OrderStore, ProductStore, StoreError, UserDirectory};

/// One line of a composed view: the stored quantity plus the current product
/// snapshot. `product` is absent when the product no longer exists in the
/// catalog; that is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineView {
    pub product_id: ProductId,
    pub quantity: i64,
    pub product: Option<Product>,
}

/// A denormalized, read-only projection of one order. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub placed_at: DateTime<Utc>,
    pub lines: Vec<LineView>,
    pub customer: CustomerInfo,
    pub total_amount: u64,
    /// Full record of the placing user, when the order carries a reference
    /// and the directory still knows it.
    pub user: Option<User>,
}

#[derive(Debug, Error)]
pub enum ComposeError {
    /// Read of an unknown order id; distinct from an empty list.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Joins committed orders with the product catalog and the user directory.
/// Owns no data and performs no mutation; safe to run against a replica.
pub struct OrderViewComposer {
    orders: Arc<dyn OrderStore>,
    products: Arc<dyn ProductStore>,
    users: Arc<dyn UserDirectory>,
}

impl OrderViewComposer {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        products: Arc<dyn ProductStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            orders,
            products,
            users,
        }
    }

    /// Compose every committed order, newest first.
    pub async fn compose_all(&self) -> Result<Vec<OrderView>, ComposeError> {
        let orders = self.orders.list().await?;
        self.compose(orders).await.map_err(ComposeError::from)
    }

    /// Compose a single order, or report that the id is unknown.
    pub async fn compose_one(&self, id: OrderId) -> Result<OrderView, ComposeError> {
        let order = self
            .orders
            .get(id)
            .await?
            .ok_or(ComposeError::OrderNotFound(id))?;
        let mut views = self.compose(vec![order]).await?;
        views.pop().ok_or(ComposeError::OrderNotFound(id))
    }

    async fn compose(&self, orders: Vec<Order>) -> Result<Vec<OrderView>, StoreError> {
        // One keyed lookup map per call: exact-id match, never positional.
        let mut ids: Vec<ProductId> = Vec::new();
        for order in &orders {
            for line in &order.lines {
                if !ids.contains(&line.product_id) {
                    ids.push(line.product_id);
                }
            }
        }
        let by_id: HashMap<ProductId, Product> = self
            .products
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            let user = match order.user_id {
                Some(user_id) => self.users.get(user_id).await?,
                None => None,
            };
            let lines = order
                .lines
                .iter()
                .map(|line| LineView {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    product: by_id.get(&line.product_id).cloned(),
                })
                .collect();
            views.push(OrderView {
                id: order.id,
                placed_at: order.placed_at,
                lines,
                customer: order.customer,
                total_amount: order.total_amount,
                user,
            });
        }
        Ok(views)
    }
}
