//! Order placement coordination: validate, reserve stock per line, persist,
//! all-or-nothing.
//!
//! The call proceeds Validating → ReservingItem(i) → AllReserved →
//! Persisting → Committed; any failure branches to Aborting, which releases
//! every reservation this call made (reverse order) before the error is
//! surfaced. Stock is therefore never left partially reserved by a failed
//! call, and no order record exists unless every line was reserved and the
//! insert committed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, warn};

use stockfront_core::{DomainError, OrderId, ProductId};
use stockfront_orders::{total_amount, LineItem, Order, OrderDraft};

use crate::store::{OrderStore, ProductStore, ReserveError, StoreError};

const PERSIST_ATTEMPTS: u32 = 3;
const DEFAULT_PERSIST_TIMEOUT: Duration = Duration::from_secs(5);

/// Failure taxonomy surfaced by [`OrderPlacement::place_order`].
///
/// Every variant except `Persistence` is raised before or during
/// reservation; `Persistence` means all reservations succeeded, the insert
/// then failed past its retry budget, and compensation already ran.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    /// A request field failed validation. No side effects occurred.
    #[error("validation failed for field '{0}'")]
    Validation(String),

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

    /// The order record could not be persisted. All reservations were
    /// released before this surfaced.
    #[error("order persistence failed: {0}")]
    Persistence(String),
}

impl From<ReserveError> for PlaceOrderError {
    fn from(err: ReserveError) -> Self {
        match err {
            ReserveError::ProductNotFound(id) => Self::ProductNotFound(id),
            ReserveError::InsufficientStock {
                product_id,
                requested,
                available,
            } => Self::InsufficientStock {
                product_id,
                requested,
                available,
            },
            ReserveError::InvalidQuantity(_) => Self::Validation("quantity".to_string()),
            ReserveError::Store(e) => Self::Persistence(e.to_string()),
        }
    }
}

impl From<DomainError> for PlaceOrderError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(field) => Self::Validation(field),
            other => Self::Validation(other.to_string()),
        }
    }
}

/// The order transaction coordinator.
///
/// Stores are injected at construction and scoped to this coordinator; a
/// `place_order` call is one logical unit of work and holds no state across
/// calls.
pub struct OrderPlacement {
    products: Arc<dyn ProductStore>,
    orders: Arc<dyn OrderStore>,
    persist_timeout: Duration,
}

impl OrderPlacement {
    pub fn new(products: Arc<dyn ProductStore>, orders: Arc<dyn OrderStore>) -> Self {
        Self {
            products,
            orders,
            persist_timeout: DEFAULT_PERSIST_TIMEOUT,
        }
    }

    /// Override the per-attempt persistence timeout.
    pub fn with_persist_timeout(mut self, timeout: Duration) -> Self {
        self.persist_timeout = timeout;
        self
    }

    /// Place an order: all line items reserved and the record persisted, or
    /// nothing at all.
    pub async fn place_order(&self, draft: OrderDraft) -> Result<Order, PlaceOrderError> {
        draft.validate()?;

        let mut reserved: Vec<LineItem> = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            match self.products.reserve(line.product_id, line.quantity).await {
                Ok(level) => {
                    debug!(product_id = %line.product_id, quantity = line.quantity, remaining = level, "reserved line item");
                    reserved.push(*line);
                }
                Err(e) => {
                    self.release_all(&reserved).await;
                    return Err(e.into());
                }
            }
        }

        let order = match self.price_and_build(&draft).await {
            Ok(order) => order,
            Err(e) => {
                self.release_all(&reserved).await;
                return Err(e);
            }
        };

        if let Err(e) = self.persist(&order).await {
            self.release_all(&reserved).await;
            return Err(e);
        }

        debug!(order_id = %order.id, total = order.total_amount, lines = order.lines.len(), "order committed");
        Ok(order)
    }

    /// Build the order record, recomputing the total from current unit
    /// prices. The client-declared total is informational only.
    async fn price_and_build(&self, draft: &OrderDraft) -> Result<Order, PlaceOrderError> {
        let mut ids: Vec<ProductId> = Vec::new();
        for line in &draft.lines {
            if !ids.contains(&line.product_id) {
                ids.push(line.product_id);
            }
        }
        let products = self
            .products
            .get_many(&ids)
            .await
            .map_err(|e| PlaceOrderError::Persistence(e.to_string()))?;

        let total = total_amount(&draft.lines, |id| {
            products.iter().find(|p| p.id == id).map(|p| p.unit_price)
        })?;

        if let Some(declared) = draft.declared_total {
            if declared != total {
                warn!(declared, computed = total, "client-declared total ignored; using computed total");
            }
        }

        Ok(Order {
            id: OrderId::new(),
            placed_at: Utc::now(),
            lines: draft.lines.clone(),
            customer: draft.customer.clone(),
            total_amount: total,
            user_id: draft.user_id,
        })
    }

    /// Persist with a bounded timeout and a bounded number of attempts.
    async fn persist(&self, order: &Order) -> Result<(), PlaceOrderError> {
        let mut last_failure = String::new();
        for attempt in 1..=PERSIST_ATTEMPTS {
            match tokio::time::timeout(self.persist_timeout, self.orders.insert(order.clone()))
                .await
            {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(StoreError::Domain(e))) => {
                    // Deterministic rejection; retrying cannot help.
                    return Err(PlaceOrderError::Persistence(e.to_string()));
                }
                Ok(Err(e)) => {
                    warn!(order_id = %order.id, attempt, error = %e, "order insert failed");
                    last_failure = e.to_string();
                }
                Err(_) => {
                    warn!(order_id = %order.id, attempt, timeout = ?self.persist_timeout, "order insert timed out");
                    last_failure = format!("timed out after {:?}", self.persist_timeout);
                }
            }
        }
        Err(PlaceOrderError::Persistence(last_failure))
    }

    /// Compensation: undo every reservation this call made, newest first.
    /// Called exactly once per aborted call, with exactly the lines that
    /// were successfully reserved.
    async fn release_all(&self, reserved: &[LineItem]) {
        for line in reserved.iter().rev() {
            if let Err(e) = self.products.release(line.product_id, line.quantity).await {
                // Nothing further to do inside this request; the failure is
                // loud so operators can reconcile the counter.
                error!(product_id = %line.product_id, quantity = line.quantity, error = %e, "failed to release reservation");
            }
        }
    }
}
