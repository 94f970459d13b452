//! Store selection and service construction.
//!
//! `DATABASE_URL` set → Postgres-backed stores (schema ensured on connect);
//! unset → in-memory stores, which is what dev and the black-box tests use.

use std::sync::Arc;

use stockfront_infra::placement::OrderPlacement;
use stockfront_infra::store::{
    InMemoryOrderStore, InMemoryProductStore, InMemoryUserDirectory, OrderStore, PgStores,
    ProductStore, StoreError, UserDirectory,
};
use stockfront_infra::view::OrderViewComposer;

pub struct AppServices {
    pub products: Arc<dyn ProductStore>,
    pub orders: Arc<dyn OrderStore>,
    pub users: Arc<dyn UserDirectory>,
    pub placement: OrderPlacement,
    pub composer: OrderViewComposer,
}

impl AppServices {
    pub fn from_stores(
        products: Arc<dyn ProductStore>,
        orders: Arc<dyn OrderStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        let placement = OrderPlacement::new(products.clone(), orders.clone());
        let composer = OrderViewComposer::new(orders.clone(), products.clone(), users.clone());
        Self {
            products,
            orders,
            users,
            placement,
            composer,
        }
    }

    /// In-memory services, one isolated world per call.
    pub fn in_memory() -> Self {
        Self::from_stores(
            Arc::new(InMemoryProductStore::new()),
            Arc::new(InMemoryOrderStore::new()),
            Arc::new(InMemoryUserDirectory::new()),
        )
    }
}

pub async fn build_services() -> Result<AppServices, StoreError> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => {
            tracing::info!("using postgres stores");
            let stores = PgStores::connect(&url).await?;
            Ok(AppServices::from_stores(
                stores.products,
                stores.orders,
                stores.users,
            ))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; using in-memory stores");
            Ok(AppServices::in_memory())
        }
    }
}
