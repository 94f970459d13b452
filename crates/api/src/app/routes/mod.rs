use axum::Router;

pub mod orders;
pub mod products;
pub mod system;
pub mod users;

pub fn router() -> Router {
    Router::new()
        .merge(orders::router())
        .merge(products::router())
        .merge(users::router())
}
