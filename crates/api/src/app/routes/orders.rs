use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    routing::post,
    Json, Router,
};
use serde_json::json;

use stockfront_core::{OrderId, UserId};
use stockfront_orders::{CustomerInfo, LineItem, OrderDraft, OrderPatch};

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().nest("/orders", orders_router())
}

fn orders_router() -> Router {
    Router::new()
        .route("/", post(place_order).get(list_orders))
        .route("/:id", get(get_order).patch(update_order).delete(delete_order))
}

pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::PlaceOrderRequest>,
) -> axum::response::Response {
    let mut lines = Vec::with_capacity(body.lines.len());
    for line in &body.lines {
        let product_id = match line.product_id.parse() {
            Ok(id) => id,
            Err(_) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_id",
                    format!("invalid product id '{}'", line.product_id),
                )
            }
        };
        lines.push(LineItem {
            product_id,
            quantity: line.quantity,
        });
    }

    let user_id = match body.user_id.as_deref() {
        Some(raw) => match raw.parse::<UserId>() {
            Ok(id) => Some(id),
            Err(_) => {
                return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid user id")
            }
        },
        None => None,
    };

    let draft = OrderDraft {
        lines,
        customer: CustomerInfo {
            name: body.customer_name,
            phone: body.phone_number,
            address: body.address,
        },
        user_id,
        declared_total: body.total_amount,
    };

    let order = match services.placement.place_order(draft).await {
        Ok(order) => order,
        Err(e) => return errors::place_order_error_to_response(e),
    };

    match services.composer.compose_one(order.id).await {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(e) => errors::compose_error_to_response(e),
    }
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.composer.compose_all().await {
        Ok(views) => (StatusCode::OK, Json(json!({"rows": views}))).into_response(),
        Err(e) => errors::compose_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id: OrderId = match id.parse() {
        Ok(id) => id,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id")
        }
    };

    match services.composer.compose_one(order_id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::compose_error_to_response(e),
    }
}

pub async fn update_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateOrderRequest>,
) -> axum::response::Response {
    let order_id: OrderId = match id.parse() {
        Ok(id) => id,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id")
        }
    };

    let patch = OrderPatch {
        customer_name: body.customer_name,
        phone_number: body.phone_number,
        address: body.address,
    };

    if let Err(e) = services.orders.update(order_id, patch).await {
        return errors::store_error_to_response(e);
    }

    match services.composer.compose_one(order_id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::compose_error_to_response(e),
    }
}

pub async fn delete_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id: OrderId = match id.parse() {
        Ok(id) => id,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id")
        }
    };

    match services.orders.delete(order_id).await {
        Ok(()) => (StatusCode::OK, Json(json!({"message": "order deleted"}))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
