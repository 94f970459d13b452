use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockfront_core::DomainError;
use stockfront_infra::placement::PlaceOrderError;
use stockfront_infra::store::StoreError;
use stockfront_infra::view::ComposeError;

pub fn place_order_error_to_response(err: PlaceOrderError) -> axum::response::Response {
    match err {
        PlaceOrderError::Validation(field) => (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({
                "error": "validation_error",
                "field": field,
            })),
        )
            .into_response(),
        PlaceOrderError::ProductNotFound(id) => (
            StatusCode::NOT_FOUND,
            axum::Json(json!({
                "error": "product_not_found",
                "product_id": id.to_string(),
            })),
        )
            .into_response(),
        PlaceOrderError::InsufficientStock {
            product_id,
            requested,
            available,
        } => (
            StatusCode::CONFLICT,
            axum::Json(json!({
                "error": "insufficient_stock",
                "product_id": product_id.to_string(),
                "requested": requested,
                "available": available,
            })),
        )
            .into_response(),
        PlaceOrderError::Persistence(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "persistence_error", msg)
        }
    }
}

pub fn compose_error_to_response(err: ComposeError) -> axum::response::Response {
    match err {
        ComposeError::OrderNotFound(_) => {
            json_error(StatusCode::NOT_FOUND, "not_found", "order not found")
        }
        ComposeError::Store(e) => store_error_to_response(e),
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        StoreError::Domain(e) => domain_error_to_response(e),
        StoreError::Backend(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(field) => (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({
                "error": "validation_error",
                "field": field,
            })),
        )
            .into_response(),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
