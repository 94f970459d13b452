use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::json;

use stockfront_api::app::services::AppServices;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory stores, ephemeral port.
        let app = stockfront_api::app::build_app(Arc::new(AppServices::in_memory()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn create_product(
    client: &reqwest::Client,
    base_url: &str,
    unit_price: u64,
    remaining: i64,
) -> serde_json::Value {
    let res = client
        .post(format!("{}/products", base_url))
        .json(&json!({
            "name": "Widget",
            "unit_price": unit_price,
            "remaining": remaining,
            "description": "a widget",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

fn order_body(product_id: &str, quantity: i64) -> serde_json::Value {
    json!({
        "lines": [{"product_id": product_id, "quantity": quantity}],
        "customer_name": "Ada Lovelace",
        "phone_number": "555-0101",
        "address": "1 Loop Rd",
    })
}

#[tokio::test]
async fn health_is_ok() {
    let server = TestServer::spawn().await;
    let res = reqwest::get(format!("{}/health", server.base_url))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn placing_an_order_returns_the_composed_view_and_decrements_stock() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let product = create_product(&client, &server.base_url, 100, 5).await;
    let product_id = product["id"].as_str().unwrap();

    let res = client
        .post(format!("{}/orders", server.base_url))
        .json(&order_body(product_id, 3))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let view: serde_json::Value = res.json().await.unwrap();

    assert_eq!(view["total_amount"], 300);
    assert_eq!(view["lines"][0]["quantity"], 3);
    assert_eq!(view["lines"][0]["product"]["name"], "Widget");
    assert_eq!(view["customer"]["name"], "Ada Lovelace");

    // Stock was reserved.
    let res = client
        .get(format!("{}/products/{}", server.base_url, product_id))
        .send()
        .await
        .unwrap();
    let product: serde_json::Value = res.json().await.unwrap();
    assert_eq!(product["remaining"], 2);

    // Both reads see the committed order.
    let order_id = view["id"].as_str().unwrap();
    let res = client
        .get(format!("{}/orders/{}", server.base_url, order_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/orders", server.base_url))
        .send()
        .await
        .unwrap();
    let listing: serde_json::Value = res.json().await.unwrap();
    assert_eq!(listing["rows"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn insufficient_stock_is_a_conflict_with_both_quantities() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let product = create_product(&client, &server.base_url, 100, 2).await;
    let product_id = product["id"].as_str().unwrap();

    let res = client
        .post(format!("{}/orders", server.base_url))
        .json(&order_body(product_id, 3))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["product_id"], product_id);
    assert_eq!(body["requested"], 3);
    assert_eq!(body["available"], 2);

    // Stock untouched, no order created.
    let res = client
        .get(format!("{}/products/{}", server.base_url, product_id))
        .send()
        .await
        .unwrap();
    let product: serde_json::Value = res.json().await.unwrap();
    assert_eq!(product["remaining"], 2);

    let res = client
        .get(format!("{}/orders", server.base_url))
        .send()
        .await
        .unwrap();
    let listing: serde_json::Value = res.json().await.unwrap();
    assert!(listing["rows"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn validation_failures_name_the_field() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let product = create_product(&client, &server.base_url, 100, 5).await;
    let product_id = product["id"].as_str().unwrap();

    let mut body = order_body(product_id, 1);
    body["customer_name"] = json!("   ");

    let res = client
        .post(format!("{}/orders", server.base_url))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["field"], "customer_name");
}

#[tokio::test]
async fn unknown_product_is_named_in_the_error() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let ghost = uuid::Uuid::now_v7().to_string();
    let res = client
        .post(format!("{}/orders", server.base_url))
        .json(&order_body(&ghost, 1))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "product_not_found");
    assert_eq!(body["product_id"], ghost);
}

#[tokio::test]
async fn order_patch_is_limited_to_contact_fields() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let product = create_product(&client, &server.base_url, 100, 5).await;
    let product_id = product["id"].as_str().unwrap();

    let res = client
        .post(format!("{}/orders", server.base_url))
        .json(&order_body(product_id, 2))
        .send()
        .await
        .unwrap();
    let view: serde_json::Value = res.json().await.unwrap();
    let order_id = view["id"].as_str().unwrap();

    let res = client
        .patch(format!("{}/orders/{}", server.base_url, order_id))
        .json(&json!({"address": "2 Loop Rd"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(updated["customer"]["address"], "2 Loop Rd");
    assert_eq!(updated["total_amount"], 200);
    assert_eq!(updated["lines"][0]["quantity"], 2);
}
