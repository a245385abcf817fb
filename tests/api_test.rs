//! HTTP surface: routing, status codes and response shapes.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn address() -> Value {
    json!({
        "line1": "1 Infinite Loop",
        "city": "Cupertino",
        "state": "CA",
        "postalCode": "95014",
        "country": "US"
    })
}

#[tokio::test]
async fn health_reports_database() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["database"], "healthy");
}

#[tokio::test]
async fn cart_crud_over_http() {
    let app = TestApp::new().await;
    let product = common::seed_product(app.db(), "Headphones", dec!(59.99), 10).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/cart?userId=3",
            Some(json!({"productId": product.id, "quantity": 2})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Product added to cart");
    assert_eq!(body["cartItem"]["quantity"], 2);
    let item_id = body["cartItem"]["id"].as_i64().unwrap();

    let response = app.request(Method::GET, "/api/v1/cart?userId=3", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["cartItems"].as_array().unwrap().len(), 1);
    assert_eq!(body["cartItems"][0]["productName"], "Headphones");
    assert_eq!(body["cartItems"][0]["unitPriceCents"], 5999);
    assert_eq!(body["cartItems"][0]["lineTotalCents"], 11998);

    let response = app
        .request(
            Method::PATCH,
            &format!("/api/v1/cart/{}?userId=3", item_id),
            Some(json!({"quantity": 5})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["cartItem"]["quantity"], 5);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/cart/{}?userId=3", item_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/cart/{}?userId=3", item_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response_json(response).await["code"], "not_found");
}

#[tokio::test]
async fn missing_user_id_is_rejected() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/api/v1/cart", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["code"], "invalid_input");

    let response = app.request(Method::GET, "/api/v1/cart?userId=0", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn checkout_returns_client_secret() {
    let app = TestApp::new().await;
    let product = common::seed_product(app.db(), "Beans", dec!(9.99), 10).await;
    app.request(
        Method::POST,
        "/api/v1/cart?userId=7",
        Some(json!({"productId": product.id, "quantity": 3})),
    )
    .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout?userId=7",
            Some(json!({
                "cartItems": [{"productId": product.id, "quantity": 3}],
                "address": address()
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Payment intent created");
    assert_eq!(body["clientSecret"], "pi_test_1_secret");
    assert_eq!(app.payments.calls()[0].amount_cents, 4317);

    let response = app.request(Method::GET, "/api/v1/orders?userId=7", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let orders = response_json(response).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
    assert_eq!(orders[0]["status"], "pending");
    assert_eq!(orders[0]["totalCents"], 4317);
    assert_eq!(orders[0]["items"][0]["productName"], "Beans");

    let response = app.request(Method::GET, "/api/v1/cart?userId=7", None).await;
    let cart = response_json(response).await;
    assert!(cart["cartItems"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn checkout_rejects_client_supplied_totals() {
    let app = TestApp::new().await;
    let product = common::seed_product(app.db(), "Beans", dec!(9.99), 10).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout?userId=7",
            Some(json!({
                "cartItems": [{"productId": product.id, "quantity": 1, "price": 0.01}],
                "address": address()
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["code"], "invalid_input");
    assert!(app.payments.calls().is_empty());
}

#[tokio::test]
async fn checkout_mismatch_and_empty_cart_are_client_errors() {
    let app = TestApp::new().await;
    let product = common::seed_product(app.db(), "Beans", dec!(9.99), 10).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout?userId=8",
            Some(json!({"cartItems": [], "address": address()})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["code"], "empty_cart");

    app.request(
        Method::POST,
        "/api/v1/cart?userId=8",
        Some(json!({"productId": product.id, "quantity": 2})),
    )
    .await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout?userId=8",
            Some(json!({
                "cartItems": [{"productId": product.id, "quantity": 1}],
                "address": address()
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["code"], "cart_mismatch");
    assert!(app.payments.calls().is_empty());
}

#[tokio::test]
async fn admin_moves_order_status() {
    let app = TestApp::new().await;
    let product = common::seed_product(app.db(), "Beans", dec!(9.99), 10).await;
    app.request(
        Method::POST,
        "/api/v1/cart?userId=9",
        Some(json!({"productId": product.id, "quantity": 1})),
    )
    .await;
    app.request(
        Method::POST,
        "/api/v1/checkout?userId=9",
        Some(json!({
            "cartItems": [{"productId": product.id, "quantity": 1}],
            "address": address()
        })),
    )
    .await;

    let orders = response_json(app.request(Method::GET, "/api/v1/orders?userId=9", None).await).await;
    let order_id = orders[0]["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::PATCH,
            &format!("/api/v1/admin/orders/{}", order_id),
            Some(json!({"status": "processing"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["status"], "processing");

    let response = app
        .request(
            Method::PATCH,
            &format!("/api/v1/admin/orders/{}", order_id),
            Some(json!({"status": "pending"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response_json(response).await["code"],
        "invalid_status_transition"
    );

    let response = app
        .request(Method::GET, &format!("/api/v1/orders/{}", order_id), None)
        .await;
    assert_eq!(response_json(response).await["status"], "processing");

    let response = app
        .request(
            Method::GET,
            "/api/v1/orders/00000000-0000-0000-0000-000000000000",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn catalog_lists_and_fetches_products() {
    let app = TestApp::new().await;
    let kettle = common::seed_product(app.db(), "Kettle", dec!(24.50), 4).await;
    common::seed_product(app.db(), "Teapot", dec!(39.00), 2).await;
    common::seed_product(app.db(), "Mug", dec!(8.00), 30).await;

    let response = app.request(Method::GET, "/api/v1/products", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Products retrieved successfully");
    assert_eq!(body["totalItems"], 3);
    assert_eq!(body["currentPage"], 1);
    assert_eq!(body["products"][0]["name"], "Kettle");
    assert_eq!(body["products"][0]["priceCents"], 2450);

    let response = app
        .request(Method::GET, "/api/v1/products?search=pot", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["totalItems"], 1);
    assert_eq!(body["products"][0]["name"], "Teapot");

    let response = app
        .request(
            Method::GET,
            "/api/v1/products?minPriceCents=1000&maxPriceCents=3000",
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["totalItems"], 1);
    assert_eq!(body["products"][0]["name"], "Kettle");

    let response = app
        .request(Method::GET, "/api/v1/products?limit=2&page=2", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["currentPage"], 2);
    assert_eq!(body["products"].as_array().unwrap().len(), 1);
    assert_eq!(body["products"][0]["name"], "Mug");

    let response = app
        .request(Method::GET, &format!("/api/v1/products/{}", kettle.id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["product"]["id"], kettle.id);
    assert_eq!(body["product"]["stock"], 4);
}

#[tokio::test]
async fn catalog_errors_are_client_errors() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/products/999", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response_json(response).await["code"], "not_found");

    let response = app.request(Method::GET, "/api/v1/products/abc", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(Method::GET, "/api/v1/products?page=0", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["code"], "invalid_input");
}
