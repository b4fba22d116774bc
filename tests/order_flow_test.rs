//! Integration tests for order intake.
//!
//! Tests cover:
//! - Order creation computing the total on the server
//! - Rejection of a client-supplied total
//! - Atomicity: a failed item write leaves no orphan order behind
//! - Reads embedding items, lists omitting them
//! - Status filtering, pagination, and payload validation

mod common;

use std::str::FromStr;

use axum::{body, http::Method, http::StatusCode, response::Response};
use common::TestApp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::ConnectionTrait;
use serde_json::{json, Value};

async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

async fn create_product(app: &TestApp, title: &str, price: f64) -> String {
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/products",
            Some(json!({ "title": title, "price": price, "inventory": 100 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response_json(response).await["id"]
        .as_str()
        .expect("product id")
        .to_string()
}

fn order_payload(product_a: &str, product_b: &str) -> Value {
    json!({
        "first_name": "Ada",
        "last_name": "Lovelace",
        "email": "ada@example.com",
        "items": [
            { "product_id": product_a, "quantity": 2, "price": 19.99 },
            { "product_id": product_b, "quantity": 1, "price": 5 }
        ]
    })
}

// ==================== Creation ====================

#[tokio::test]
async fn create_order_computes_the_total_server_side() {
    let app = TestApp::new().await;
    let shoe = create_product(&app, "Shoe", 19.99).await;
    let sock = create_product(&app, "Sock", 5.0).await;

    let response = app
        .request_authenticated(Method::POST, "/api/orders", Some(order_payload(&shoe, &sock)))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;

    let total = Decimal::from_str(body["total"].as_str().expect("total string")).unwrap();
    assert_eq!(total, dec!(44.98), "total is the sum of price times quantity");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["first_name"], "Ada");
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["user_id"], app.user_id.to_string());

    let order_id = body["id"].as_str().expect("order id");
    let items = body["items"].as_array().expect("embedded items");
    assert_eq!(items.len(), 2);
    for item in items {
        assert_eq!(item["order_id"], order_id);
    }
    assert_eq!(items[0]["quantity"], 2);
    assert_eq!(items[0]["price"], "19.99");
}

#[tokio::test]
async fn a_client_supplied_total_is_rejected() {
    let app = TestApp::new().await;

    let mut payload = order_payload(
        "4f8a1c70-0000-4000-8000-94f1a1c70005",
        "4f8a1c70-0000-4000-8000-94f1a1c70006",
    );
    payload["total"] = json!(0.01);

    let response = app
        .request_authenticated(Method::POST, "/api/orders", Some(payload))
        .await;

    assert_eq!(
        response.status(),
        StatusCode::BAD_REQUEST,
        "total is not part of the request contract"
    );
}

#[tokio::test]
async fn create_rejects_bad_payloads() {
    let app = TestApp::new().await;
    let product = "4f8a1c70-0000-4000-8000-94f1a1c70007";

    let bad_payloads = vec![
        // no items
        json!({
            "first_name": "Ada", "last_name": "Lovelace",
            "email": "ada@example.com", "items": []
        }),
        // missing email
        json!({
            "first_name": "Ada", "last_name": "Lovelace",
            "items": [{ "product_id": product, "quantity": 1, "price": 1 }]
        }),
        // invalid email
        json!({
            "first_name": "Ada", "last_name": "Lovelace", "email": "not-an-email",
            "items": [{ "product_id": product, "quantity": 1, "price": 1 }]
        }),
        // zero quantity
        json!({
            "first_name": "Ada", "last_name": "Lovelace", "email": "ada@example.com",
            "items": [{ "product_id": product, "quantity": 0, "price": 1 }]
        }),
        // negative item price
        json!({
            "first_name": "Ada", "last_name": "Lovelace", "email": "ada@example.com",
            "items": [{ "product_id": product, "quantity": 1, "price": -1 }]
        }),
    ];

    for payload in bad_payloads {
        let response = app
            .request_authenticated(Method::POST, "/api/orders", Some(payload.clone()))
            .await;
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "payload {} should be rejected",
            payload
        );
    }
}

// ==================== Atomicity ====================

#[tokio::test]
async fn a_failed_item_write_leaves_no_orphan_order() {
    let app = TestApp::new().await;
    let shoe = create_product(&app, "Shoe", 19.99).await;
    let sock = create_product(&app, "Sock", 5.0).await;

    // Force the item insert to fail after the order insert succeeded
    app.state
        .db
        .execute_unprepared("DROP TABLE order_items")
        .await
        .expect("drop order_items table");

    let response = app
        .request_authenticated(Method::POST, "/api/orders", Some(order_payload(&shoe, &sock)))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // The order row from the first half of the write must be gone too
    let orders = response_json(
        app.request_authenticated(Method::GET, "/api/orders", None)
            .await,
    )
    .await;
    assert_eq!(orders, json!([]), "no half-written order survives");
}

// ==================== Reads ====================

#[tokio::test]
async fn get_order_embeds_its_items() {
    let app = TestApp::new().await;
    let shoe = create_product(&app, "Shoe", 19.99).await;
    let sock = create_product(&app, "Sock", 5.0).await;

    let created = response_json(
        app.request_authenticated(Method::POST, "/api/orders", Some(order_payload(&shoe, &sock)))
            .await,
    )
    .await;
    let id = created["id"].as_str().expect("order id");

    let response = app
        .request_authenticated(Method::GET, &format!("/api/orders/{}", id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;

    assert_eq!(body["id"], id);
    assert_eq!(body["items"].as_array().expect("items").len(), 2);
    let total = Decimal::from_str(body["total"].as_str().expect("total string")).unwrap();
    assert_eq!(total, dec!(44.98));
}

#[tokio::test]
async fn get_of_an_unknown_order_is_404() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::GET,
            "/api/orders/4f8a1c70-0000-4000-8000-94f1a1c70008",
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn list_omits_items_and_filters_by_status() {
    let app = TestApp::new().await;
    let shoe = create_product(&app, "Shoe", 19.99).await;
    let sock = create_product(&app, "Sock", 5.0).await;

    for _ in 0..2 {
        let response = app
            .request_authenticated(
                Method::POST,
                "/api/orders",
                Some(order_payload(&shoe, &sock)),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let all = response_json(
        app.request_authenticated(Method::GET, "/api/orders", None)
            .await,
    )
    .await;
    let all = all.as_array().expect("array");
    assert_eq!(all.len(), 2);
    assert!(
        all[0].get("items").is_none(),
        "the list view is headers only"
    );

    let pending = response_json(
        app.request_authenticated(Method::GET, "/api/orders?status=pending", None)
            .await,
    )
    .await;
    assert_eq!(pending.as_array().expect("array").len(), 2);

    let completed = response_json(
        app.request_authenticated(Method::GET, "/api/orders?status=completed", None)
            .await,
    )
    .await;
    assert_eq!(completed, json!([]));

    let second_page = response_json(
        app.request_authenticated(Method::GET, "/api/orders?limit=1&page=2", None)
            .await,
    )
    .await;
    assert_eq!(second_page.as_array().expect("array").len(), 1);
}
