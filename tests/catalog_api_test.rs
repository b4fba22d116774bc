//! Integration tests for the product endpoints.
//!
//! Tests cover:
//! - Create/read/update/delete through the gateway
//! - Partial updates, including detaching a product from its category
//! - Pagination windows and the category/status list filters
//! - Payload validation failures and the 404-never-500 contract

mod common;

use axum::{body, http::Method, http::StatusCode, response::Response};
use common::TestApp;
use serde_json::{json, Value};

async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

async fn create_product(app: &TestApp, body: Value) -> Value {
    let response = app
        .request_authenticated(Method::POST, "/api/products", Some(body))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response_json(response).await
}

async fn create_category(app: &TestApp, name: &str) -> Value {
    let response = app
        .request_authenticated(Method::POST, "/api/categories", Some(json!({ "name": name })))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response_json(response).await
}

// ==================== Create ====================

#[tokio::test]
async fn create_product_returns_the_stored_record() {
    let app = TestApp::new().await;

    let body = create_product(
        &app,
        json!({
            "title": "Trail Runner",
            "description": "Lightweight trail shoe",
            "price": 129.99,
            "inventory": 12,
            "status": "active",
            "images": ["https://cdn.example.com/trail-runner.jpg"]
        }),
    )
    .await;

    assert_eq!(body["title"], "Trail Runner");
    assert_eq!(body["price"], "129.99");
    assert_eq!(body["inventory"], 12);
    assert_eq!(body["status"], "active");
    assert_eq!(body["images"], json!(["https://cdn.example.com/trail-runner.jpg"]));
    assert_eq!(body["category_id"], Value::Null);
    assert_eq!(
        body["user_id"],
        app.user_id.to_string(),
        "products are stamped with the creating user"
    );
    assert!(body["id"].as_str().is_some(), "server assigns the id");
    assert!(body["created_at"].is_string());
}

#[tokio::test]
async fn create_defaults_to_draft_with_no_images() {
    let app = TestApp::new().await;

    let body = create_product(
        &app,
        json!({ "title": "Plain Tee", "price": 5, "inventory": 0 }),
    )
    .await;

    assert_eq!(body["status"], "draft");
    assert_eq!(body["images"], json!([]));
    assert_eq!(body["description"], Value::Null);
}

#[tokio::test]
async fn create_rejects_an_unknown_category() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/products",
            Some(json!({
                "title": "Orphan",
                "price": 1,
                "inventory": 1,
                "category_id": "4f8a1c70-0000-4000-8000-94f1a1c70000"
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(
        body["message"]
            .as_str()
            .expect("message string")
            .contains("Category does not exist")
    );
}

#[tokio::test]
async fn create_rejects_bad_payloads() {
    let app = TestApp::new().await;

    let bad_payloads = vec![
        json!({ "title": "", "price": 1, "inventory": 1 }),
        json!({ "title": "Negative", "price": -0.01, "inventory": 1 }),
        json!({ "title": "Backorder", "price": 1, "inventory": -1 }),
        json!({ "price": 1, "inventory": 1 }),
        json!({ "title": "Extra", "price": 1, "inventory": 1, "sku": "X-1" }),
    ];

    for payload in bad_payloads {
        let response = app
            .request_authenticated(Method::POST, "/api/products", Some(payload.clone()))
            .await;
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "payload {} should be rejected",
            payload
        );
        let body = response_json(response).await;
        assert_eq!(body["error"], "Bad Request");
    }
}

// ==================== Read ====================

#[tokio::test]
async fn get_returns_the_product_and_unknown_ids_are_404() {
    let app = TestApp::new().await;

    let created = create_product(
        &app,
        json!({ "title": "Canvas Tote", "price": 18.5, "inventory": 40 }),
    )
    .await;
    let id = created["id"].as_str().expect("product id");

    let response = app
        .request_authenticated(Method::GET, &format!("/api/products/{}", id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["title"], "Canvas Tote");
    assert_eq!(body["price"], "18.5");

    let missing = app
        .request_authenticated(
            Method::GET,
            "/api/products/4f8a1c70-0000-4000-8000-94f1a1c70001",
            None,
        )
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let missing_body = response_json(missing).await;
    assert_eq!(missing_body["error"], "Not Found");
}

#[tokio::test]
async fn get_with_a_malformed_id_is_a_client_error() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(Method::GET, "/api/products/not-a-uuid", None)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ==================== Update ====================

#[tokio::test]
async fn update_touches_only_the_submitted_fields() {
    let app = TestApp::new().await;

    let created = create_product(
        &app,
        json!({ "title": "Field Jacket", "price": 10, "inventory": 3 }),
    )
    .await;
    let id = created["id"].as_str().expect("product id");

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/products/{}", id),
            Some(json!({ "price": 24.5 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["price"], "24.5");
    assert_eq!(body["title"], "Field Jacket", "title must survive the update");
    assert_eq!(body["inventory"], 3);

    // An empty update is a no-op, not an error
    let noop = app
        .request_authenticated(Method::PUT, &format!("/api/products/{}", id), Some(json!({})))
        .await;
    assert_eq!(noop.status(), StatusCode::OK);
    let noop_body = response_json(noop).await;
    assert_eq!(noop_body["price"], "24.5");
}

#[tokio::test]
async fn update_of_an_unknown_product_is_404() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::PUT,
            "/api/products/4f8a1c70-0000-4000-8000-94f1a1c70002",
            Some(json!({ "price": 1 })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn explicit_null_detaches_the_category() {
    let app = TestApp::new().await;

    let category = create_category(&app, "Footwear").await;
    let category_id = category["id"].as_str().expect("category id");

    let created = create_product(
        &app,
        json!({
            "title": "Derby Shoe",
            "price": 89.99,
            "inventory": 7,
            "category_id": category_id
        }),
    )
    .await;
    assert_eq!(created["category_id"], category_id);
    let id = created["id"].as_str().expect("product id");

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/products/{}", id),
            Some(json!({ "category_id": null })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["category_id"], Value::Null);

    // Reattaching works the same way
    let reattach = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/products/{}", id),
            Some(json!({ "category_id": category_id })),
        )
        .await;
    let reattach_body = response_json(reattach).await;
    assert_eq!(reattach_body["category_id"], category_id);
}

// ==================== List ====================

#[tokio::test]
async fn list_pages_through_the_catalog() {
    let app = TestApp::new().await;

    for n in 1..=3 {
        create_product(
            &app,
            json!({ "title": format!("Product {}", n), "price": n, "inventory": n }),
        )
        .await;
    }

    let first = response_json(
        app.request_authenticated(Method::GET, "/api/products?limit=2&page=1", None)
            .await,
    )
    .await;
    let second = response_json(
        app.request_authenticated(Method::GET, "/api/products?limit=2&page=2", None)
            .await,
    )
    .await;

    let first = first.as_array().expect("page one array");
    let second = second.as_array().expect("page two array");
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 1);

    let mut ids: Vec<&str> = first
        .iter()
        .chain(second.iter())
        .map(|p| p["id"].as_str().expect("id"))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 3, "pages must not overlap");
}

#[tokio::test]
async fn list_clamps_an_out_of_range_limit() {
    let app = TestApp::new().await;

    create_product(&app, json!({ "title": "One", "price": 1, "inventory": 1 })).await;
    create_product(&app, json!({ "title": "Two", "price": 2, "inventory": 2 })).await;

    let body = response_json(
        app.request_authenticated(Method::GET, "/api/products?limit=0", None)
            .await,
    )
    .await;

    assert_eq!(body.as_array().expect("array").len(), 1);
}

#[tokio::test]
async fn list_filters_by_category_and_status() {
    let app = TestApp::new().await;

    let category = create_category(&app, "Outdoor").await;
    let category_id = category["id"].as_str().expect("category id");

    let in_category = create_product(
        &app,
        json!({
            "title": "Tent",
            "price": 250,
            "inventory": 2,
            "status": "active",
            "category_id": category_id
        }),
    )
    .await;
    create_product(&app, json!({ "title": "Sketch", "price": 1, "inventory": 1 })).await;

    let by_category = response_json(
        app.request_authenticated(
            Method::GET,
            &format!("/api/products?category_id={}", category_id),
            None,
        )
        .await,
    )
    .await;
    let by_category = by_category.as_array().expect("array");
    assert_eq!(by_category.len(), 1);
    assert_eq!(by_category[0]["id"], in_category["id"]);

    let drafts = response_json(
        app.request_authenticated(Method::GET, "/api/products?status=draft", None)
            .await,
    )
    .await;
    let drafts = drafts.as_array().expect("array");
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0]["title"], "Sketch");
}

// ==================== Delete ====================

#[tokio::test]
async fn delete_removes_the_product() {
    let app = TestApp::new().await;

    let created = create_product(
        &app,
        json!({ "title": "Clearance", "price": 3, "inventory": 1 }),
    )
    .await;
    let id = created["id"].as_str().expect("product id");

    let response = app
        .request_authenticated(Method::DELETE, &format!("/api/products/{}", id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let gone = app
        .request_authenticated(Method::GET, &format!("/api/products/{}", id), None)
        .await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);

    let again = app
        .request_authenticated(Method::DELETE, &format!("/api/products/{}", id), None)
        .await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}
