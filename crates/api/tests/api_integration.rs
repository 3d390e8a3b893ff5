//! Integration tests for the API server, driven end-to-end over the
//! in-memory backend: login, role gates, and the order lifecycle.

use std::sync::OnceLock;

use api::config::Config;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::MemoryStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn test_config() -> Config {
    Config {
        jwt_secret: "test-secret".to_string(),
        admin_email: "admin@example.com".to_string(),
        admin_password: "admin-pass".to_string(),
        ..Config::default()
    }
}

async fn setup() -> Router {
    let store = MemoryStore::new();
    let config = test_config();
    api::bootstrap_admin(&store, &config).await.unwrap();
    let state = api::create_state(store, &config);
    api::create_app(state, get_metrics_handle())
}

async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = request(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

async fn admin_token(app: &Router) -> String {
    login(app, "admin@example.com", "admin-pass").await
}

/// Creates an account through the admin API and returns a token for it.
async fn create_and_login(app: &Router, admin: &str, name: &str, email: &str, role: &str) -> String {
    let (status, _) = request(
        app,
        "POST",
        "/customers",
        Some(admin),
        Some(json!({ "name": name, "email": email, "password": "pw", "role": role })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    login(app, email, "pw").await
}

async fn create_product(app: &Router, admin: &str, name: &str, price_cents: i64, stock: u32) -> String {
    let (status, body) = request(
        app,
        "POST",
        "/products",
        Some(admin),
        Some(json!({ "name": name, "price_cents": price_cents, "stock": stock })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_admin_bootstrap_is_idempotent() {
    let store = MemoryStore::new();
    let config = test_config();
    api::bootstrap_admin(&store, &config).await.unwrap();
    api::bootstrap_admin(&store, &config).await.unwrap();

    let state = api::create_state(store, &config);
    let app = api::create_app(state, get_metrics_handle());

    let admin = admin_token(&app).await;
    let (_, body) = request(&app, "GET", "/customers", Some(&admin), None).await;
    assert_eq!(body.as_array().unwrap().len(), 1, "exactly one admin account");
}

#[tokio::test]
async fn test_health_check() {
    let app = setup().await;
    let (status, body) = request(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let app = setup().await;

    let (status, _) = request(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "admin@example.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "ghost@example.com", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_requests_without_token_are_unauthorized() {
    let app = setup().await;

    for (method, uri) in [
        ("GET", "/orders"),
        ("POST", "/orders"),
        ("GET", "/products"),
        ("GET", "/customers"),
        ("GET", "/dashboard/stats"),
    ] {
        let body = (method == "POST").then(|| json!({ "items": [] }));
        let (status, _) = request(&app, method, uri, None, body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
    }
}

#[tokio::test]
async fn test_customer_cannot_manage_catalog_or_users() {
    let app = setup().await;
    let admin = admin_token(&app).await;
    let customer = create_and_login(&app, &admin, "Ada", "ada@example.com", "Customer").await;

    let (status, _) = request(
        &app,
        "POST",
        "/products",
        Some(&customer),
        Some(json!({ "name": "Widget", "price_cents": 100, "stock": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(&app, "GET", "/customers", Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(&app, "GET", "/dashboard/stats", Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_product_listing_is_paginated() {
    let app = setup().await;
    let admin = admin_token(&app).await;
    for name in ["Axle", "Bolt", "Cog"] {
        create_product(&app, &admin, name, 100, 1).await;
    }

    let (status, body) =
        request(&app, "GET", "/products?limit=2&offset=0", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["products"].as_array().unwrap().len(), 2);
    assert_eq!(body["products"][0]["name"], "Axle");

    let (_, body) = request(&app, "GET", "/products?limit=2&offset=2", Some(&admin), None).await;
    assert_eq!(body["products"].as_array().unwrap().len(), 1);
    assert_eq!(body["products"][0]["name"], "Cog");
}

#[tokio::test]
async fn test_duplicate_email_is_a_conflict() {
    let app = setup().await;
    let admin = admin_token(&app).await;
    create_and_login(&app, &admin, "Ada", "ada@example.com", "Customer").await;

    let (status, _) = request(
        &app,
        "POST",
        "/customers",
        Some(&admin),
        Some(json!({ "name": "Imposter", "email": "ada@example.com", "password": "pw", "role": "Customer" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_order_lifecycle_end_to_end() {
    let app = setup().await;
    let admin = admin_token(&app).await;
    let product_id = create_product(&app, &admin, "Widget", 1000, 5).await;
    let ada = create_and_login(&app, &admin, "Ada", "ada@example.com", "Customer").await;
    let bea = create_and_login(&app, &admin, "Bea", "bea@example.com", "Customer").await;

    // Ada orders the entire stock; creation itself reserves nothing.
    let (status, body) = request(
        &app,
        "POST",
        "/orders",
        Some(&ada),
        Some(json!({ "items": [{ "product_id": product_id, "quantity": 5 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "Open");
    let order_id = body["id"].as_str().unwrap().to_string();

    let (_, body) = request(&app, "GET", "/products", Some(&ada), None).await;
    assert_eq!(body["products"][0]["stock"], 5);

    // Ownership: Ada and the admin see the order, Bea gets 403.
    let (status, body) = request(&app, "GET", &format!("/orders/{order_id}"), Some(&ada), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_cents"], 5000);
    assert_eq!(body["items"][0]["product_name"], "Widget");

    let (status, _) = request(&app, "GET", &format!("/orders/{order_id}"), Some(&bea), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A plain customer may not transition statuses.
    let (status, _) = request(
        &app,
        "PATCH",
        &format!("/orders/{order_id}/status"),
        Some(&ada),
        Some(json!({ "status": "Finalized" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Finalization decrements the stock to zero.
    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/orders/{order_id}/status"),
        Some(&admin),
        Some(json!({ "status": "Finalized" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "Finalized");
    assert_eq!(body["customer_name"], "Ada");

    let (_, body) = request(&app, "GET", "/products", Some(&ada), None).await;
    assert_eq!(body["products"][0]["stock"], 0);

    // Terminal orders reject further transitions.
    let (status, _) = request(
        &app,
        "PATCH",
        &format!("/orders/{order_id}/status"),
        Some(&admin),
        Some(json!({ "status": "Cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Ada sees her own order; the admin listing has it too.
    let (_, body) = request(&app, "GET", "/orders", Some(&ada), None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    let (_, body) = request(&app, "GET", "/orders", Some(&admin), None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_finalize_with_insufficient_stock_is_a_business_error() {
    let app = setup().await;
    let admin = admin_token(&app).await;
    let product_id = create_product(&app, &admin, "Widget", 1000, 5).await;
    let ada = create_and_login(&app, &admin, "Ada", "ada@example.com", "Customer").await;

    let (status, body) = request(
        &app,
        "POST",
        "/orders",
        Some(&ada),
        Some(json!({ "items": [{ "product_id": product_id, "quantity": 6 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = body["id"].as_str().unwrap().to_string();

    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/orders/{order_id}/status"),
        Some(&admin),
        Some(json!({ "status": "Finalized" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("Widget"));

    // Stock untouched, order still Open.
    let (_, body) = request(&app, "GET", "/products", Some(&ada), None).await;
    assert_eq!(body["products"][0]["stock"], 5);
    let (_, body) = request(&app, "GET", &format!("/orders/{order_id}"), Some(&ada), None).await;
    assert_eq!(body["status"], "Open");
}

#[tokio::test]
async fn test_create_order_validation_and_unknown_product() {
    let app = setup().await;
    let admin = admin_token(&app).await;
    let ada = create_and_login(&app, &admin, "Ada", "ada@example.com", "Customer").await;

    let (status, _) = request(
        &app,
        "POST",
        "/orders",
        Some(&ada),
        Some(json!({ "items": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request(
        &app,
        "POST",
        "/orders",
        Some(&ada),
        Some(json!({ "items": [{ "product_id": uuid::Uuid::new_v4(), "quantity": 1 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = request(&app, "GET", "/orders", Some(&ada), None).await;
    assert!(body.as_array().unwrap().is_empty(), "no partial order exists");
}

#[tokio::test]
async fn test_delete_product_referenced_by_an_order() {
    let app = setup().await;
    let admin = admin_token(&app).await;
    let referenced = create_product(&app, &admin, "Widget", 1000, 5).await;
    let free = create_product(&app, &admin, "Gadget", 500, 5).await;
    let ada = create_and_login(&app, &admin, "Ada", "ada@example.com", "Customer").await;

    let (status, _) = request(
        &app,
        "POST",
        "/orders",
        Some(&ada),
        Some(json!({ "items": [{ "product_id": referenced, "quantity": 1 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) =
        request(&app, "DELETE", &format!("/products/{referenced}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("Widget"));

    let (status, _) =
        request(&app, "DELETE", &format!("/products/{free}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_admin_self_modification_guards() {
    let app = setup().await;
    let admin = admin_token(&app).await;

    let (_, body) = request(&app, "GET", "/customers", Some(&admin), None).await;
    let admin_id = body
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["email"] == "admin@example.com")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, _) = request(
        &app,
        "PATCH",
        &format!("/customers/{admin_id}/role"),
        Some(&admin),
        Some(json!({ "role": "Customer" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) =
        request(&app, "DELETE", &format!("/customers/{admin_id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // The same operations against another account succeed.
    create_and_login(&app, &admin, "Ada", "ada@example.com", "Customer").await;
    let (_, body) = request(&app, "GET", "/customers", Some(&admin), None).await;
    let ada_id = body
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["email"] == "ada@example.com")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/customers/{ada_id}/role"),
        Some(&admin),
        Some(json!({ "role": "Seller" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "Seller");

    let (status, _) =
        request(&app, "DELETE", &format!("/customers/{ada_id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_seller_can_manage_catalog_but_not_users() {
    let app = setup().await;
    let admin = admin_token(&app).await;
    let seller = create_and_login(&app, &admin, "Sam", "sam@example.com", "Seller").await;

    let (status, _) = request(
        &app,
        "POST",
        "/products",
        Some(&seller),
        Some(json!({ "name": "Widget", "price_cents": 100, "stock": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = request(
        &app,
        "POST",
        "/customers",
        Some(&seller),
        Some(json!({ "name": "X", "email": "x@example.com", "password": "pw", "role": "Customer" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(&app, "GET", "/dashboard/stats", Some(&seller), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Sellers see every order.
    let (status, body) = request(&app, "GET", "/orders", Some(&seller), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_dashboard_stats() {
    let app = setup().await;
    let admin = admin_token(&app).await;
    let product_id = create_product(&app, &admin, "Widget", 1000, 10).await;
    let ada = create_and_login(&app, &admin, "Ada", "ada@example.com", "Customer").await;

    let (_, body) = request(
        &app,
        "POST",
        "/orders",
        Some(&ada),
        Some(json!({ "items": [{ "product_id": product_id, "quantity": 4 }] })),
    )
    .await;
    let order_id = body["id"].as_str().unwrap().to_string();
    request(
        &app,
        "PATCH",
        &format!("/orders/{order_id}/status"),
        Some(&admin),
        Some(json!({ "status": "Finalized" })),
    )
    .await;
    request(
        &app,
        "POST",
        "/orders",
        Some(&ada),
        Some(json!({ "items": [{ "product_id": product_id, "quantity": 1 }] })),
    )
    .await;

    let (status, body) = request(&app, "GET", "/dashboard/stats", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revenue_cents"], 4000);
    assert_eq!(body["total_orders"], 2);
    assert_eq!(body["open_orders"], 1);
    assert_eq!(body["top_products"][0]["name"], "Widget");
    assert_eq!(body["top_products"][0]["units"], 5);
    assert_eq!(body["top_customers"][0]["name"], "Ada");
}
