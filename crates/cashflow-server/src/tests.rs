//! HTTP API tests driven through the router with `oneshot`

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use cashflow_core::{AppConfig, Database};

use crate::create_router;

fn test_app() -> Router {
    let db = Database::in_memory().expect("test database");
    let config = AppConfig {
        database_path: db.path().to_string(),
        jwt_secret: "test-secret".to_string(),
        token_expire_minutes: 30,
        ai: None,
    };
    create_router(db, config)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Register a user and log in, returning the access token
async fn register_and_login(app: &Router, email: &str) -> String {
    let (status, _) = send(
        app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({ "email": email, "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": email, "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    body["access_token"].as_str().unwrap().to_string()
}

fn today() -> String {
    Utc::now().date_naive().to_string()
}

#[tokio::test]
async fn register_login_and_me_roundtrip() {
    let app = test_app();
    let token = register_and_login(&app, "a@example.com").await;

    let (status, body) = send(&app, Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "a@example.com");
    // The password hash never leaves the server
    assert!(body.get("hashed_password").is_none());

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/v1/auth/me",
        Some(&token),
        Some(json!({ "full_name": "Ada" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Ada");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/api/v1/transactions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/v1/transactions",
        Some("not-a-token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = test_app();
    register_and_login(&app, "a@example.com").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "a@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Unknown accounts get the same answer as wrong passwords
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let app = test_app();
    register_and_login(&app, "a@example.com").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({ "email": "a@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn short_passwords_are_rejected() {
    let app = test_app();
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({ "email": "a@example.com", "password": "short" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn default_categories_cannot_be_modified() {
    let app = test_app();
    let token = register_and_login(&app, "a@example.com").await;

    let (status, body) = send(&app, Method::GET, "/api/v1/categories", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let default_id = body
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["is_default"] == true)
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/v1/categories/{}", default_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/categories/{}", default_id),
        Some(&token),
        Some(json!({ "name": "Hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn category_detail_includes_transaction_count() {
    let app = test_app();
    let token = register_and_login(&app, "a@example.com").await;

    let (status, category) = send(
        &app,
        Method::POST,
        "/api/v1/categories",
        Some(&token),
        Some(json!({ "name": "Books", "type": "expense" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = category["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/transactions",
        Some(&token),
        Some(json!({
            "type": "expense", "amount": "19.99", "date": today(), "category_id": id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, detail) = send(
        &app,
        Method::GET,
        &format!("/api/v1/categories/{}", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["name"], "Books");
    assert_eq!(detail["transaction_count"], 1);
}

#[tokio::test]
async fn transaction_lifecycle_with_restore() {
    let app = test_app();
    let token = register_and_login(&app, "a@example.com").await;

    let (status, tx) = send(
        &app,
        Method::POST,
        "/api/v1/transactions",
        Some(&token),
        Some(json!({ "type": "expense", "amount": "12.34", "date": today() })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = tx["id"].as_i64().unwrap();

    // Restoring an active row is a conflict
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/transactions/{}/restore", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/v1/transactions/{}", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Deleted rows vanish from normal reads
    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/v1/transactions/{}", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, list) = send(
        &app,
        Method::GET,
        "/api/v1/transactions?include_deleted=true",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, restored) = send(
        &app,
        Method::POST,
        &format!("/api/v1/transactions/{}/restore", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(restored["is_deleted"], false);
    assert_eq!(restored["amount"], "12.34");
}

#[tokio::test]
async fn mismatched_category_type_is_rejected() {
    let app = test_app();
    let token = register_and_login(&app, "a@example.com").await;

    let (_, category) = send(
        &app,
        Method::POST,
        "/api/v1/categories",
        Some(&token),
        Some(json!({ "name": "Rent", "type": "expense" })),
    )
    .await;
    let id = category["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/transactions",
        Some(&token),
        Some(json!({
            "type": "income", "amount": "100", "date": today(), "category_id": id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn statistics_reflect_visible_rows() {
    let app = test_app();
    let token = register_and_login(&app, "a@example.com").await;

    for (kind, amount) in [("income", "3000"), ("expense", "1000"), ("expense", "500")] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/transactions",
            Some(&token),
            Some(json!({ "type": kind, "amount": amount, "date": today() })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, stats) = send(
        &app,
        Method::GET,
        "/api/v1/transactions/statistics",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_income"], "3000");
    assert_eq!(stats["total_expense"], "1500");
    assert_eq!(stats["balance"], "1500");
    assert_eq!(stats["transaction_count"], 3);
}

#[tokio::test]
async fn summary_report_covers_the_default_window() {
    let app = test_app();
    let token = register_and_login(&app, "a@example.com").await;

    let (_, _) = send(
        &app,
        Method::POST,
        "/api/v1/transactions",
        Some(&token),
        Some(json!({ "type": "income", "amount": "3000", "date": today() })),
    )
    .await;

    let (status, report) = send(
        &app,
        Method::GET,
        "/api/v1/reports/summary",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total_income"], "3000");
    assert_eq!(report["transaction_count"], 1);
    assert_eq!(report["period"]["end_date"], today());
}

#[tokio::test]
async fn category_breakdown_reports_percentages() {
    let app = test_app();
    let token = register_and_login(&app, "a@example.com").await;

    let (_, category) = send(
        &app,
        Method::POST,
        "/api/v1/categories",
        Some(&token),
        Some(json!({ "name": "Groceries", "type": "expense" })),
    )
    .await;
    let id = category["id"].as_i64().unwrap();

    let (_, _) = send(
        &app,
        Method::POST,
        "/api/v1/transactions",
        Some(&token),
        Some(json!({
            "type": "expense", "amount": "75", "date": today(), "category_id": id
        })),
    )
    .await;
    let (_, _) = send(
        &app,
        Method::POST,
        "/api/v1/transactions",
        Some(&token),
        Some(json!({ "type": "expense", "amount": "25", "date": today() })),
    )
    .await;

    let (status, report) = send(
        &app,
        Method::GET,
        "/api/v1/reports/by-category?transaction_type=expense",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["grand_total"], "100");
    let groups = report["categories"].as_array().unwrap();
    assert_eq!(groups[0]["name"], "Groceries");
    assert_eq!(groups[0]["percentage"], "75.0");
    assert_eq!(groups[1]["name"], "Uncategorized");
    assert_eq!(groups[1]["percentage"], "25.0");
}

#[tokio::test]
async fn monthly_report_always_fills_the_window() {
    let app = test_app();
    let token = register_and_login(&app, "a@example.com").await;

    let (status, report) = send(
        &app,
        Method::GET,
        "/api/v1/reports/monthly",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["months"].as_array().unwrap().len(), 12);

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/v1/reports/monthly?months=0",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_trend_period_is_rejected() {
    let app = test_app();
    let token = register_and_login(&app, "a@example.com").await;

    let (status, report) = send(
        &app,
        Method::GET,
        "/api/v1/reports/trends?period=weekly",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["granularity"], "weekly");
    assert_eq!(report["points"].as_array().unwrap().len(), 12);

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/v1/reports/trends?period=hourly",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_without_ai_config_is_unavailable() {
    let app = test_app();
    let token = register_and_login(&app, "a@example.com").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/ai/chat",
        Some(&token),
        Some(json!({ "question": "How much did I spend?" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // History still works, it is just empty
    let (status, history) = send(&app, Method::GET, "/api/v1/ai/history", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn users_cannot_see_each_other() {
    let app = test_app();
    let alice = register_and_login(&app, "alice@example.com").await;
    let bob = register_and_login(&app, "bob@example.com").await;

    let (_, tx) = send(
        &app,
        Method::POST,
        "/api/v1/transactions",
        Some(&alice),
        Some(json!({ "type": "expense", "amount": "9", "date": today() })),
    )
    .await;
    let id = tx["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/v1/transactions/{}", id),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, list) = send(&app, Method::GET, "/api/v1/transactions", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(list.as_array().unwrap().is_empty());
}
