//! API integration tests
//!
//! The router tests run in-process against a lazily connected pool, so they
//! only cover paths that are answered before the database is touched. The
//! `#[ignore]` tests need a running server with a fresh database:
//! `cargo test -- --ignored`.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use gearhouse_server::{
    api,
    config::AppConfig,
    models::user::{Role, UserClaims},
    AppState,
};

const BASE_URL: &str = "http://localhost:8080/api/v1";
const SECRET: &str = "router-test-secret";

fn app() -> Router {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = SECRET.to_string();
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database.url)
        .expect("lazy pool");
    api::router(AppState::new(config, pool))
}

fn token(role: Role) -> String {
    let now = Utc::now().timestamp();
    UserClaims {
        sub: "tester".into(),
        user_id: 99,
        role,
        exp: now + 600,
        iat: now,
    }
    .create_token(SECRET)
    .expect("token")
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = app().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

#[tokio::test]
async fn health_is_public() {
    let (status, body) = send(
        Request::get("/api/v1/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn equipment_requires_a_token() {
    let (status, body) = send(
        Request::get("/api/v1/equipment").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 2);
}

#[tokio::test]
async fn forged_token_is_rejected() {
    let now = Utc::now().timestamp();
    let forged = UserClaims {
        sub: "mallory".into(),
        user_id: 1,
        role: Role::Admin,
        exp: now + 600,
        iat: now,
    }
    .create_token("some-other-secret")
    .unwrap();

    let (status, _) = send(
        Request::get("/api/v1/equipment")
            .header(header::AUTHORIZATION, format!("Bearer {}", forged))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn staff_cannot_manage_users() {
    let (status, body) = send(
        Request::get("/api/v1/users")
            .header(header::AUTHORIZATION, format!("Bearer {}", token(Role::Staff)))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "NotAuthorized");
}

#[tokio::test]
async fn staff_cannot_delete_logs() {
    let staff = token(Role::Staff);
    let (status, _) = send(json_request("DELETE", "/api/v1/logs", Some(&staff), json!({"ids": [1]}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn registration_input_is_validated() {
    let (status, _) = send(json_request(
        "POST",
        "/api/v1/equipment",
        Some(&token(Role::Staff)),
        json!({"name": "SM58", "quantity": 0}),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rent_rejects_due_date_before_checkout() {
    let (status, body) = send(json_request(
        "POST",
        "/api/v1/equipment/00000000-0000-0000-0000-000000000001/rent",
        Some(&token(Role::Staff)),
        json!({
            "version": 1,
            "quantity": 1,
            "borrower": "Acme",
            "checkout_date": "2024-05-10",
            "due_date": "2024-05-01"
        }),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 5);
}

#[tokio::test]
async fn ticket_needs_a_site() {
    let (status, _) = send(json_request(
        "POST",
        "/api/v1/tickets",
        Some(&token(Role::Staff)),
        json!({"sites": []}),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn openapi_document_lists_movements() {
    let response = app()
        .oneshot(Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let doc: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(doc["paths"]["/equipment/{id}/rent"].is_object());
    assert!(doc["paths"]["/sites/{site}/return"].is_object());
    assert!(doc["components"]["securitySchemes"]["bearer_auth"].is_object());

    let upload = &doc["paths"]["/import/equipment"]["post"]["requestBody"]["content"]["multipart/form-data"];
    assert!(upload["schema"].is_object());
    assert_eq!(
        doc["components"]["schemas"]["CsvUpload"]["properties"]["file"]["format"],
        "binary"
    );
}

// End-to-end tests against a running server

/// Helper to get an authenticated client
async fn get_auth_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "admin"
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

fn unique(prefix: &str) -> String {
    format!("{} {}", prefix, uuid::Uuid::new_v4().simple())
}

async fn register_item(client: &Client, token: &str, name: &str, quantity: i32) -> Value {
    let response = client
        .post(format!("{}/equipment", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "category": "Audio",
            "name": name,
            "brand": "Shure",
            "quantity": quantity
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse response")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_login() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "admin"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["role"], "admin");
    assert!(body["user"].get("password").is_none());
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_registration_waits_for_approval() {
    let client = Client::new();
    let admin = get_auth_token(&client).await;
    let username = format!("staff{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({"username": username, "password": "pa55word"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let user: Value = response.json().await.unwrap();
    assert_eq!(user["approved"], false);

    let login = json!({"username": username, "password": "pa55word"});
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&login)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = client
        .put(format!("{}/users/{}", BASE_URL, user["id"]))
        .bearer_auth(&admin)
        .json(&json!({"approved": true}))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&login)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let response = client
        .delete(format!("{}/users/{}", BASE_URL, user["id"]))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);
}

#[tokio::test]
#[ignore]
async fn test_rent_and_return_merge_back() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let name = unique("SM58");

    let item = register_item(&client, &token, &name, 10).await;
    let id = item["id"].as_str().unwrap();

    let response = client
        .post(format!("{}/equipment/{}/rent", BASE_URL, id))
        .bearer_auth(&token)
        .json(&json!({
            "version": item["version"],
            "quantity": 3,
            "borrower": "Acme Sound",
            "checkout_date": "2024-05-01",
            "due_date": "2024-05-04"
        }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let rented: Value = response.json().await.unwrap();
    assert_eq!(rented["source"]["quantity"], 7);
    assert_eq!(rented["moved"]["quantity"], 3);
    assert_eq!(rented["moved"]["status"], "rented");
    assert_eq!(rented["moved"]["is_overdue"], true);

    let response = client
        .post(format!("{}/equipment/{}/return", BASE_URL, rented["moved"]["id"].as_str().unwrap()))
        .bearer_auth(&token)
        .json(&json!({"version": rented["moved"]["version"]}))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let returned: Value = response.json().await.unwrap();
    assert!(returned["source"].is_null());
    assert_eq!(returned["moved"]["id"], item["id"]);
    assert_eq!(returned["moved"]["quantity"], 10);

    let response = client
        .get(format!("{}/logs?kind=return&limit=5", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let logs: Vec<Value> = response.json().await.unwrap();
    assert!(logs.iter().any(|l| l["equipment_name"] == name.as_str()));
}

#[tokio::test]
#[ignore]
async fn test_stale_version_is_a_conflict() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let item = register_item(&client, &token, &unique("Beta 58"), 2).await;
    let id = item["id"].as_str().unwrap();

    let edit = |notes: &str| {
        client
            .put(format!("{}/equipment/{}", BASE_URL, id))
            .bearer_auth(&token)
            .json(&json!({"version": item["version"], "notes": notes}))
            .send()
    };

    assert!(edit("first").await.unwrap().status().is_success());
    let response = edit("second").await.unwrap();
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], 7);
}

#[tokio::test]
#[ignore]
async fn test_dispatch_ticket_download() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let item = register_item(&client, &token, &unique("Par 64"), 4).await;
    let site = unique("Arena");

    let response = client
        .post(format!("{}/equipment/{}/dispatch", BASE_URL, item["id"].as_str().unwrap()))
        .bearer_auth(&token)
        .json(&json!({
            "version": item["version"],
            "quantity": 4,
            "site": site,
            "checkout_date": "2030-01-01",
            "due_date": "2030-01-05",
            "note": "stage left"
        }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let response = client
        .post(format!("{}/tickets", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({"sites": [site, "Nowhere at all"]}))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-ticket-id"));
    let bytes = response.bytes().await.unwrap();
    assert_eq!(&bytes[..2], b"PK");

    let response = client
        .post(format!("{}/sites/{}/return", BASE_URL, site))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let outcome: Value = response.json().await.unwrap();
    assert_eq!(outcome["returned_units"], 4);
}

#[tokio::test]
#[ignore]
async fn test_csv_export_has_bom() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/equipment/export", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let bytes = response.bytes().await.unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBFcategory,name,quantity"));
}
