mod common;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, StatusCode, Uri, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_test::TestServer;
use serde_json::{Value, json};
use storefront_gateway::dispatcher::{Dispatcher, RouteGroup};
use storefront_gateway::error::AppError;
use storefront_gateway::pipeline::AuthGate;

async fn echo_order(
    uri: Uri,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(body) = payload?;
    Ok(Json(json!({ "query": uri.query(), "body": body })))
}

async fn list_products(uri: Uri) -> Json<Value> {
    Json(json!({ "query": uri.query() }))
}

async fn count_bytes(body: Bytes) -> String {
    body.len().to_string()
}

async fn crash() -> &'static str {
    panic!("order service crashed at src/orders.rs:42")
}

async fn my_profile() -> &'static str {
    "profile"
}

fn server(state: &storefront_gateway::AppState) -> TestServer {
    let orders = Router::new()
        .route("/", post(echo_order))
        .route("/crash", get(crash));
    let products = Router::new().route("/", get(list_products).post(count_bytes));
    let mine = Router::new().route("/", get(my_profile));

    let router = Dispatcher::for_state(state)
        .group(RouteGroup::new("/api/orders", orders))
        .group(RouteGroup::new("/api/products", products))
        .group(
            RouteGroup::new("/api/users/mine", mine)
                .with_stage(Arc::new(AuthGate::new(state.verifier.clone()))),
        )
        .into_router();

    TestServer::new(router).unwrap()
}

#[tokio::test]
async fn test_stage_order_per_group() {
    let (state, _dir) = common::create_test_state(100);
    let dispatcher = Dispatcher::for_state(&state);

    let described = dispatcher.describe();
    let uploads = described
        .iter()
        .find(|(prefix, _)| prefix == "/api/uploads")
        .unwrap();
    let health = described.iter().find(|(prefix, _)| prefix == "/").unwrap();

    assert_eq!(
        uploads.1,
        vec!["security_filter", "rate_limit", "auth", "admin", "upload"]
    );
    assert_eq!(health.1, vec!["security_filter", "rate_limit"]);
}

#[tokio::test]
async fn test_json_body_is_sanitized_before_handler() {
    let (state, _dir) = common::create_test_state(100);
    let server = server(&state);

    let response = server
        .post("/api/orders")
        .json(&json!({ "note": "<script>alert(1)</script>", "qty": 2 }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let json = response.json::<Value>();
    assert_eq!(json["body"]["note"], "&lt;script&gt;alert(1)&lt;/script&gt;");
    assert_eq!(json["body"]["qty"], 2);
}

#[tokio::test]
async fn test_oversized_json_body_never_reaches_handler() {
    let (state, _dir) = common::create_test_state(100);
    let server = server(&state);

    let body = json!({
        "note": "<script>alert(1)</script>",
        "padding": "x".repeat(150 * 1024),
    })
    .to_string();

    let response = server
        .post("/api/orders")
        .bytes(Bytes::from(body.clone()))
        .content_type("application/json")
        .add_header(header::CONTENT_LENGTH, HeaderValue::from(body.len()))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let json = response.json::<Value>();
    assert_eq!(json.as_object().unwrap().len(), 1);
    assert!(json["message"].as_str().unwrap().contains("limit"));
}

#[tokio::test]
async fn test_external_groups_default_to_json_body_limit() {
    let (state, _dir) = common::create_test_state(100);
    let server = server(&state);

    let small = server
        .post("/api/products")
        .bytes(Bytes::from(vec![b'a'; 1024]))
        .content_type("application/octet-stream")
        .await;
    assert_eq!(small.status_code(), StatusCode::OK);
    assert_eq!(small.text(), "1024");

    let large = server
        .post("/api/products")
        .bytes(Bytes::from(vec![b'a'; 150 * 1024]))
        .content_type("application/octet-stream")
        .await;
    assert_eq!(large.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_polluted_query_is_collapsed() {
    let (state, _dir) = common::create_test_state(100);
    let server = server(&state);

    let response = server
        .get("/api/products?category=shirts&page=1&category=pants")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>()["query"],
        "category=pants&page=1"
    );
}

#[tokio::test]
async fn test_malformed_json_is_validation_error() {
    let (state, _dir) = common::create_test_state(100);
    let server = server(&state);

    let response = server
        .post("/api/orders")
        .text("{\"note\": ")
        .content_type("application/json")
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let json = response.json::<Value>();
    assert_eq!(json.as_object().unwrap().len(), 1);
    assert!(json["message"].is_string());
}

#[tokio::test]
async fn test_panic_is_normalized_without_detail() {
    let (state, _dir) = common::create_test_state(100);
    let server = server(&state);

    let response = server.get("/api/orders/crash").await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = response.json::<Value>();
    assert_eq!(json, json!({ "message": "Internal Server Error" }));
}

#[tokio::test]
async fn test_external_group_gate_short_circuits() {
    let (state, _dir) = common::create_test_state(100);
    let server = server(&state);

    let anonymous = server.get("/api/users/mine").await;
    assert_eq!(anonymous.status_code(), StatusCode::UNAUTHORIZED);

    let signed_in = server
        .get("/api/users/mine")
        .add_header(header::AUTHORIZATION, common::bearer(&common::token(false)))
        .await;
    assert_eq!(signed_in.status_code(), StatusCode::OK);
    assert_eq!(signed_in.text(), "profile");
}

#[tokio::test]
async fn test_unknown_route_is_not_found_envelope() {
    let (state, _dir) = common::create_test_state(100);
    let server = server(&state);

    let response = server.get("/api/nowhere").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>(), json!({ "message": "Not Found" }));
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let (state, _dir) = common::create_test_state(100);
    let server = server(&state);

    let ok = server.get("/health").await;
    let rejected = server.post("/api/uploads").await;

    for response in [ok, rejected] {
        assert_eq!(response.header(header::X_CONTENT_TYPE_OPTIONS), "nosniff");
        assert_eq!(response.header(header::X_FRAME_OPTIONS), "SAMEORIGIN");
    }
}
