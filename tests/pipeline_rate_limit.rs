mod common;

use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum_test::TestServer;
use serde_json::Value;
use storefront_gateway::dispatcher::app_router;

const FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

#[tokio::test]
async fn test_requests_beyond_quota_are_rejected() {
    let (state, _dir) = common::create_test_state(3);
    let server = TestServer::new(app_router(&state)).unwrap();
    let client = HeaderValue::from_static("198.51.100.1");

    for _ in 0..3 {
        let response = server
            .get("/health")
            .add_header(FORWARDED_FOR, client.clone())
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }

    let response = server
        .get("/health")
        .add_header(FORWARDED_FOR, client.clone())
        .await;

    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    let json = response.json::<Value>();
    assert_eq!(json.as_object().unwrap().len(), 1);
    assert!(json["message"].is_string());

    let retry_after: u64 = response
        .header(header::RETRY_AFTER)
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 600);
}

#[tokio::test]
async fn test_quota_is_per_client() {
    let (state, _dir) = common::create_test_state(1);
    let server = TestServer::new(app_router(&state)).unwrap();

    let first = server
        .get("/health")
        .add_header(FORWARDED_FOR, HeaderValue::from_static("198.51.100.1"))
        .await;
    let other = server
        .get("/health")
        .add_header(FORWARDED_FOR, HeaderValue::from_static("198.51.100.2"))
        .await;

    assert_eq!(first.status_code(), StatusCode::OK);
    assert_eq!(other.status_code(), StatusCode::OK);
    assert_eq!(state.rate_limiter.store().len(), 2);
}

#[tokio::test]
async fn test_rate_limit_runs_before_auth() {
    let (state, _dir) = common::create_test_state(1);
    let server = TestServer::new(app_router(&state)).unwrap();
    let client = HeaderValue::from_static("198.51.100.7");

    // Counted even though authentication fails afterwards.
    let first = server
        .post("/api/uploads")
        .add_header(FORWARDED_FOR, client.clone())
        .multipart(common::image_form(b"data"))
        .await;
    assert_eq!(first.status_code(), StatusCode::UNAUTHORIZED);

    let second = server
        .post("/api/uploads")
        .add_header(FORWARDED_FOR, client.clone())
        .multipart(common::image_form(b"data"))
        .await;
    assert_eq!(second.status_code(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_quota_is_shared_across_route_groups() {
    let (state, _dir) = common::create_test_state(2);
    let server = TestServer::new(app_router(&state)).unwrap();
    let client = HeaderValue::from_static("198.51.100.9");

    let health = server
        .get("/health")
        .add_header(FORWARDED_FOR, client.clone())
        .await;
    assert_eq!(health.status_code(), StatusCode::OK);

    let upload = server
        .post("/api/uploads")
        .add_header(FORWARDED_FOR, client.clone())
        .add_header(header::AUTHORIZATION, common::bearer(&common::token(true)))
        .multipart(common::image_form(b"data"))
        .await;
    assert_eq!(upload.status_code(), StatusCode::CREATED);

    let blocked = server
        .get("/health")
        .add_header(FORWARDED_FOR, client.clone())
        .await;
    assert_eq!(blocked.status_code(), StatusCode::TOO_MANY_REQUESTS);
}
