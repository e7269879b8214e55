#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum_test::multipart::{MultipartForm, Part};
use storefront_gateway::infrastructure::{Hs256Verifier, TokenClaims};
use storefront_gateway::pipeline::{
    RateLimitConfig, RateLimitStore, RateLimiter, UploadConfig, UploadIngest,
};
use storefront_gateway::state::AppState;
use tempfile::TempDir;

pub const TEST_SECRET: &str = "test-signing-secret";

/// State with a fresh rate-limit store and a temporary upload root.
///
/// The limiter trusts `X-Forwarded-For`, so tests pick the client address.
/// Keep the returned `TempDir` alive for the duration of the test.
pub fn create_test_state(max_requests: u32) -> (AppState, TempDir) {
    let dir = TempDir::new().unwrap();

    let verifier = Arc::new(Hs256Verifier::new(TEST_SECRET));
    let rate_limiter = Arc::new(RateLimiter::new(
        Arc::new(RateLimitStore::new()),
        RateLimitConfig {
            window: Duration::from_secs(600),
            max_requests,
        },
        true,
    ));
    let upload_ingest = Arc::new(
        UploadIngest::new(UploadConfig {
            root: dir.path().join("uploads"),
            ..UploadConfig::default()
        })
        .unwrap(),
    );

    let state = AppState::new(verifier, rate_limiter, upload_ingest, 100 * 1024);
    (state, dir)
}

pub fn token(is_admin: bool) -> String {
    Hs256Verifier::new(TEST_SECRET)
        .sign(&TokenClaims {
            id: "5f1d7c2e9b1e8a0017a1b2c3".to_string(),
            name: Some("Basir".to_string()),
            email: Some("basir@example.com".to_string()),
            is_admin,
            iat: None,
            exp: None,
        })
        .unwrap()
}

pub fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

pub fn image_form(bytes: &'static [u8]) -> MultipartForm {
    MultipartForm::new().add_part(
        "image",
        Part::bytes(bytes)
            .file_name("photo.jpg")
            .mime_type("image/jpeg"),
    )
}

pub fn stored_files(state: &AppState) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(state.upload_ingest.root())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    files.sort();
    files
}
