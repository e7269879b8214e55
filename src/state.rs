use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::domain::CredentialVerifier;
use crate::infrastructure::Hs256Verifier;
use crate::pipeline::{RateLimitStore, RateLimiter, UploadIngest};

/// Shared collaborators of the pipeline, built once per process.
///
/// The rate-limit store is owned here rather than in a global, so every
/// `AppState` (and every test) counts independently.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn CredentialVerifier>,
    pub rate_limiter: Arc<RateLimiter>,
    pub upload_ingest: Arc<UploadIngest>,
    /// Bytes of JSON/urlencoded body buffered for sanitization.
    pub json_body_limit: usize,
}

impl AppState {
    pub fn new(
        verifier: Arc<dyn CredentialVerifier>,
        rate_limiter: Arc<RateLimiter>,
        upload_ingest: Arc<UploadIngest>,
        json_body_limit: usize,
    ) -> Self {
        Self {
            verifier,
            rate_limiter,
            upload_ingest,
            json_body_limit,
        }
    }

    /// Wires the production collaborators from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload directory cannot be created.
    pub fn from_config(config: &Config) -> Result<Self> {
        let verifier = Arc::new(Hs256Verifier::new(config.jwt_secret.as_bytes()));

        let rate_limiter = Arc::new(RateLimiter::new(
            Arc::new(RateLimitStore::new()),
            config.rate_limit_config(),
            config.behind_proxy,
        ));

        let upload_config = config.upload_config();
        let upload_ingest = Arc::new(UploadIngest::new(upload_config.clone()).with_context(
            || format!("Failed to create upload directory {}", upload_config.root.display()),
        )?);

        Ok(Self::new(
            verifier,
            rate_limiter,
            upload_ingest,
            config.json_body_limit,
        ))
    }
}
