//! Application configuration loaded from environment variables.
//!
//! Configuration is loaded once at startup and validated before the server starts.
//!
//! ```bash
//! export JWT_SECRET="change-me"
//! export UPLOAD_DIR="uploads"
//! export RATE_LIMIT_MAX=100
//! ```
//!
//! ## Required Variables
//!
//! - `JWT_SECRET` - HMAC key bearer tokens are signed with
//!
//! ## Optional Variables
//!
//! - `LISTEN` - Bind address (default: `0.0.0.0:5000`)
//! - `RUST_LOG` - Log level (default: `info`)
//! - `LOG_FORMAT` - Log format: `text` or `json` (default: `text`)
//! - `BEHIND_PROXY` - Read client IP from `X-Forwarded-For` / `X-Real-IP` (default: `false`)
//! - `RATE_LIMIT_WINDOW_SECS` - Rate-limit window (default: 600)
//! - `RATE_LIMIT_MAX` - Requests per client per window (default: 100)
//! - `RATE_LIMIT_SWEEP_SECS` - Interval between expired-bucket sweeps (default: 60)
//! - `UPLOAD_DIR` - Storage root for uploads (default: `uploads`)
//! - `UPLOAD_URL_PREFIX` - Public path prefix of stored files (default: `/uploads`)
//! - `UPLOAD_MAX_BYTES` - Largest accepted upload (default: 10 MiB)
//! - `JSON_BODY_LIMIT` - Largest JSON/form body sanitized (default: 100 KiB)

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::pipeline::{RateLimitConfig, UploadConfig};

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub log_level: String,
    pub log_format: String,
    /// When true, rate limiting reads client IP from X-Forwarded-For / X-Real-IP headers.
    /// Enable only when the service is behind a trusted reverse proxy.
    pub behind_proxy: bool,
    pub rate_limit_window_secs: u64,
    pub rate_limit_max: u32,
    pub rate_limit_sweep_secs: u64,
    pub upload_dir: String,
    pub upload_url_prefix: String,
    pub upload_max_bytes: usize,
    pub json_body_limit: usize,
    /// Secret used to verify bearer tokens. Loaded from `JWT_SECRET`.
    pub jwt_secret: String,
}

/// Reads `name` and parses it, falling back to `default` when unset or unparsable.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `JWT_SECRET` is missing.
    pub fn from_env() -> Result<Self> {
        let listen_addr = env::var("LISTEN").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

        let behind_proxy = env::var("BEHIND_PROXY")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;

        Ok(Self {
            listen_addr,
            log_level,
            log_format,
            behind_proxy,
            rate_limit_window_secs: env_or("RATE_LIMIT_WINDOW_SECS", 600),
            rate_limit_max: env_or("RATE_LIMIT_MAX", 100),
            rate_limit_sweep_secs: env_or("RATE_LIMIT_SWEEP_SECS", 60),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            upload_url_prefix: env::var("UPLOAD_URL_PREFIX")
                .unwrap_or_else(|_| "/uploads".to_string()),
            upload_max_bytes: env_or("UPLOAD_MAX_BYTES", 10 * 1024 * 1024),
            json_body_limit: env_or("JSON_BODY_LIMIT", 100 * 1024),
            jwt_secret,
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `log_format` is not `text` or `json`
    /// - `listen_addr` is not `host:port`
    /// - a rate-limit setting or size limit is zero
    /// - `upload_url_prefix` does not start with `/`
    /// - `jwt_secret` is empty
    pub fn validate(&self) -> Result<()> {
        if self.log_format != "text" && self.log_format != "json" {
            anyhow::bail!(
                "LOG_FORMAT must be 'text' or 'json', got '{}'",
                self.log_format
            );
        }

        if !self.listen_addr.contains(':') {
            anyhow::bail!(
                "LISTEN must be in format 'host:port', got '{}'",
                self.listen_addr
            );
        }

        if self.rate_limit_window_secs == 0 {
            anyhow::bail!("RATE_LIMIT_WINDOW_SECS must be greater than 0");
        }
        if self.rate_limit_max == 0 {
            anyhow::bail!("RATE_LIMIT_MAX must be at least 1");
        }
        if self.rate_limit_sweep_secs == 0 {
            anyhow::bail!("RATE_LIMIT_SWEEP_SECS must be greater than 0");
        }

        if self.upload_dir.trim().is_empty() {
            anyhow::bail!("UPLOAD_DIR must not be empty");
        }
        if !self.upload_url_prefix.starts_with('/') {
            anyhow::bail!(
                "UPLOAD_URL_PREFIX must start with '/', got '{}'",
                self.upload_url_prefix
            );
        }
        if self.upload_max_bytes == 0 {
            anyhow::bail!("UPLOAD_MAX_BYTES must be greater than 0");
        }
        if self.json_body_limit == 0 {
            anyhow::bail!("JSON_BODY_LIMIT must be greater than 0");
        }

        if self.jwt_secret.is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        Ok(())
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            window: Duration::from_secs(self.rate_limit_window_secs),
            max_requests: self.rate_limit_max,
        }
    }

    pub fn rate_limit_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.rate_limit_sweep_secs)
    }

    pub fn upload_config(&self) -> UploadConfig {
        UploadConfig {
            root: PathBuf::from(&self.upload_dir),
            public_prefix: self.upload_url_prefix.clone(),
            max_bytes: self.upload_max_bytes,
            ..UploadConfig::default()
        }
    }

    /// Prints configuration summary (without sensitive data).
    pub fn print_summary(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Listen address: {}", self.listen_addr);
        tracing::info!("  Behind proxy: {}", self.behind_proxy);
        tracing::info!(
            "  Rate limit: {} requests / {}s (sweep every {}s)",
            self.rate_limit_max,
            self.rate_limit_window_secs,
            self.rate_limit_sweep_secs
        );
        tracing::info!(
            "  Uploads: {} -> {} (max {} bytes)",
            self.upload_dir,
            self.upload_url_prefix,
            self.upload_max_bytes
        );
        tracing::info!("  Log level: {}", self.log_level);
        tracing::info!("  Log format: {}", self.log_format);
    }
}

/// Loads and validates configuration from environment variables.
///
/// # Errors
///
/// Returns an error if required variables are missing or validation fails.
///
/// # Note
///
/// This function expects environment variables to be already loaded
/// (e.g., via `dotenvy::dotenv()` in `main.rs`).
pub fn load_from_env() -> Result<Config> {
    let config = Config::from_env()?;
    config.validate()?;
    Ok(config)
}
