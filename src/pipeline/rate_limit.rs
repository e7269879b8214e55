//! Fixed-window per-client rate limiting.
//!
//! Buckets live in an explicit [`RateLimitStore`] created by the caller and
//! shared through `Arc`, so every test can start from a fresh store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::extract::Request;
use dashmap::DashMap;

use crate::error::AppError;
use crate::pipeline::Stage;
use crate::utils::client_ip::client_key;

/// Window and quota for [`RateLimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    /// 100 requests per 10 minutes.
    fn default() -> Self {
        Self {
            window: Duration::from_secs(10 * 60),
            max_requests: 100,
        }
    }
}

/// Request count of one client within its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitBucket {
    pub count: u32,
    pub window_start: Instant,
}

impl RateLimitBucket {
    fn is_expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) > window
    }
}

/// Outcome of [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allow { remaining: u32 },
    Reject { retry_after: Duration },
}

/// Process-local table of buckets keyed by client identifier.
#[derive(Debug, Default)]
pub struct RateLimitStore {
    buckets: DashMap<String, RateLimitBucket>,
}

impl RateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Snapshot of one client's bucket.
    pub fn bucket(&self, client: &str) -> Option<RateLimitBucket> {
        self.buckets.get(client).map(|b| *b)
    }

    /// Drops every bucket whose window has elapsed. Returns how many were removed.
    pub fn sweep_expired(&self, now: Instant, window: Duration) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| !bucket.is_expired(now, window));
        before.saturating_sub(self.buckets.len())
    }
}

/// Fixed-window limiter over a shared [`RateLimitStore`].
pub struct RateLimiter {
    store: Arc<RateLimitStore>,
    config: RateLimitConfig,
    behind_proxy: bool,
}

impl RateLimiter {
    /// Creates a limiter.
    ///
    /// `behind_proxy` selects whether the client key comes from forwarding
    /// headers (see [`client_key`]).
    pub fn new(store: Arc<RateLimitStore>, config: RateLimitConfig, behind_proxy: bool) -> Self {
        Self {
            store,
            config,
            behind_proxy,
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    pub fn store(&self) -> &Arc<RateLimitStore> {
        &self.store
    }

    /// Counts one request from `client` at `now`.
    ///
    /// The bucket lookup, window reset, and increment happen while holding the
    /// shard lock of the bucket's entry, with no suspension point, so
    /// concurrent requests never lose updates. Rejected requests are not
    /// counted; the count never exceeds `max_requests`.
    pub fn check(&self, client: &str, now: Instant) -> RateDecision {
        let window = self.config.window;
        let mut bucket = self
            .store
            .buckets
            .entry(client.to_string())
            .or_insert_with(|| RateLimitBucket {
                count: 0,
                window_start: now,
            });

        if bucket.is_expired(now, window) {
            bucket.count = 0;
            bucket.window_start = now;
        }

        if bucket.count >= self.config.max_requests {
            let resets_at = bucket.window_start + window;
            return RateDecision::Reject {
                retry_after: resets_at.saturating_duration_since(now),
            };
        }

        bucket.count += 1;
        RateDecision::Allow {
            remaining: self.config.max_requests - bucket.count,
        }
    }

    /// Evicts buckets whose window elapsed before `now`.
    pub fn sweep(&self, now: Instant) -> usize {
        self.store.sweep_expired(now, self.config.window)
    }
}

#[async_trait]
impl Stage for RateLimiter {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    async fn process(&self, req: Request) -> Result<Request, AppError> {
        let client = client_key(&req, self.behind_proxy);

        match self.check(&client, Instant::now()) {
            RateDecision::Allow { .. } => Ok(req),
            RateDecision::Reject { retry_after } => {
                tracing::warn!(client = %client, "rate limit exceeded");
                Err(AppError::too_many_requests(ceil_secs(retry_after)))
            }
        }
    }
}

/// Whole seconds to wait, rounded up and never zero.
fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
    secs.max(1)
}

/// Periodically evicts expired buckets so idle clients do not accumulate.
///
/// Runs until the task is aborted.
pub async fn run_sweeper(limiter: Arc<RateLimiter>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let removed = limiter.sweep(Instant::now());
        if removed > 0 {
            tracing::debug!(
                removed,
                tracked = limiter.store().len(),
                "evicted expired rate limit buckets"
            );
        }
    }
}
