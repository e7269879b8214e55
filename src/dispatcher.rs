//! Composition of pipelines and route groups into the application router.
//!
//! # Route Structure
//!
//! - `GET  /health`          - Liveness probe (common stages only)
//! - `POST /api/uploads`     - Image upload (admin bearer token required)
//! - `/api/users`, `/api/products`, `/api/orders` - external route groups,
//!   registered with [`Dispatcher::group`]
//!
//! # Stage Order
//!
//! Every group runs the common stages first (security filter, rate limiter),
//! then its own gates, then the route handler. The first failing stage
//! short-circuits to the error normalizer.
//!
//! # Outer Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **CORS** - Permissive cross-origin access
//! - **Security headers** - `nosniff`, frame and referrer policies
//! - **Panic recovery** - Panics become the generic 500 envelope

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{Router, middleware};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;

use crate::api;
use crate::api::middleware::{security_headers, tracing};
use crate::error::{AppError, panic_response};
use crate::pipeline::{self, Pipeline, SecurityFilterStage, Stage};
use crate::state::AppState;

/// A router mounted under a path prefix together with its own gates.
pub struct RouteGroup {
    prefix: String,
    router: Router,
    stages: Pipeline,
    body_limit: Option<usize>,
}

impl RouteGroup {
    /// Creates a group; `prefix` `"/"` merges the routes at the root.
    pub fn new(prefix: impl Into<String>, router: Router) -> Self {
        Self {
            prefix: prefix.into(),
            router,
            stages: Pipeline::new(),
            body_limit: None,
        }
    }

    /// Appends a gate run after the common stages.
    pub fn with_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages = self.stages.with_stage(stage);
        self
    }

    /// Overrides the request body limit for this group.
    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = Some(bytes);
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// Builds the application router from route groups.
pub struct Dispatcher {
    common: Pipeline,
    groups: Vec<RouteGroup>,
    default_body_limit: Option<usize>,
}

impl Dispatcher {
    /// Creates a dispatcher whose groups all start with `common`.
    pub fn new(common: Pipeline) -> Self {
        Self {
            common,
            groups: Vec::new(),
            default_body_limit: None,
        }
    }

    /// Body limit for groups that do not set their own.
    pub fn with_default_body_limit(mut self, bytes: usize) -> Self {
        self.default_body_limit = Some(bytes);
        self
    }

    /// Dispatcher with the common stages and the built-in groups
    /// (health, uploads) wired from `state`.
    ///
    /// Groups without their own body limit are capped at the sanitization
    /// limit, so no JSON or form body is larger than what the security
    /// filter can inspect.
    pub fn for_state(state: &AppState) -> Self {
        let common = Pipeline::new()
            .with_stage(Arc::new(SecurityFilterStage::new(state.json_body_limit)))
            .with_stage(state.rate_limiter.clone());

        Self::new(common)
            .with_default_body_limit(state.json_body_limit)
            .group(api::routes::health_group())
            .group(api::routes::uploads_group(state))
    }

    /// Registers a route group.
    pub fn group(mut self, group: RouteGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Full stage list a group's requests pass through, in order.
    pub fn pipeline_for(&self, group: &RouteGroup) -> Pipeline {
        self.common.clone().then(&group.stages)
    }

    /// Stage names per group prefix, in registration order.
    pub fn describe(&self) -> Vec<(String, Vec<&'static str>)> {
        self.groups
            .iter()
            .map(|g| (g.prefix.clone(), self.pipeline_for(g).stage_names()))
            .collect()
    }

    /// Mounts every group behind its pipeline and wraps the outer middleware.
    pub fn into_router(self) -> Router {
        let mut router = Router::new();

        for group in &self.groups {
            let pipeline = self.pipeline_for(group);
            ::tracing::debug!(
                prefix = %group.prefix,
                stages = ?pipeline.stage_names(),
                "mounting route group"
            );

            let mut mounted = group
                .router
                .clone()
                .layer(middleware::from_fn_with_state(pipeline, pipeline::layer));
            if let Some(limit) = group.body_limit.or(self.default_body_limit) {
                mounted = mounted.layer(DefaultBodyLimit::max(limit));
            }

            router = if group.prefix == "/" {
                router.merge(mounted)
            } else {
                router.nest(&group.prefix, mounted)
            };
        }

        let router = router
            .fallback(not_found)
            .layer(CatchPanicLayer::custom(panic_response));

        security_headers::apply(router)
            .layer(CorsLayer::permissive())
            .layer(tracing::layer())
    }
}

async fn not_found() -> AppError {
    AppError::not_found("Not Found")
}

/// Constructs the application router with the built-in route groups.
pub fn app_router(state: &AppState) -> Router {
    Dispatcher::for_state(state).into_router()
}
