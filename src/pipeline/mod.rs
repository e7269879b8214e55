//! The request pipeline: an explicit, ordered list of stages.
//!
//! Each [`Stage`] either hands the (possibly rewritten) request on or rejects
//! it with a typed [`AppError`]. [`Pipeline::run`] executes stages strictly in
//! order and stops at the first rejection, so later stages and the route
//! handler never see a rejected request.
//!
//! # Stages
//!
//! - [`security::SecurityFilterStage`] - markup sanitization and parameter-pollution collapse
//! - [`rate_limit::RateLimiter`] - fixed-window per-client quota
//! - [`auth::AuthGate`] - bearer credential → [`crate::domain::entities::Principal`]
//! - [`admin::AdminGate`] - admin role check
//! - [`upload::UploadIngest`] - single `image` file persisted to disk
//!
//! Pipelines are attached to routers with [`layer`], see [`crate::dispatcher`].

pub mod admin;
pub mod auth;
pub mod rate_limit;
pub mod security;
pub mod upload;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;

pub use admin::AdminGate;
pub use auth::AuthGate;
pub use rate_limit::{RateDecision, RateLimitConfig, RateLimitStore, RateLimiter};
pub use security::SecurityFilterStage;
pub use upload::{UploadConfig, UploadIngest};

/// One unit of the request pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Allows the request (returning it, possibly rewritten) or rejects it.
    async fn process(&self, req: Request) -> Result<Request, AppError>;
}

/// Ordered list of stages applied to every request of a route group.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage; it runs after every stage added before it.
    pub fn with_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Appends all stages of `other`, preserving their order.
    pub fn then(mut self, other: &Pipeline) -> Self {
        self.stages.extend(other.stages.iter().cloned());
        self
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs every stage in order, short-circuiting on the first failure.
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage that rejects the request.
    pub async fn run(&self, mut req: Request) -> Result<Request, AppError> {
        for stage in &self.stages {
            req = stage.process(req).await.inspect_err(|e| {
                tracing::debug!(stage = stage.name(), error = %e, "stage rejected request");
            })?;
        }
        Ok(req)
    }
}

/// Axum middleware running `pipeline` before the inner handler.
///
/// Failures are returned as [`AppError`], whose response conversion is the
/// single error normalization point.
///
/// # Example
///
/// ```rust,ignore
/// let router = Router::new()
///     .route("/", post(upload_handler))
///     .layer(middleware::from_fn_with_state(pipeline, pipeline::layer));
/// ```
pub async fn layer(
    State(pipeline): State<Pipeline>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let req = pipeline.run(req).await?;
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use std::sync::Mutex;

    /// Records its name into a shared log and optionally rejects.
    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        reject: bool,
    }

    #[async_trait]
    impl Stage for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn process(&self, req: Request) -> Result<Request, AppError> {
            self.log.lock().unwrap().push(self.name);
            if self.reject {
                Err(AppError::forbidden(self.name))
            } else {
                Ok(req)
            }
        }
    }

    fn stage(
        name: &'static str,
        log: &Arc<Mutex<Vec<&'static str>>>,
        reject: bool,
    ) -> Arc<dyn Stage> {
        Arc::new(Recording {
            name,
            log: log.clone(),
            reject,
        })
    }

    fn request() -> Request {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_stages_run_in_declared_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new()
            .with_stage(stage("first", &log, false))
            .with_stage(stage("second", &log, false))
            .with_stage(stage("third", &log, false));

        assert!(pipeline.run(request()).await.is_ok());
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_short_circuits_on_first_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new()
            .with_stage(stage("first", &log, false))
            .with_stage(stage("gate", &log, true))
            .with_stage(stage("never", &log, false));

        let err = pipeline.run(request()).await.unwrap_err();

        assert!(matches!(err, AppError::Forbidden { ref message } if message == "gate"));
        assert_eq!(*log.lock().unwrap(), vec!["first", "gate"]);
    }

    #[tokio::test]
    async fn test_then_appends_after_existing_stages() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let common = Pipeline::new().with_stage(stage("common", &log, false));
        let group = Pipeline::new().with_stage(stage("group", &log, false));

        let combined = common.then(&group);

        assert_eq!(combined.stage_names(), vec!["common", "group"]);
    }

    #[tokio::test]
    async fn test_empty_pipeline_allows() {
        assert!(Pipeline::new().run(request()).await.is_ok());
    }
}
