//! Built-in route groups.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::api::handlers::{health_handler, upload_handler};
use crate::dispatcher::RouteGroup;
use crate::pipeline::{AdminGate, AuthGate};
use crate::state::AppState;

/// Mount point of the uploads group.
pub const UPLOADS_PREFIX: &str = "/api/uploads";

/// Multipart framing allowance on top of the file size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Image uploads.
///
/// # Endpoints
///
/// - `POST /api/uploads` - Store one `image` file (admin only)
///
/// Gates: [`AuthGate`] → [`AdminGate`] → [`crate::pipeline::UploadIngest`].
pub fn uploads_group(state: &AppState) -> RouteGroup {
    let router = Router::new().route("/", post(upload_handler));
    let body_limit = state.upload_ingest.config().max_bytes + MULTIPART_OVERHEAD;

    RouteGroup::new(UPLOADS_PREFIX, router)
        .with_stage(Arc::new(AuthGate::new(state.verifier.clone())))
        .with_stage(Arc::new(AdminGate))
        .with_stage(state.upload_ingest.clone())
        .with_body_limit(body_limit)
}

/// Liveness probe, behind the common stages only.
///
/// # Endpoints
///
/// - `GET /health` - Service status
pub fn health_group() -> RouteGroup {
    let router = Router::new().route("/health", get(health_handler));

    RouteGroup::new("/", router)
}
