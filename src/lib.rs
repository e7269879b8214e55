//! # Storefront Gateway
//!
//! The request pipeline in front of a storefront API: every request passes
//! through security filtering and rate limiting, then route-specific gates
//! (bearer authentication, admin authorization, image ingestion) before a
//! handler runs. Failures from any stage are normalized into a single JSON
//! envelope `{ "message": ... }` with a canonical status.
//!
//! ## Architecture
//!
//! - **Domain** ([`domain`]) - [`domain::entities::Principal`], upload records, verifier contract
//! - **Pipeline** ([`pipeline`]) - The [`pipeline::Stage`] trait and every stage
//! - **Infrastructure** ([`infrastructure`]) - HS256 token verification
//! - **API** ([`api`]) - In-core handlers, DTOs, and outer middleware
//! - **Dispatcher** ([`dispatcher`]) - Route groups composed with their pipelines
//!
//! ## Quick Start
//!
//! ```bash
//! export JWT_SECRET="change-me"
//! cargo run
//!
//! # Mint an admin token
//! cargo run --bin admin -- token --id 5f1d7c2e --admin
//! ```
//!
//! ## Configuration
//!
//! Service configuration is loaded from environment variables via [`config::Config`].

pub mod api;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod pipeline;
pub mod server;
pub mod state;
pub mod utils;

pub use error::AppError;
pub use state::AppState;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for route-group
/// authors and integration tests.
pub mod prelude {
    pub use crate::dispatcher::{Dispatcher, RouteGroup, app_router};
    pub use crate::domain::entities::{Principal, Role, UploadedFileRecord};
    pub use crate::domain::{CredentialVerifier, VerificationFailure};
    pub use crate::error::{AppError, ErrorEnvelope};
    pub use crate::pipeline::{AdminGate, AuthGate, Pipeline, Stage};
    pub use crate::state::AppState;
}
