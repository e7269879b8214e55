//! Bearer token authentication gate.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Request};
use axum_auth::AuthBearer;

use crate::domain::CredentialVerifier;
use crate::error::AppError;
use crate::pipeline::Stage;

/// Resolves the `Authorization: Bearer <token>` credential to a
/// [`crate::domain::entities::Principal`] and stores it in the request
/// extensions.
///
/// # Errors
///
/// Returns `401 Unauthorized` if:
/// - Authorization header is missing, empty, or not a bearer credential
/// - The verifier rejects the token
///
/// A rejected credential is terminal for the request; nothing is retried.
pub struct AuthGate {
    verifier: Arc<dyn CredentialVerifier>,
}

impl AuthGate {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { verifier }
    }
}

#[async_trait]
impl Stage for AuthGate {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn process(&self, req: Request) -> Result<Request, AppError> {
        let (mut parts, body) = req.into_parts();

        let token = match AuthBearer::from_request_parts(&mut parts, &()).await {
            Ok(AuthBearer(token)) if !token.trim().is_empty() => token,
            _ => return Err(AppError::unauthorized("No Token Supplied")),
        };

        let principal = self.verifier.verify(token.trim()).await.map_err(|e| {
            tracing::debug!(reason = %e, "bearer credential rejected");
            AppError::unauthorized("Invalid Token")
        })?;

        tracing::debug!(principal = %principal.id, role = ?principal.role, "authenticated");
        parts.extensions.insert(principal);

        Ok(Request::from_parts(parts, body))
    }
}
