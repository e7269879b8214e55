//! Admin role gate.

use async_trait::async_trait;
use axum::extract::Request;

use crate::domain::entities::Principal;
use crate::error::AppError;
use crate::pipeline::Stage;

/// Allows only principals with the admin role.
///
/// Must run after [`crate::pipeline::AuthGate`]. A request without a resolved
/// principal is treated as unauthenticated, never as authorized.
#[derive(Debug, Default, Clone, Copy)]
pub struct AdminGate;

impl AdminGate {
    /// Pure role check.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Forbidden`] for non-admin principals.
    pub fn authorize(principal: &Principal) -> Result<(), AppError> {
        if principal.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Invalid Admin Token"))
        }
    }
}

#[async_trait]
impl Stage for AdminGate {
    fn name(&self) -> &'static str {
        "admin"
    }

    async fn process(&self, req: Request) -> Result<Request, AppError> {
        let principal = req
            .extensions()
            .get::<Principal>()
            .ok_or_else(|| AppError::unauthorized("No Token Supplied"))?;

        Self::authorize(principal)?;
        Ok(req)
    }
}
