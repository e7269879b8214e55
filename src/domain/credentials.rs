//! Credential verification contract used by the auth gate.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::Principal;

/// Why a presented credential was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationFailure {
    #[error("credential is malformed")]
    Malformed,

    #[error("credential signature does not match")]
    BadSignature,

    #[error("credential has expired")]
    Expired,

    #[error("credential claims are invalid: {0}")]
    InvalidClaims(String),
}

/// Resolves a raw bearer token to a [`Principal`].
///
/// # Implementations
///
/// - [`crate::infrastructure::jwt::Hs256Verifier`] - HMAC-SHA256 signed tokens
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Verifies the token and returns the identity it carries.
    ///
    /// # Errors
    ///
    /// Returns a [`VerificationFailure`] if the token cannot be trusted.
    async fn verify(&self, token: &str) -> Result<Principal, VerificationFailure>;
}
