//! Domain layer: request-scoped entities and collaborator contracts.
//!
//! # Modules
//!
//! - [`entities`] - [`entities::Principal`] and [`entities::UploadedFileRecord`]
//! - [`credentials`] - [`credentials::CredentialVerifier`] trait injected into the auth gate
//!
//! The domain layer has no dependencies on the pipeline or infrastructure layers.

pub mod credentials;
pub mod entities;

pub use credentials::{CredentialVerifier, VerificationFailure};

#[cfg(test)]
pub use credentials::MockCredentialVerifier;
