//! Infrastructure layer: concrete implementations of domain contracts.
//!
//! # Modules
//!
//! - [`jwt`] - HS256 implementation of [`crate::domain::CredentialVerifier`]

pub mod jwt;

pub use jwt::{Hs256Verifier, TokenClaims};
