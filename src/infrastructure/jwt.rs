//! HMAC-SHA256 bearer token verification.
//!
//! Tokens are compact JWS strings (`header.payload.signature`, each part
//! URL-safe base64 without padding) signed with the server-side `JWT_SECRET`.

use std::collections::HashSet;

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{Principal, Role};
use crate::domain::{CredentialVerifier, VerificationFailure};

/// Claims carried by a bearer token.
///
/// Field names follow the payload the storefront's user service issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,

    /// Issued-at, seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Expiry, seconds since the epoch. Tokens without `exp` never expire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl From<TokenClaims> for Principal {
    fn from(claims: TokenClaims) -> Self {
        Principal {
            id: claims.id,
            name: claims.name,
            email: claims.email,
            role: if claims.is_admin {
                Role::Admin
            } else {
                Role::Ordinary
            },
        }
    }
}

/// Verifies (and issues) HS256 tokens with a shared secret.
pub struct Hs256Verifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl Hs256Verifier {
    /// Creates a verifier keyed by `secret`.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();

        // Only HS256 is accepted. `exp` is optional; when present it is
        // checked without leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issues a signed token for `claims`.
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be serialized.
    pub fn sign(&self, claims: &TokenClaims) -> jsonwebtoken::errors::Result<String> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
    }

    /// Checks algorithm, signature and expiry, returning the decoded claims.
    ///
    /// # Errors
    ///
    /// - [`VerificationFailure::Malformed`] if the token is not a compact JWS
    ///   or is not signed with HS256
    /// - [`VerificationFailure::BadSignature`] if the MAC does not match
    /// - [`VerificationFailure::InvalidClaims`] if the payload is not valid claims JSON
    /// - [`VerificationFailure::Expired`] if `exp` has passed
    pub fn decode(&self, token: &str) -> Result<TokenClaims, VerificationFailure> {
        // Header problems (including unknown algorithms such as `none`) are
        // structural, not claim errors.
        jsonwebtoken::decode_header(token).map_err(|_| VerificationFailure::Malformed)?;

        jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => VerificationFailure::BadSignature,
                ErrorKind::ExpiredSignature => VerificationFailure::Expired,
                ErrorKind::Json(inner) => VerificationFailure::InvalidClaims(inner.to_string()),
                _ => VerificationFailure::Malformed,
            })
    }
}

#[async_trait]
impl CredentialVerifier for Hs256Verifier {
    async fn verify(&self, token: &str) -> Result<Principal, VerificationFailure> {
        self.decode(token).map(Principal::from)
    }
}
