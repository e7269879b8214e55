//! Authenticated caller identity.

use serde::{Deserialize, Serialize};

/// Privilege level carried by a verified credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Ordinary,
    Admin,
}

/// Identity resolved from a bearer credential.
///
/// Request-scoped: [`crate::pipeline::auth::AuthGate`] inserts it into the
/// request extensions and it is dropped together with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Role,
}

impl Principal {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: None,
            email: None,
            role,
        }
    }

    /// Returns true if the principal holds the admin role.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
