//! Typed failures and the error normalizer.
//!
//! Every stage and handler fails with an [`AppError`]. The [`IntoResponse`]
//! implementation below is the only place where a failure kind is mapped to
//! a wire status; the body is always an [`ErrorEnvelope`] `{ "message": ... }`.

use std::any::Any;

use axum::{
    Json,
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Message sent for every server-side failure. Internal detail only goes to the log.
const INTERNAL_MESSAGE: &str = "Internal Server Error";

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or unacceptable input.
    #[error("{message}")]
    Validation { message: String },

    /// Missing or invalid credential.
    #[error("{message}")]
    Unauthorized { message: String },

    /// Credential is valid but lacks the required role.
    #[error("{message}")]
    Forbidden { message: String },

    #[error("{message}")]
    NotFound { message: String },

    /// Client exhausted its request quota for the current window.
    #[error("{message}")]
    TooManyRequests { message: String, retry_after_secs: u64 },

    /// I/O failure while persisting an upload.
    #[error("storage failure: {source}")]
    Storage {
        #[source]
        source: std::io::Error,
    },

    /// Anything that does not fit another kind.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }
    pub fn too_many_requests(retry_after_secs: u64) -> Self {
        Self::TooManyRequests {
            message: "Too many requests, please try again later.".to_string(),
            retry_after_secs,
        }
    }
    pub fn storage(source: std::io::Error) -> Self {
        Self::Storage { source }
    }
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Canonical HTTP status for this failure kind.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Storage { .. } | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Builds the client-visible envelope. Server-side failures never leak
    /// their source text.
    pub fn envelope(&self) -> ErrorEnvelope {
        let message = match self {
            AppError::Validation { message }
            | AppError::Unauthorized { message }
            | AppError::Forbidden { message }
            | AppError::NotFound { message }
            | AppError::TooManyRequests { message, .. } => message.clone(),
            AppError::Storage { .. } | AppError::Internal { .. } => INTERNAL_MESSAGE.to_string(),
        };

        ErrorEnvelope {
            status: self.status(),
            message,
        }
    }
}

/// Standardized error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    #[serde(skip)]
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Storage { source } => {
                tracing::error!(error = %source, "upload storage failure");
            }
            AppError::Internal { message } => {
                tracing::error!(error = %message, "unclassified failure");
            }
            other => {
                tracing::debug!(status = %other.status(), reason = %other, "request rejected");
            }
        }

        let envelope = self.envelope();
        let mut response = (envelope.status, Json(envelope)).into_response();

        match self {
            AppError::Unauthorized { .. } => {
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Bearer"),
                );
            }
            AppError::TooManyRequests {
                retry_after_secs, ..
            } => {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
            }
            _ => {}
        }

        response
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::storage(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::bad_request(e.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        tracing::debug!(error = %e, "multipart parse failure");
        AppError::bad_request("Malformed multipart body")
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::internal(format!("{e:#}"))
    }
}

/// Converts a handler panic into the generic 500 envelope.
///
/// Installed through `tower_http::catch_panic::CatchPanicLayer::custom`.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    };

    AppError::internal(format!("handler panicked: {detail}")).into_response()
}
