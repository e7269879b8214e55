//! Tower layers applied around the whole router.
//!
//! Request gating lives in [`crate::pipeline`]; these layers only observe
//! or decorate responses.

pub mod security_headers;
pub mod tracing;
