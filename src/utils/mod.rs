//! Request helpers shared by pipeline stages.
//!
//! - [`client_ip`] - Client key extraction for rate limiting

pub mod client_ip;
