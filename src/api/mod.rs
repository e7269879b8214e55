//! HTTP surface of the gateway.
//!
//! # Modules
//!
//! - [`dto`] - Response bodies
//! - [`handlers`] - In-core route handlers (uploads, health)
//! - [`middleware`] - Tower layers wrapped around the whole router
//! - [`routes`] - Built-in route groups

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
