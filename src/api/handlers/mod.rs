//! HTTP request handlers for in-core endpoints.

pub mod health;
pub mod uploads;

pub use health::health_handler;
pub use uploads::upload_handler;
