//! Core domain entities flowing through the request pipeline.
//!
//! Entities are plain data structures without I/O.
//!
//! # Entity Types
//!
//! - [`Principal`] - Identity and [`Role`] resolved from a bearer credential
//! - [`UploadedFileRecord`] - A file persisted by the upload stage

pub mod principal;
pub mod upload;

pub use principal::{Principal, Role};
pub use upload::UploadedFileRecord;
