//! DTOs for upload endpoint.

use serde::{Deserialize, Serialize};

/// Body of a successful upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Public path of the stored file.
    pub image: String,
}
