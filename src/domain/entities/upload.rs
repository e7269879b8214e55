//! Record of a file persisted by the upload stage.

use std::path::PathBuf;

/// A file accepted by [`crate::pipeline::upload::UploadIngest`].
///
/// Outlives the request as a file under the storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFileRecord {
    /// Multipart field the file arrived in.
    pub field_name: String,
    /// Unique file name assigned at ingestion, e.g. `1718000000000-0.jpg`.
    pub storage_name: String,
    /// Location on disk.
    pub storage_path: PathBuf,
    /// Path clients use to reference the file, e.g. `/uploads/1718000000000-0.jpg`.
    pub public_path: String,
}
