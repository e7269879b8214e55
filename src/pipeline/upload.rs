//! Multipart image ingestion.
//!
//! Accepts exactly one file under the configured field (`image`), streams it
//! to the storage root under a unique name, and attaches the resulting
//! [`UploadedFileRecord`] to the request for the uploads handler.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::multipart::Field;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header;
use chrono::Utc;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::domain::entities::UploadedFileRecord;
use crate::error::AppError;
use crate::pipeline::Stage;

/// Attempts at finding a free storage name before giving up.
const MAX_NAME_ATTEMPTS: usize = 16;

/// Where and how uploads are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    /// Directory files are written to.
    pub root: PathBuf,
    /// URL prefix under which stored files are referenced, e.g. `/uploads`.
    pub public_prefix: String,
    /// Multipart field carrying the file.
    pub field_name: String,
    /// Extension appended to every storage name.
    pub extension: String,
    /// Largest accepted file in bytes.
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("uploads"),
            public_prefix: "/uploads".to_string(),
            field_name: "image".to_string(),
            extension: "jpg".to_string(),
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Removes a file that was not fully ingested.
///
/// Dropped while armed (write error, second file, cancelled request) it
/// deletes the file so no partial upload is left behind.
struct PendingFile {
    path: PathBuf,
    armed: bool,
}

impl PendingFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        if self.armed {
            // Drop cannot await; a single unlink is short enough to run inline
            // on the worker, and it must finish before the request is gone.
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!(error = %e, "failed to remove incomplete upload");
            } else {
                tracing::debug!(path = %self.path.display(), "removed incomplete upload");
            }
        }
    }
}

/// Pipeline stage persisting the single uploaded file.
///
/// # Naming
///
/// Storage names are `<unix-millis>-<sequence>.<extension>`. The sequence is
/// a per-stage atomic counter and files are created with `create_new`, so
/// concurrent uploads within the same millisecond (or after a restart) never
/// overwrite each other.
///
/// # Errors
///
/// - `400` if the body is not multipart, is malformed, exceeds `max_bytes`,
///   or does not carry exactly one file under the field
/// - `500` if the file cannot be written
pub struct UploadIngest {
    config: UploadConfig,
    sequence: AtomicU64,
}

impl UploadIngest {
    /// Creates the stage, creating the storage root if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the storage root cannot be created.
    pub fn new(config: UploadConfig) -> std::io::Result<Self> {
        std::fs::create_dir_all(&config.root)?;
        Ok(Self {
            config,
            sequence: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    fn storage_name(&self, millis: i64) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{millis}-{seq}.{}", self.config.extension)
    }

    fn public_path(&self, storage_name: &str) -> String {
        format!(
            "{}/{}",
            self.config.public_prefix.trim_end_matches('/'),
            storage_name
        )
    }

    /// Opens a fresh file under a name nobody else holds.
    async fn create_unique(&self) -> Result<(String, PathBuf, File), AppError> {
        fs::create_dir_all(&self.config.root).await?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = self.storage_name(Utc::now().timestamp_millis());
            let path = self.config.root.join(&name);

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((name, path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(AppError::storage(e)),
            }
        }

        Err(AppError::storage(std::io::Error::new(
            ErrorKind::AlreadyExists,
            "no free storage name",
        )))
    }

    async fn persist(
        &self,
        mut field: Field<'_>,
    ) -> Result<(UploadedFileRecord, PendingFile), AppError> {
        let field_name = field.name().unwrap_or_default().to_string();
        let (storage_name, storage_path, mut file) = self.create_unique().await?;
        let pending = PendingFile::new(storage_path.clone());

        let mut written = 0usize;
        while let Some(chunk) = field.chunk().await? {
            written += chunk.len();
            if written > self.config.max_bytes {
                return Err(AppError::bad_request(format!(
                    "File exceeds the {} byte limit",
                    self.config.max_bytes
                )));
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        file.sync_all().await?;

        let record = UploadedFileRecord {
            field_name,
            public_path: self.public_path(&storage_name),
            storage_name,
            storage_path,
        };

        Ok((record, pending))
    }

    /// Reads every multipart field and persists the single expected file.
    ///
    /// Fields other than the configured one are skipped.
    ///
    /// # Errors
    ///
    /// Returns a validation error for zero or several files; any file already
    /// written for this request is removed in that case.
    pub async fn ingest(&self, mut multipart: Multipart) -> Result<UploadedFileRecord, AppError> {
        let mut stored: Option<(UploadedFileRecord, PendingFile)> = None;

        while let Some(field) = multipart.next_field().await? {
            if field.name() != Some(self.config.field_name.as_str()) {
                continue;
            }
            if field.file_name().is_none() {
                return Err(AppError::bad_request(format!(
                    "Field '{}' must be a file",
                    self.config.field_name
                )));
            }
            if stored.is_some() {
                return Err(AppError::bad_request(format!(
                    "Expected exactly one file in field '{}'",
                    self.config.field_name
                )));
            }

            stored = Some(self.persist(field).await?);
        }

        let (record, pending) = stored.ok_or_else(|| {
            AppError::bad_request(format!(
                "No file uploaded in field '{}'",
                self.config.field_name
            ))
        })?;
        pending.keep();

        Ok(record)
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }
}

#[async_trait]
impl Stage for UploadIngest {
    fn name(&self) -> &'static str {
        "upload"
    }

    async fn process(&self, req: Request) -> Result<Request, AppError> {
        let (mut parts, body) = req.into_parts();

        // Multipart only needs the content type and the body limit extension;
        // the incoming parts are kept for the handler.
        let mut multipart_req = Request::new(body);
        if let Some(content_type) = parts.headers.get(header::CONTENT_TYPE) {
            multipart_req
                .headers_mut()
                .insert(header::CONTENT_TYPE, content_type.clone());
        }
        *multipart_req.extensions_mut() = parts.extensions.clone();

        let multipart = Multipart::from_request(multipart_req, &())
            .await
            .map_err(|rejection| {
                tracing::debug!(reason = %rejection, "upload is not multipart");
                AppError::bad_request("Expected a multipart/form-data body")
            })?;

        let record = self.ingest(multipart).await?;
        tracing::info!(
            storage_name = %record.storage_name,
            public_path = %record.public_path,
            "stored upload"
        );

        parts.extensions.insert(record);
        Ok(Request::from_parts(parts, Body::empty()))
    }
}
