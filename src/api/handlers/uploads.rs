//! Handler for image uploads.

use axum::{Extension, Json, http::StatusCode};

use crate::api::dto::upload::UploadResponse;
use crate::domain::entities::UploadedFileRecord;
use crate::error::AppError;

/// Reports the path of the file stored by the upload stage.
///
/// # Endpoint
///
/// `POST /api/uploads`
///
/// # Request
///
/// `multipart/form-data` with exactly one file in field `image` and an
/// admin bearer token.
///
/// # Response
///
/// **201 Created**
///
/// ```json
/// { "image": "/uploads/1718000000000-0.jpg" }
/// ```
///
/// # Errors
///
/// - **400** - Missing/extra file or malformed body
/// - **401** - Missing or invalid token
/// - **403** - Token without admin role
/// - **429** - Rate limit exceeded
/// - **500** - File could not be written
pub async fn upload_handler(
    record: Option<Extension<UploadedFileRecord>>,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let Extension(record) =
        record.ok_or_else(|| AppError::internal("upload handler reached without ingest stage"))?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            image: record.public_path,
        }),
    ))
}
