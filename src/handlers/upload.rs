use axum::extract::multipart::{Field as MultipartField, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use bytes::BytesMut;

use crate::error::{AppError, Result};
use crate::models::{PhotoUpload, StudentFields};
use crate::validation::{is_allowed_photo_type, MAX_PHOTO_BYTES};

/// Form field carrying the student photo
pub const PHOTO_FIELD: &str = "photo";

/// Decoded multipart create/update request
#[derive(Debug, Default)]
pub struct StudentSubmission {
    pub fields: StudentFields,
    pub photo: Option<PhotoUpload>,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body is too large".to_string())
    } else {
        AppError::BadRequest(format!("Failed to process multipart: {}", e))
    }
}

async fn read_text(field: MultipartField<'_>) -> Result<String> {
    field.text().await.map_err(multipart_error)
}

/// Buffer the photo part, enforcing type and size while reading.
/// Returns `None` for an empty part, which browsers send when no file is chosen.
async fn read_photo(mut field: MultipartField<'_>) -> Result<Option<PhotoUpload>> {
    let file_name = field
        .file_name()
        .filter(|n| !n.is_empty())
        .map(|s| s.to_string());
    let content_type = field
        .content_type()
        .map(|s| s.to_string())
        .or_else(|| {
            file_name
                .as_deref()
                .and_then(|n| mime_guess::from_path(n).first_raw())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let Some(first) = field.chunk().await.map_err(multipart_error)? else {
        return Ok(None);
    };

    if !is_allowed_photo_type(&content_type) {
        return Err(AppError::UnsupportedMediaType(
            "Only PNG, JPG, GIF files are allowed".to_string(),
        ));
    }

    let mut buf = BytesMut::with_capacity(first.len());
    buf.extend_from_slice(&first);
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if buf.len() + chunk.len() > MAX_PHOTO_BYTES {
            return Err(AppError::PayloadTooLarge("Photo must not exceed 5MB".to_string()));
        }
        buf.extend_from_slice(&chunk);
    }
    if buf.len() > MAX_PHOTO_BYTES {
        return Err(AppError::PayloadTooLarge("Photo must not exceed 5MB".to_string()));
    }

    Ok(Some(PhotoUpload {
        bytes: buf.freeze(),
        content_type,
        file_name,
    }))
}

/// A submission refused while decoding. Carries the text fields read before and
/// after the failing part so a form can be shown again with them.
#[derive(Debug)]
pub struct UploadRejection {
    pub fields: StudentFields,
    pub error: AppError,
}

impl From<UploadRejection> for AppError {
    fn from(rejection: UploadRejection) -> Self {
        rejection.error
    }
}

impl StudentSubmission {
    /// Read text fields and at most one photo part.
    ///
    /// A bad part does not stop the scan; the remaining text parts are still
    /// collected and the first error is reported.
    pub async fn from_multipart(
        mut multipart: Multipart,
    ) -> std::result::Result<Self, UploadRejection> {
        let mut submission = StudentSubmission::default();
        let mut photo_seen = false;
        let mut rejected: Option<AppError> = None;

        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => {
                    rejected.get_or_insert(multipart_error(e));
                    break;
                }
            };
            let name = field.name().unwrap_or("").to_string();

            let outcome = match name.as_str() {
                PHOTO_FIELD if photo_seen => Err(AppError::BadRequest(
                    "Only one photo may be uploaded".to_string(),
                )),
                PHOTO_FIELD => {
                    photo_seen = true;
                    read_photo(field).await.map(|photo| submission.photo = photo)
                }
                "name" => read_text(field).await.map(|v| submission.fields.name = v),
                "company" => read_text(field)
                    .await
                    .map(|v| submission.fields.company = Some(v)),
                "phone1" => read_text(field).await.map(|v| submission.fields.phone1 = v),
                "phone2" => read_text(field)
                    .await
                    .map(|v| submission.fields.phone2 = Some(v)),
                "email" => read_text(field).await.map(|v| submission.fields.email = v),
                _ => Ok(()),
            };

            if let Err(e) = outcome {
                tracing::debug!(field = %name, "Rejected multipart part: {}", e);
                rejected.get_or_insert(e);
            }
        }

        if let Some(error) = rejected {
            return Err(UploadRejection {
                fields: submission.fields,
                error,
            });
        }

        tracing::debug!(
            photo_len = ?submission.photo.as_ref().map(|p| p.bytes.len()),
            "Decoded student submission"
        );
        Ok(submission)
    }
}
