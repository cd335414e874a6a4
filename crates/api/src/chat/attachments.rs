//! Attachment intake
//!
//! Validates one uploaded file per request against the MIME allow-list and
//! size ceiling, stores it, and verifies the owning session exists. A blob
//! stored for a session that turns out to be gone is deleted immediately;
//! orphan cleanup is not best-effort.

use axum::extract::multipart::Multipart;
use uuid::Uuid;

use stayline_shared::{Attachment, MAX_ATTACHMENT_BYTES};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

use super::store;

/// Document types accepted alongside `image/*`
const ALLOWED_DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "text/plain",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
];

/// Any image, or a fixed allow-list of document types
pub fn is_allowed_mime(mime: &str) -> bool {
    mime.starts_with("image/") || ALLOWED_DOCUMENT_TYPES.contains(&mime)
}

/// One uploaded file, pulled out of the multipart body
pub struct Upload {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Extract the single file field from a multipart request
pub async fn read_upload(mut multipart: Multipart) -> ApiResult<Upload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.file_name().is_none() {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "upload".to_string());
        let mime_type = field
            .content_type()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("File field is missing a content type".into()))?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;

        return Ok(Upload {
            filename,
            mime_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::BadRequest("No file field in request".into()))
}

/// Validate type and size before any storage side effect
pub fn validate_upload(upload: &Upload) -> ApiResult<()> {
    if !is_allowed_mime(&upload.mime_type) {
        return Err(ApiError::Validation(format!(
            "File type not allowed: {}",
            upload.mime_type
        )));
    }
    if upload.bytes.is_empty() {
        return Err(ApiError::Validation("Uploaded file is empty".into()));
    }
    if upload.bytes.len() > MAX_ATTACHMENT_BYTES {
        return Err(ApiError::Validation(format!(
            "File too large (max {} bytes)",
            MAX_ATTACHMENT_BYTES
        )));
    }
    Ok(())
}

/// Store an upload for a session, returning the descriptor the client will
/// reference from a subsequent message. The two-step flow (upload, then
/// message-with-attachment) lets clients batch or cancel attachments before
/// they reach the transcript.
pub async fn intake(state: &AppState, session_id: Uuid, upload: Upload) -> ApiResult<Attachment> {
    validate_upload(&upload)?;

    let (blob_name, url) = state
        .blobs
        .save(&upload.filename, &upload.bytes)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to store attachment blob");
            ApiError::Internal
        })?;

    // The session may have been TTL-reaped between request start and the
    // blob write; a stored blob without an owner must not survive.
    if !store::session_exists(&state.pool, session_id).await? {
        if let Err(e) = state.blobs.delete(&blob_name).await {
            tracing::error!(blob = %blob_name, error = %e, "Failed to delete orphaned attachment blob");
        }
        return Err(ApiError::NotFound);
    }

    tracing::info!(
        session_id = %session_id,
        blob = %blob_name,
        mime_type = %upload.mime_type,
        size = upload.bytes.len(),
        "Attachment stored"
    );

    Ok(Attachment {
        id: Uuid::new_v4(),
        url,
        filename: upload.filename,
        mime_type: upload.mime_type,
        size_bytes: upload.bytes.len() as i64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(mime: &str, size: usize) -> Upload {
        Upload {
            filename: "file.bin".to_string(),
            mime_type: mime.to_string(),
            bytes: vec![0u8; size],
        }
    }

    #[test]
    fn test_images_always_allowed() {
        assert!(is_allowed_mime("image/png"));
        assert!(is_allowed_mime("image/webp"));
        assert!(is_allowed_mime("image/x-obscure-format"));
    }

    #[test]
    fn test_document_allow_list() {
        assert!(is_allowed_mime("application/pdf"));
        assert!(is_allowed_mime("text/plain"));
        assert!(is_allowed_mime(
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        ));
        assert!(!is_allowed_mime("application/zip"));
        assert!(!is_allowed_mime("video/mp4"));
        assert!(!is_allowed_mime("application/x-msdownload"));
    }

    #[test]
    fn test_size_ceiling() {
        assert!(validate_upload(&upload("image/png", 1024)).is_ok());
        assert!(validate_upload(&upload("image/png", MAX_ATTACHMENT_BYTES)).is_ok());
        assert!(matches!(
            validate_upload(&upload("image/png", MAX_ATTACHMENT_BYTES + 1)),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_disallowed_type_rejected_before_storage() {
        assert!(matches!(
            validate_upload(&upload("application/zip", 10)),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_upload_rejected() {
        assert!(matches!(
            validate_upload(&upload("image/png", 0)),
            Err(ApiError::Validation(_))
        ));
    }
}
