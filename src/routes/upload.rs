use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use super::error::json_error;
use crate::app_state::UploadState;
use crate::models::responses::UploadResponse;
use crate::services::queue::UploadMessage;

const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Expected a multipart/form-data body")]
    NotMultipart,

    #[error("Missing 'file' field")]
    MissingFile,

    #[error("Malformed multipart body")]
    Malformed,

    #[error("Uploaded file is not a PDF")]
    NotPdf,

    #[error("Failed to store uploaded file")]
    Storage,

    #[error("Failed to queue uploaded file for processing")]
    Queue,
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let (status, code) = match self {
            UploadError::NotMultipart | UploadError::MissingFile | UploadError::Malformed => {
                (StatusCode::BAD_REQUEST, "bad_request")
            }
            UploadError::NotPdf => (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_media_type"),
            UploadError::Storage => (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable"),
            UploadError::Queue => (StatusCode::SERVICE_UNAVAILABLE, "queue_unavailable"),
        };
        json_error(status, code, self.to_string())
    }
}

/// Object key for an uploaded source file.
pub fn source_key(job_id: Uuid) -> String {
    format!("raw/{job_id}.pdf")
}

/// POST /upload: store a PDF and queue it for job registration.
pub async fn upload_pdf(
    State(state): State<UploadState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, UploadError> {
    let mut multipart = multipart.map_err(|_| UploadError::NotMultipart)?;

    let mut data = None;
    while let Some(field) = multipart.next_field().await.map_err(|_| UploadError::Malformed)? {
        if field.name() == Some("file") {
            data = Some(field.bytes().await.map_err(|_| UploadError::Malformed)?);
            break;
        }
    }
    let data = data.ok_or(UploadError::MissingFile)?;

    if !data.starts_with(PDF_MAGIC) {
        return Err(UploadError::NotPdf);
    }

    let job_id = Uuid::new_v4();
    let r2_key = source_key(job_id);

    state
        .storage
        .put(&r2_key, &data, PDF_CONTENT_TYPE)
        .await
        .map_err(|e| {
            tracing::error!(job_id = %job_id, error = %e, "Failed to store upload");
            UploadError::Storage
        })?;

    let message = UploadMessage {
        job_id,
        r2_key: r2_key.clone(),
        timestamp: chrono::Utc::now().timestamp_millis(),
        attempts: 0,
    };

    if let Err(e) = state.queue.enqueue(&message).await {
        tracing::error!(job_id = %job_id, error = %e, "Failed to enqueue upload");
        if let Err(e) = state.storage.delete(&r2_key).await {
            tracing::warn!(job_id = %job_id, error = %e, "Failed to remove orphaned upload");
        }
        return Err(UploadError::Queue);
    }

    tracing::info!(job_id = %job_id, r2_key = %r2_key, size = data.len(), "PDF uploaded");
    Ok(Json(UploadResponse { job_id }))
}
