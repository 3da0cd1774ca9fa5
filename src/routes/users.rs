use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;

use super::error::ApiError;
use super::jobs::parse_body;
use crate::app_state::JobStoreState;
use crate::db::{self, queries};
use crate::models::metric::{NewProcessingMetric, ProcessingMetric};
use crate::models::user::{NewUser, User};

/// POST /users
pub async fn create_user(
    State(state): State<JobStoreState>,
    body: Bytes,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user: NewUser = parse_body(&body)?;
    user.validate()
        .map_err(|e| ApiError::bad_request(format!("Invalid user: {e}")))?;

    let created = queries::create_user(&state.db, &user, db::unix_now())
        .await
        .map_err(|e| ApiError::from_insert(e, "User with this id or email already exists"))?;

    tracing::info!(user_id = %created.id, "User created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<JobStoreState>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    queries::get_user(&state.db, &user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// POST /metrics: record processing statistics for an existing job.
pub async fn create_processing_metric(
    State(state): State<JobStoreState>,
    body: Bytes,
) -> Result<(StatusCode, Json<ProcessingMetric>), ApiError> {
    let input: NewProcessingMetric = parse_body(&body)?;

    let (Some(id), Some(job_id)) = (
        input.id.filter(|s| !s.is_empty()),
        input.job_id.filter(|s| !s.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Missing required fields: id, job_id"));
    };

    if !queries::job_exists(&state.db, &job_id).await? {
        return Err(ApiError::Validation(format!("Job {job_id} does not exist")));
    }

    let metric = ProcessingMetric {
        id,
        job_id,
        processing_time_seconds: input.processing_time_seconds,
        pdf_pages: input.pdf_pages,
        pdf_size_bytes: input.pdf_size_bytes,
        success: input.success.unwrap_or(false),
        error_message: input.error_message,
        created_at: db::unix_now(),
    };

    let stored = queries::create_processing_metric(&state.db, &metric)
        .await
        .map_err(|e| ApiError::from_insert(e, "Processing metric already exists"))?;

    tracing::info!(job_id = %stored.job_id, success = stored.success, "Processing metric recorded");
    Ok((StatusCode::CREATED, Json(stored)))
}
