use std::str::FromStr;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use super::error::ApiError;
use crate::app_state::JobStoreState;
use crate::db::{self, queries};
use crate::models::job::{clamp_limit, JobFilter, JobRecord, JobStatus, JobUpdate, NewJob};

/// Decode a JSON body, reporting failures as a 400 with the store's error shape.
pub(crate) fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("Invalid JSON payload: {e}")))
}

fn parse_job_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found("Job not found"))
}

/// POST /jobs
pub async fn create_job(
    State(state): State<JobStoreState>,
    body: Bytes,
) -> Result<(StatusCode, Json<JobRecord>), ApiError> {
    let job: NewJob = parse_body(&body)?;
    job.validate()
        .map_err(|_| ApiError::bad_request("Missing required fields: id, r2_key"))?;
    let id = Uuid::parse_str(&job.id).map_err(|_| ApiError::bad_request("id must be a UUID"))?;

    let record = queries::create_job(&state.db, id, &job, db::unix_now())
        .await
        .map_err(|e| ApiError::from_insert(e, format!("Job {id} already exists")))?;

    tracing::info!(job_id = %record.id, status = %record.status, "Job created");
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /jobs/{id}
pub async fn get_job(
    State(state): State<JobStoreState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobRecord>, ApiError> {
    let job_id = parse_job_id(&job_id)?;
    queries::get_job(&state.db, job_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Job not found"))
}

#[derive(Debug, Deserialize)]
pub struct ListJobsParams {
    pub status: Option<String>,
    pub user_id: Option<String>,
    pub limit: Option<String>,
}

/// GET /jobs?status=&user_id=&limit=
pub async fn list_jobs(
    State(state): State<JobStoreState>,
    Query(params): Query<ListJobsParams>,
) -> Result<Json<Vec<JobRecord>>, ApiError> {
    let status = match params.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            JobStatus::from_str(raw)
                .map_err(|_| ApiError::bad_request(format!("Unknown status '{raw}'")))?,
        ),
        None => None,
    };

    let filter = JobFilter {
        status,
        user_id: params.user_id.filter(|s| !s.is_empty()),
        limit: clamp_limit(params.limit.as_deref()),
    };

    let jobs = queries::list_jobs(&state.db, &filter).await?;
    Ok(Json(jobs))
}

/// PUT /jobs/{id}
pub async fn update_job(
    State(state): State<JobStoreState>,
    Path(job_id): Path<String>,
    body: Bytes,
) -> Result<Json<JobRecord>, ApiError> {
    let job_id = parse_job_id(&job_id)?;
    let update: JobUpdate = parse_body(&body)?;

    let record = queries::update_job(&state.db, job_id, &update, db::unix_now())
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    tracing::info!(job_id = %record.id, status = %record.status, "Job updated");
    Ok(Json(record))
}

/// DELETE /jobs/{id}. Succeeds whether or not the job existed.
pub async fn delete_job(
    State(state): State<JobStoreState>,
    Path(job_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let Ok(job_id) = Uuid::parse_str(&job_id) else {
        return Ok(StatusCode::NO_CONTENT);
    };

    let removed = queries::delete_job(&state.db, job_id).await?;
    tracing::info!(job_id = %job_id, removed, "Job deleted");
    Ok(StatusCode::NO_CONTENT)
}
