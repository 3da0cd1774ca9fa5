use std::str::FromStr;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::ProxyState;
use crate::models::job::{Job, JobStatus, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use crate::models::responses::ErrorResponse;
use crate::services::job_store_client::JobStoreError;

type ProxyResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn detail(status: StatusCode, text: &str) -> (StatusCode, Json<ErrorResponse>) {
    (status, Json(ErrorResponse::new(text)))
}

/// Map a job store failure to a caller-facing status and fixed message.
fn upstream_error(e: &JobStoreError, job_id: Option<Uuid>) -> (StatusCode, Json<ErrorResponse>) {
    match e {
        JobStoreError::NotFound => detail(StatusCode::NOT_FOUND, "Job not found"),
        e if e.is_unavailable() => {
            metrics::counter!("job_proxy_upstream_failures_total", "kind" => "unavailable")
                .increment(1);
            tracing::error!(job_id = ?job_id, error = %e, "Job store unavailable");
            detail(
                StatusCode::SERVICE_UNAVAILABLE,
                "Job store is temporarily unavailable",
            )
        }
        e => {
            metrics::counter!("job_proxy_upstream_failures_total", "kind" => "error").increment(1);
            tracing::error!(job_id = ?job_id, error = %e, "Unexpected job store failure");
            detail(StatusCode::INTERNAL_SERVER_ERROR, "An unexpected error occurred")
        }
    }
}

/// GET /api/job/status/{jobId}
pub async fn get_status(
    State(state): State<ProxyState>,
    Path(job_id): Path<String>,
) -> ProxyResult<Job> {
    let job_id = Uuid::parse_str(&job_id)
        .map_err(|_| detail(StatusCode::BAD_REQUEST, "Invalid job ID format"))?;

    let started = Instant::now();
    let result = state.job_store.get_job(job_id).await;
    let latency = started.elapsed().as_secs_f64();

    metrics::counter!("job_proxy_status_checks_total").increment(1);
    metrics::histogram!("job_proxy_upstream_latency_seconds").record(latency);

    // Off the request path: pushing must never delay the response.
    let push = state.metrics.clone();
    tokio::spawn(async move {
        push.record_status_check(latency).await;
    });

    match result {
        Ok(job) => {
            tracing::debug!(job_id = %job.id, status = %job.status, "Job status fetched");
            Ok(Json(job))
        }
        Err(e) => Err(upstream_error(&e, Some(job_id))),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub status: Option<String>,
    pub user_id: Option<String>,
    pub limit: Option<String>,
}

/// GET /api/job?status=&userId=&limit=
pub async fn list_jobs(
    State(state): State<ProxyState>,
    Query(params): Query<ListParams>,
) -> ProxyResult<Vec<Job>> {
    let limit = match params.limit.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => DEFAULT_LIST_LIMIT,
        Some(raw) => raw
            .parse::<i64>()
            .ok()
            .filter(|n| (1..=MAX_LIST_LIMIT).contains(n))
            .ok_or_else(|| {
                detail(
                    StatusCode::BAD_REQUEST,
                    "limit must be an integer between 1 and 1000",
                )
            })?,
    };

    let status = match params.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            JobStatus::from_str(raw)
                .map_err(|_| detail(StatusCode::BAD_REQUEST, "Unknown job status"))?,
        ),
        None => None,
    };

    let user_id = match params.user_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            Uuid::parse_str(raw)
                .map_err(|_| detail(StatusCode::BAD_REQUEST, "userId must be a valid UUID"))?
                .to_string(),
        ),
        None => None,
    };

    metrics::counter!("job_proxy_list_requests_total").increment(1);

    state
        .job_store
        .list_jobs(status, user_id.as_deref(), limit)
        .await
        .map(Json)
        .map_err(|e| {
            metrics::counter!("job_proxy_upstream_failures_total", "kind" => "list").increment(1);
            tracing::error!(error = %e, "Failed to list jobs");
            detail(StatusCode::INTERNAL_SERVER_ERROR, "Failed to retrieve jobs")
        })
}
