use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::models::job::{Job, JobRecord, JobStatus, JobUpdate, NewJob};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for the job store API.
///
/// Translates between the store's snake_case rows and the camelCase [`Job`]
/// shape used by the rest of the system.
pub struct JobStoreClient {
    http: Client,
    base_url: String,
    token: String,
}

impl JobStoreClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, JobStoreError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(JobStoreError::Client)?;

        if token.is_empty() {
            tracing::warn!(
                "Job store token not configured; requests will be sent without authorization"
            );
        }

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        if self.token.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.token)
        }
    }

    /// Fetch a single job.
    pub async fn get_job(&self, job_id: Uuid) -> Result<Job, JobStoreError> {
        let response = send(self.request(reqwest::Method::GET, &format!("/jobs/{job_id}"))).await?;
        let record: JobRecord = decode(response).await?;
        Ok(record.into())
    }

    /// Register a new job in the `submitted` state.
    pub async fn create_job(
        &self,
        job_id: Uuid,
        r2_key: &str,
        slurm_id: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<Job, JobStoreError> {
        let body = NewJob {
            id: job_id.to_string(),
            r2_key: r2_key.to_string(),
            slurm_id: slurm_id.map(str::to_string),
            user_id: user_id.map(str::to_string),
            status: Some(JobStatus::Submitted),
            results_url: None,
        };

        let response = send(self.request(reqwest::Method::POST, "/jobs").json(&body)).await?;
        let record: JobRecord = decode(response).await?;
        Ok(record.into())
    }

    /// Partially update a job; only the supplied fields are sent.
    pub async fn update_job(
        &self,
        job_id: Uuid,
        status: Option<JobStatus>,
        slurm_id: Option<&str>,
        results_url: Option<&str>,
    ) -> Result<Job, JobStoreError> {
        let body = JobUpdate {
            status,
            slurm_id: slurm_id.map(str::to_string),
            results_url: results_url.map(str::to_string),
        };

        let response = send(
            self.request(reqwest::Method::PUT, &format!("/jobs/{job_id}"))
                .json(&body),
        )
        .await?;
        let record: JobRecord = decode(response).await?;
        Ok(record.into())
    }

    pub async fn delete_job(&self, job_id: Uuid) -> Result<(), JobStoreError> {
        send(self.request(reqwest::Method::DELETE, &format!("/jobs/{job_id}"))).await?;
        Ok(())
    }

    /// List jobs, newest first.
    pub async fn list_jobs(
        &self,
        status: Option<JobStatus>,
        user_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Job>, JobStoreError> {
        let mut query: Vec<(&str, String)> = vec![("limit", limit.to_string())];
        if let Some(status) = status {
            query.push(("status", status.as_stored()));
        }
        if let Some(user_id) = user_id {
            query.push(("user_id", user_id.to_string()));
        }

        let response = send(self.request(reqwest::Method::GET, "/jobs").query(&query)).await?;
        let records: Vec<JobRecord> = decode(response).await?;
        Ok(records.into_iter().map(Job::from).collect())
    }
}

async fn send(request: RequestBuilder) -> Result<Response, JobStoreError> {
    let response = request.send().await.map_err(JobStoreError::from_transport)?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => JobStoreError::NotFound,
        StatusCode::CONFLICT => JobStoreError::Conflict(body),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            JobStoreError::UpstreamUnavailable(status)
        }
        _ => JobStoreError::Status { status, body },
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, JobStoreError> {
    let bytes = response.bytes().await.map_err(JobStoreError::from_transport)?;
    serde_json::from_slice(&bytes).map_err(JobStoreError::Decode)
}

#[derive(Debug, thiserror::Error)]
pub enum JobStoreError {
    #[error("Job not found")]
    NotFound,

    #[error("Job already exists: {0}")]
    Conflict(String),

    #[error("Job store unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("Job store unavailable (HTTP {0})")]
    UpstreamUnavailable(StatusCode),

    #[error("Job store returned HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Malformed job store response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Job store request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl JobStoreError {
    fn from_transport(e: reqwest::Error) -> Self {
        if e.is_builder() {
            Self::Request(e)
        } else {
            Self::Unreachable(e)
        }
    }

    /// Connectivity problems worth retrying, as opposed to bad requests or
    /// malformed data.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::UpstreamUnavailable(_))
    }
}
