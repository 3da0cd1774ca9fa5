use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::app_state::ProxyState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub version: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub job_store: ComponentHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub latency_ms: Option<u64>,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// GET /health/live: the process is up.
pub async fn live() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready: the job store answers a minimal list request.
pub async fn ready(State(state): State<ProxyState>) -> (StatusCode, Json<ReadinessResponse>) {
    let start = std::time::Instant::now();

    let job_store = match state.job_store.list_jobs(None, None, 1).await {
        Ok(_) => ComponentHealth {
            status: "ok".to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
        },
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check against job store failed");
            ComponentHealth {
                status: "error".to_string(),
                latency_ms: None,
            }
        }
    };

    let healthy = job_store.status == "ok";
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = ReadinessResponse {
        status: if healthy {
            "ready".to_string()
        } else {
            "not_ready".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: ReadinessChecks { job_store },
    };

    (status_code, Json(response))
}
