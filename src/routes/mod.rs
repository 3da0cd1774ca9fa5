//! HTTP surfaces. Each binary serves one of the routers built here.

pub mod auth;
pub mod error;
pub mod health;
pub mod ingest;
pub mod job_status;
pub mod jobs;
pub mod metrics;
pub mod upload;
pub mod users;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::{middleware, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::{JobStoreState, MetricsStoreState, ProxyState, UploadState};
use auth::{require_bearer, BearerToken};

const STORE_BODY_LIMIT: usize = 1024 * 1024;
const UPLOAD_BODY_LIMIT: usize = 50 * 1024 * 1024;

fn origins(values: &[String]) -> AllowOrigin {
    if values.iter().any(|o| o == "*") {
        return AllowOrigin::any();
    }
    let parsed: Vec<HeaderValue> = values
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    AllowOrigin::list(parsed)
}

/// Job store API: jobs, users and per-job processing metrics. Every route
/// requires the bearer token; CORS preflights are answered without it.
pub fn job_store_router(state: JobStoreState, token: &str, allowed_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(origins(&[allowed_origin.to_string()]))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/jobs", post(jobs::create_job).get(jobs::list_jobs))
        .route(
            "/jobs/{id}",
            get(jobs::get_job)
                .put(jobs::update_job)
                .delete(jobs::delete_job),
        )
        .route("/users", post(users::create_user))
        .route("/users/{id}", get(users::get_user))
        .route("/metrics", post(users::create_processing_metric))
        .route_layer(middleware::from_fn_with_state(
            BearerToken::new(token),
            require_bearer,
        ))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(STORE_BODY_LIMIT))
        .layer(cors)
}

/// Metrics store API. Only ingest is authenticated.
pub fn metrics_store_router(state: MetricsStoreState, token: &str) -> Router {
    let protected = Router::new()
        .route("/ingest", post(ingest::ingest))
        .route_layer(middleware::from_fn_with_state(
            BearerToken::new(token),
            require_bearer,
        ));

    Router::new()
        .route("/metrics", get(ingest::export))
        .route("/api/metrics", get(ingest::query))
        .route("/api/sources", get(ingest::sources))
        .merge(protected)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(STORE_BODY_LIMIT))
        .layer(CorsLayer::permissive())
}

/// Job status proxy consumed by the frontend, plus health probes. When a
/// Prometheus handle is given, its registry is served at `/metrics`.
pub fn proxy_router(
    state: ProxyState,
    cors_allowed_origins: &[String],
    prometheus: Option<Arc<PrometheusHandle>>,
) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(origins(cors_allowed_origins))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let mut router = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready))
        .route("/api/job", get(job_status::list_jobs))
        .route("/api/job/status/{job_id}", get(job_status::get_status))
        .with_state(state);

    if let Some(handle) = prometheus {
        router = router.route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(handle),
        );
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}

/// Upload ingress.
pub fn upload_router(state: UploadState) -> Router {
    Router::new()
        .route("/upload", post(upload::upload_pdf))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(UPLOAD_BODY_LIMIT))
        .layer(CorsLayer::permissive())
}
