use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Prometheus scrape endpoint for the proxy's own counters and histograms.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}

/// Register descriptions for the proxy's in-process metrics.
pub fn describe_proxy_metrics() {
    metrics::describe_counter!(
        "job_proxy_status_checks_total",
        "Job status lookups forwarded to the job store"
    );
    metrics::describe_counter!(
        "job_proxy_list_requests_total",
        "Job list requests forwarded to the job store"
    );
    metrics::describe_counter!(
        "job_proxy_upstream_failures_total",
        "Job store calls that failed, by kind"
    );
    metrics::describe_histogram!(
        "job_proxy_upstream_latency_seconds",
        "Latency of job status lookups against the job store"
    );
}
