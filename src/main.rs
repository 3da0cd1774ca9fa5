use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;

use pdf_job_tracker::{
    app_state::ProxyState,
    config::AppConfig,
    routes,
    services::{job_store_client::JobStoreClient, metrics_client::MetricsClient},
    telemetry,
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[tokio::main]
async fn main() {
    telemetry::init_tracing();

    // Load configuration from environment and appsettings.json
    let config = AppConfig::from_env().expect("Failed to load configuration");

    tracing::info!("Initializing job status proxy");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);
    routes::metrics::describe_proxy_metrics();

    tracing::info!(base_url = %config.db_api_url, "Initializing job store client");
    let job_store = JobStoreClient::new(&config.db_api_url, &config.db_api_token)
        .expect("Failed to initialize job store client");

    let metrics = MetricsClient::new(
        &config.metrics_endpoint,
        &config.metrics_token,
        &config.metrics_source,
    )
    .expect("Failed to initialize metrics client");
    if !metrics.is_enabled() {
        tracing::info!("METRICS_TOKEN not set; metrics push disabled");
    }

    let state = ProxyState::new(job_store, metrics);
    let app = routes::proxy_router(state, &config.cors_allowed_origins, Some(prometheus_handle));

    let bind_addr = config.bind_addr_or(DEFAULT_BIND_ADDR);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Job status proxy listening on {}", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
