use std::sync::Arc;

use pdf_job_tracker::{
    app_state::UploadState,
    config::AppConfig,
    routes,
    services::{queue::RedisQueue, storage::R2Client},
    telemetry,
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8789";

#[tokio::main]
async fn main() {
    telemetry::init_tracing();

    let config = AppConfig::from_env().expect("Failed to load configuration");

    tracing::info!("Initializing upload ingress");

    // Initialize R2 storage client
    let r2 = config.r2_settings().expect("R2 storage is not configured");
    tracing::info!(bucket = %r2.bucket, "Initializing R2 storage client");
    let storage = R2Client::new(&r2.bucket, &r2.endpoint, &r2.access_key, &r2.secret_key)
        .expect("Failed to initialize R2 client");

    // Initialize Redis upload queue
    tracing::info!("Connecting to Redis upload queue");
    let queue = RedisQueue::new(&config.redis_url).expect("Failed to initialize upload queue");

    let app = routes::upload_router(UploadState::new(Arc::new(storage), Arc::new(queue)));

    let bind_addr = config.bind_addr_or(DEFAULT_BIND_ADDR);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Upload ingress listening on {}", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
