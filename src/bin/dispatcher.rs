use pdf_job_tracker::{
    config::AppConfig,
    services::{
        dispatcher::{self, Outcome},
        job_store_client::JobStoreClient,
        metrics_client::MetricsClient,
        queue::RedisQueue,
    },
    telemetry,
};
use std::time::Duration;
use tokio::time::sleep;

const POLL_INTERVAL_MS: u64 = 1000; // 1 second

#[tokio::main]
async fn main() {
    telemetry::init_tracing();

    tracing::info!("Starting upload dispatcher");

    let config = AppConfig::from_env().expect("Failed to load configuration");

    tracing::info!("Connecting to Redis upload queue");
    let queue = RedisQueue::new(&config.redis_url).expect("Failed to initialize upload queue");

    let job_store = JobStoreClient::new(&config.db_api_url, &config.db_api_token)
        .expect("Failed to initialize job store client");

    let metrics = MetricsClient::new(
        &config.metrics_endpoint,
        &config.metrics_token,
        "dispatcher",
    )
    .expect("Failed to initialize metrics client");

    tracing::info!("Dispatcher ready, starting processing loop");

    loop {
        match dispatcher::process_next(&queue, &job_store, &metrics).await {
            Ok(Outcome::Idle) => {
                tracing::trace!("No uploads queued, sleeping");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
            Ok(Outcome::Requeued(job_id)) => {
                tracing::debug!(job_id = %job_id, "Registration failed, backing off");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
            Ok(outcome) => {
                tracing::debug!(?outcome, "Upload message handled, checking for next");
            }
            Err(e) => {
                tracing::error!(error = %e, "Error reading upload queue, will retry");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
        }
    }
}
