//! Turns upload messages into job store records.

use std::time::Instant;

use uuid::Uuid;

use crate::services::job_store_client::{JobStoreClient, JobStoreError};
use crate::services::metrics_client::MetricsClient;
use crate::services::queue::{MessageQueue, QueueError};

/// Deliveries per message before it is dropped.
pub const MAX_ATTEMPTS: u32 = 3;

/// What happened to the message taken from the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Queue was empty.
    Idle,
    /// Job record created.
    Registered(Uuid),
    /// The job already existed (redelivered message).
    AlreadyRegistered(Uuid),
    /// Registration failed and the message was queued again.
    Requeued(Uuid),
    /// Registration kept failing; the message was dropped.
    Dropped(Uuid),
}

/// Process the next upload message, if any.
pub async fn process_next(
    queue: &dyn MessageQueue,
    job_store: &JobStoreClient,
    metrics: &MetricsClient,
) -> Result<Outcome, DispatchError> {
    let Some(message) = queue.dequeue().await? else {
        return Ok(Outcome::Idle);
    };

    tracing::info!(
        job_id = %message.job_id,
        r2_key = %message.r2_key,
        attempt = message.attempts + 1,
        "Registering uploaded job"
    );

    let started = Instant::now();
    let result = job_store
        .create_job(message.job_id, &message.r2_key, None, None)
        .await;
    let latency = started.elapsed().as_secs_f64();

    match result {
        Ok(job) => {
            queue.complete(&message).await?;
            metrics.record_job_submission(true, latency).await;
            tracing::info!(job_id = %job.id, status = %job.status, "Job registered");
            Ok(Outcome::Registered(job.id))
        }
        Err(JobStoreError::Conflict(_)) => {
            queue.complete(&message).await?;
            tracing::info!(job_id = %message.job_id, "Job already registered, acknowledging duplicate");
            Ok(Outcome::AlreadyRegistered(message.job_id))
        }
        Err(e) => {
            tracing::error!(job_id = %message.job_id, error = %e, "Failed to register job");
            metrics.record_job_submission(false, latency).await;

            let attempts = message.attempts + 1;
            if attempts >= MAX_ATTEMPTS {
                queue.complete(&message).await?;
                metrics.record_job_failure("job_store").await;
                tracing::warn!(
                    job_id = %message.job_id,
                    attempts,
                    "Dropping upload message after max attempts"
                );
                Ok(Outcome::Dropped(message.job_id))
            } else {
                let mut retry = message.clone();
                retry.attempts = attempts;
                queue.enqueue(&retry).await?;
                queue.complete(&message).await?;
                tracing::info!(job_id = %message.job_id, attempts, "Upload message re-queued for retry");
                Ok(Outcome::Requeued(message.job_id))
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}
