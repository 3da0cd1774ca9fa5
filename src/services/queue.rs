use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const QUEUE_KEY: &str = "pdf_jobs:uploads";
const PROCESSING_KEY: &str = "pdf_jobs:processing";

/// Message handed from upload ingress to the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadMessage {
    pub job_id: Uuid,
    pub r2_key: String,
    /// Milliseconds since the unix epoch at upload time.
    pub timestamp: i64,
    #[serde(default)]
    pub attempts: u32,
}

/// At-least-once queue between upload ingress and the dispatcher.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn enqueue(&self, message: &UploadMessage) -> Result<(), QueueError>;

    /// Take the next message, if any. It stays in flight until [`complete`].
    ///
    /// [`complete`]: MessageQueue::complete
    async fn dequeue(&self) -> Result<Option<UploadMessage>, QueueError>;

    /// Acknowledge a message taken with [`dequeue`](MessageQueue::dequeue).
    async fn complete(&self, message: &UploadMessage) -> Result<(), QueueError>;
}

/// Redis-backed upload queue.
pub struct RedisQueue {
    client: redis::Client,
}

impl RedisQueue {
    pub fn new(redis_url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url).map_err(QueueError::Redis)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MessageQueue for RedisQueue {
    async fn enqueue(&self, message: &UploadMessage) -> Result<(), QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(QueueError::Redis)?;
        let payload = serde_json::to_string(message).map_err(QueueError::Serialize)?;
        conn.lpush::<_, _, ()>(QUEUE_KEY, &payload)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<UploadMessage>, QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(QueueError::Redis)?;
        let result: Option<String> = conn
            .rpoplpush(QUEUE_KEY, PROCESSING_KEY)
            .await
            .map_err(QueueError::Redis)?;

        match result {
            Some(payload) => {
                let message: UploadMessage =
                    serde_json::from_str(&payload).map_err(QueueError::Serialize)?;
                Ok(Some(message))
            }
            None => Ok(None),
        }
    }

    async fn complete(&self, message: &UploadMessage) -> Result<(), QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(QueueError::Redis)?;
        let payload = serde_json::to_string(message).map_err(QueueError::Serialize)?;
        conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &payload)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
