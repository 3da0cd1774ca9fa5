use sqlx::SqlitePool;
use std::sync::Arc;

use crate::services::{
    job_store_client::JobStoreClient,
    metrics_client::MetricsClient,
    queue::MessageQueue,
    storage::ObjectStore,
};

/// State of the job store API.
#[derive(Clone)]
pub struct JobStoreState {
    pub db: SqlitePool,
}

impl JobStoreState {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

/// State of the metrics store API.
#[derive(Clone)]
pub struct MetricsStoreState {
    pub db: SqlitePool,
}

impl MetricsStoreState {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

/// State of the job status proxy.
#[derive(Clone)]
pub struct ProxyState {
    pub job_store: Arc<JobStoreClient>,
    pub metrics: Arc<MetricsClient>,
}

impl ProxyState {
    pub fn new(job_store: JobStoreClient, metrics: MetricsClient) -> Self {
        Self {
            job_store: Arc::new(job_store),
            metrics: Arc::new(metrics),
        }
    }
}

/// State of the upload ingress.
#[derive(Clone)]
pub struct UploadState {
    pub storage: Arc<dyn ObjectStore>,
    pub queue: Arc<dyn MessageQueue>,
}

impl UploadState {
    pub fn new(storage: Arc<dyn ObjectStore>, queue: Arc<dyn MessageQueue>) -> Self {
        Self { storage, queue }
    }
}
