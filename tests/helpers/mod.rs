//! Shared helpers: ephemeral servers over the production routers, in-memory
//! queue and object store fakes, and a server that records pushed metrics.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use sqlx::SqlitePool;

use pdf_job_tracker::{
    app_state::{JobStoreState, MetricsStoreState, ProxyState, UploadState},
    db, routes,
    services::{
        job_store_client::JobStoreClient,
        metrics_client::MetricsClient,
        queue::{MessageQueue, QueueError, UploadMessage},
        storage::{ObjectStore, StorageError},
    },
};

pub const STORE_TOKEN: &str = "test-store-token";
pub const METRICS_TOKEN: &str = "test-metrics-token";

pub struct TestServer {
    pub base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Serve `app` on an ephemeral port.
    pub async fn spawn(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A base URL nothing is listening on.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub async fn job_store_pool() -> SqlitePool {
    let pool = db::init_pool("sqlite::memory:").await.unwrap();
    db::run_job_migrations(&pool).await.unwrap();
    pool
}

pub async fn metrics_store_pool() -> SqlitePool {
    let pool = db::init_pool("sqlite::memory:").await.unwrap();
    db::run_metrics_migrations(&pool).await.unwrap();
    pool
}

/// Job store on an in-memory database, authenticated with [`STORE_TOKEN`].
pub async fn spawn_job_store() -> (TestServer, SqlitePool) {
    let pool = job_store_pool().await;
    let app = routes::job_store_router(JobStoreState::new(pool.clone()), STORE_TOKEN, "*");
    (TestServer::spawn(app).await, pool)
}

/// Metrics store on an in-memory database, authenticated with [`METRICS_TOKEN`].
pub async fn spawn_metrics_store() -> (TestServer, SqlitePool) {
    let pool = metrics_store_pool().await;
    let app = routes::metrics_store_router(MetricsStoreState::new(pool.clone()), METRICS_TOKEN);
    (TestServer::spawn(app).await, pool)
}

/// Push client that never sends anything.
pub fn disabled_metrics() -> MetricsClient {
    MetricsClient::new("http://127.0.0.1:9/ingest", "", "test").unwrap()
}

pub async fn spawn_proxy(job_store_url: &str, token: &str, metrics: MetricsClient) -> TestServer {
    let client = JobStoreClient::new(job_store_url, token).unwrap();
    let state = ProxyState::new(client, metrics);
    let app = routes::proxy_router(state, &["http://localhost:5173".to_string()], None);
    TestServer::spawn(app).await
}

pub async fn spawn_upload(
    storage: Arc<MemoryObjectStore>,
    queue: Arc<MemoryQueue>,
) -> TestServer {
    let app = routes::upload_router(UploadState::new(storage, queue));
    TestServer::spawn(app).await
}

/// Create a job through the store API and return the stored row.
pub async fn create_job(
    client: &reqwest::Client,
    store: &TestServer,
    body: serde_json::Value,
) -> serde_json::Value {
    let res = client
        .post(store.url("/jobs"))
        .bearer_auth(STORE_TOKEN)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    res.json().await.unwrap()
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryObjectStore {
    pub fn get(&self, key: &str) -> Option<(Vec<u8>, String)> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (data.to_vec(), content_type.to_string()));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryQueue {
    pending: Mutex<VecDeque<UploadMessage>>,
    in_flight: Mutex<Vec<UploadMessage>>,
    reject_enqueue: AtomicBool,
}

impl MemoryQueue {
    /// Make every subsequent enqueue fail.
    pub fn reject_enqueues(&self) {
        self.reject_enqueue.store(true, Ordering::SeqCst);
    }

    pub fn pending(&self) -> Vec<UploadMessage> {
        self.pending.lock().unwrap().iter().cloned().collect()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    async fn enqueue(&self, message: &UploadMessage) -> Result<(), QueueError> {
        if self.reject_enqueue.load(Ordering::SeqCst) {
            let err = redis::RedisError::from((redis::ErrorKind::IoError, "queue offline"));
            return Err(QueueError::Redis(err));
        }
        self.pending.lock().unwrap().push_back(message.clone());
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<UploadMessage>, QueueError> {
        let next = self.pending.lock().unwrap().pop_front();
        if let Some(message) = &next {
            self.in_flight.lock().unwrap().push(message.clone());
        }
        Ok(next)
    }

    async fn complete(&self, message: &UploadMessage) -> Result<(), QueueError> {
        let mut in_flight = self.in_flight.lock().unwrap();
        if let Some(pos) = in_flight.iter().position(|m| m == message) {
            in_flight.remove(pos);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CapturedPush {
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

/// Records every request posted to `/ingest`.
#[derive(Clone, Default)]
pub struct Capture {
    requests: Arc<Mutex<Vec<CapturedPush>>>,
}

impl Capture {
    pub fn requests(&self) -> Vec<CapturedPush> {
        self.requests.lock().unwrap().clone()
    }

    /// Wait up to two seconds for a push carrying `metric`.
    pub async fn wait_for_metric(&self, metric: &str) -> Option<CapturedPush> {
        for _ in 0..100 {
            let found = self
                .requests()
                .into_iter()
                .find(|r| r.body["metrics"].get(metric).is_some());
            if found.is_some() {
                return found;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        None
    }
}

async fn capture_ingest(
    State((capture, status)): State<(Capture, StatusCode)>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    capture
        .requests
        .lock()
        .unwrap()
        .push(CapturedPush { authorization, body });
    status
}

/// Fake ingest endpoint answering every push with `status`.
pub async fn spawn_capture_server(status: StatusCode) -> (TestServer, Capture) {
    let capture = Capture::default();
    let app = Router::new()
        .route("/ingest", post(capture_ingest))
        .with_state((capture.clone(), status));
    (TestServer::spawn(app).await, capture)
}
