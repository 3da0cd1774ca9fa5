use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

const PUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Push-based metrics client.
///
/// Posts named values to the metrics store's ingest endpoint. Pushing never
/// fails the caller: without a token it is a no-op, and delivery errors are
/// logged and dropped.
pub struct MetricsClient {
    http: Client,
    endpoint: String,
    token: String,
    source: String,
}

#[derive(Serialize)]
struct PushPayload<'a> {
    source: &'a str,
    timestamp: i64,
    metrics: &'a BTreeMap<String, f64>,
}

impl MetricsClient {
    pub fn new(endpoint: &str, token: &str, source: &str) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(PUSH_TIMEOUT).build()?;

        if endpoint.contains("your-domain") {
            tracing::warn!(
                "METRICS_ENDPOINT is using a placeholder value; set it to the metrics store ingest URL"
            );
        }

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            token: token.to_string(),
            source: source.to_string(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        !self.token.is_empty()
    }

    /// Push a set of metrics stamped with the current time.
    pub async fn push(&self, metrics: BTreeMap<String, f64>) {
        if !self.is_enabled() {
            tracing::debug!("Metrics push skipped: METRICS_TOKEN not configured");
            return;
        }

        let payload = PushPayload {
            source: &self.source,
            timestamp: chrono::Utc::now().timestamp(),
            metrics: &metrics,
        };

        let result = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        if let Err(e) = result {
            tracing::error!(error = %e, endpoint = %self.endpoint, "Failed to push metrics");
        }
    }

    pub async fn record_job_submission(&self, success: bool, latency_secs: f64) {
        let mut metrics = BTreeMap::from([
            ("slurm_submitted_jobs_total".to_string(), 1.0),
            ("slurm_submission_latency_seconds".to_string(), latency_secs),
        ]);
        if success {
            metrics.insert("slurm_submission_success".to_string(), 1.0);
        } else {
            metrics.insert("slurm_submission_failure".to_string(), 1.0);
        }
        self.push(metrics).await;
    }

    pub async fn record_job_failure(&self, error_type: &str) {
        self.push(BTreeMap::from([(
            format!("slurm_submission_failure_{error_type}"),
            1.0,
        )]))
        .await;
    }

    pub async fn record_job_duration(&self, duration_secs: f64) {
        self.push(BTreeMap::from([(
            "slurm_job_duration_seconds".to_string(),
            duration_secs,
        )]))
        .await;
    }

    pub async fn record_status_check(&self, latency_secs: f64) {
        self.push(BTreeMap::from([(
            "slurm_status_check_seconds".to_string(),
            latency_secs,
        )]))
        .await;
    }
}
