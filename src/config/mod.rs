use std::path::{Path, PathBuf};

use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "appsettings.json";

/// Process-wide configuration, resolved once at startup.
///
/// Every value is taken from the first of: environment variable, the JSON
/// settings file, a built-in default.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server bind address. Each binary supplies its own default.
    pub bind_addr: Option<String>,

    /// SQLite URL backing the job store
    pub jobs_database_url: String,

    /// Bearer token the job store expects from callers
    pub db_auth_token: String,

    /// CORS origin advertised by the job store
    pub allowed_origin: String,

    /// Base URL of the job store, as seen by its clients
    pub db_api_url: String,

    /// Bearer token clients present to the job store
    pub db_api_token: String,

    /// SQLite URL backing the metrics store
    pub metrics_database_url: String,

    /// Bearer token the metrics store expects on ingest
    pub metrics_auth_token: String,

    /// Age in days after which metric samples are pruned
    pub metrics_retention_days: i64,

    /// Cron expression (UTC) for the retention sweep
    pub metrics_prune_schedule: String,

    /// Ingest URL the push client posts to
    pub metrics_endpoint: String,

    /// Token for the push client; pushing is disabled when empty
    pub metrics_token: String,

    /// `source` tag attached to pushed metrics
    pub metrics_source: String,

    /// Origins allowed to call the job status API from a browser
    pub cors_allowed_origins: Vec<String>,

    /// Redis connection string for the upload queue
    pub redis_url: String,

    /// R2 object storage settings, when fully configured
    pub r2: Option<R2Settings>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct R2Settings {
    pub bucket: String,
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Debug, Default, Deserialize)]
struct EnvConfig {
    app_config_file: Option<String>,
    bind_addr: Option<String>,
    jobs_database_url: Option<String>,
    db_auth_token: Option<String>,
    allowed_origin: Option<String>,
    db_api_url: Option<String>,
    db_api_token: Option<String>,
    metrics_database_url: Option<String>,
    metrics_auth_token: Option<String>,
    metrics_retention_days: Option<i64>,
    metrics_prune_schedule: Option<String>,
    metrics_endpoint: Option<String>,
    metrics_token: Option<String>,
    metrics_source: Option<String>,
    cors_allowed_origins: Option<String>,
    redis_url: Option<String>,
    r2_bucket: Option<String>,
    r2_endpoint: Option<String>,
    r2_access_key: Option<String>,
    r2_secret_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    bind_addr: Option<String>,
    job_store: JobStoreSection,
    metrics: MetricsSection,
    cors: CorsSection,
    queue: QueueSection,
    storage: StorageSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JobStoreSection {
    database_url: Option<String>,
    auth_token: Option<String>,
    allowed_origin: Option<String>,
    base_url: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetricsSection {
    database_url: Option<String>,
    auth_token: Option<String>,
    retention_days: Option<i64>,
    prune_schedule: Option<String>,
    endpoint: Option<String>,
    token: Option<String>,
    source: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CorsSection {
    allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QueueSection {
    redis_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StorageSection {
    bucket: Option<String>,
    endpoint: Option<String>,
    access_key: Option<String>,
    secret_key: Option<String>,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::ReadFile {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| ConfigError::ParseFile {
                path: path.to_path_buf(),
                source,
            })
    }
}

fn pick<T>(env: Option<T>, file: Option<T>, default: impl FnOnce() -> T) -> T {
    env.or(file).unwrap_or_else(default)
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let env: EnvConfig = envy::from_env()?;
        let path = PathBuf::from(
            env.app_config_file
                .clone()
                .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string()),
        );
        let file = FileConfig::load(&path)?.unwrap_or_default();
        Ok(Self::resolve(env, file))
    }

    fn resolve(env: EnvConfig, file: FileConfig) -> Self {
        let FileConfig {
            bind_addr,
            job_store,
            metrics,
            cors,
            queue,
            storage,
        } = file;

        let r2 = match (
            env.r2_bucket.or(storage.bucket),
            env.r2_endpoint.or(storage.endpoint),
            env.r2_access_key.or(storage.access_key),
            env.r2_secret_key.or(storage.secret_key),
        ) {
            (Some(bucket), Some(endpoint), Some(access_key), Some(secret_key)) => Some(R2Settings {
                bucket,
                endpoint,
                access_key,
                secret_key,
            }),
            _ => None,
        };

        Self {
            bind_addr: env.bind_addr.or(bind_addr),
            jobs_database_url: pick(env.jobs_database_url, job_store.database_url, || {
                "sqlite://jobs.db".to_string()
            }),
            db_auth_token: pick(env.db_auth_token, job_store.auth_token, String::new),
            allowed_origin: pick(env.allowed_origin, job_store.allowed_origin, || "*".to_string()),
            db_api_url: pick(env.db_api_url, job_store.base_url, || {
                "http://localhost:8787".to_string()
            }),
            db_api_token: pick(env.db_api_token, job_store.token, String::new),
            metrics_database_url: pick(env.metrics_database_url, metrics.database_url, || {
                "sqlite://metrics.db".to_string()
            }),
            metrics_auth_token: pick(env.metrics_auth_token, metrics.auth_token, String::new),
            metrics_retention_days: pick(env.metrics_retention_days, metrics.retention_days, || 7),
            metrics_prune_schedule: pick(env.metrics_prune_schedule, metrics.prune_schedule, || {
                "0 0 3 * * *".to_string()
            }),
            metrics_endpoint: pick(env.metrics_endpoint, metrics.endpoint, || {
                "http://localhost:8788/ingest".to_string()
            }),
            metrics_token: pick(env.metrics_token, metrics.token, String::new),
            metrics_source: pick(env.metrics_source, metrics.source, || "job-proxy".to_string()),
            cors_allowed_origins: pick(
                env.cors_allowed_origins.as_deref().map(split_origins),
                cors.allowed_origins,
                || {
                    vec![
                        "http://localhost:5173".to_string(),
                        "http://127.0.0.1:5173".to_string(),
                    ]
                },
            ),
            redis_url: pick(env.redis_url, queue.redis_url, || {
                "redis://127.0.0.1:6379".to_string()
            }),
            r2,
        }
    }

    pub fn bind_addr_or(&self, default: &str) -> String {
        self.bind_addr.clone().unwrap_or_else(|| default.to_string())
    }

    pub fn r2_settings(&self) -> Result<&R2Settings, ConfigError> {
        self.r2
            .as_ref()
            .ok_or(ConfigError::Missing("R2_BUCKET, R2_ENDPOINT, R2_ACCESS_KEY, R2_SECRET_KEY"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment configuration: {0}")]
    Env(#[from] envy::Error),

    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing required configuration: {0}")]
    Missing(&'static str),
}
