use chrono::{DateTime, TimeZone, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Status of a PDF processing job.
///
/// Serialized capitalized (`"Running"`) on the public API and stored as
/// lowercase text (`"running"`) by the job store. Parsing accepts either.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum JobStatus {
    #[serde(alias = "submitted")]
    Submitted,
    #[serde(alias = "running")]
    Running,
    #[serde(alias = "completed")]
    Completed,
    #[serde(alias = "failed")]
    Failed,
}

impl JobStatus {
    /// Lowercase storage form.
    pub fn as_stored(&self) -> String {
        self.to_string()
    }
}

/// Serde adapter for the lowercase storage representation of [`JobStatus`].
pub mod stored_status {
    use std::str::FromStr;

    use serde::{Deserialize, Deserializer, Serializer};

    use super::JobStatus;

    pub fn serialize<S: Serializer>(status: &JobStatus, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(status)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<JobStatus, D::Error> {
        let raw = String::deserialize(d)?;
        JobStatus::from_str(&raw)
            .map_err(|_| serde::de::Error::custom(format!("unknown job status `{raw}`")))
    }

    pub mod option {
        use std::str::FromStr;

        use serde::{Deserialize, Deserializer, Serializer};

        use super::JobStatus;

        pub fn serialize<S: Serializer>(status: &Option<JobStatus>, s: S) -> Result<S::Ok, S::Error> {
            match status {
                Some(status) => s.collect_str(status),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<JobStatus>, D::Error> {
            match Option::<String>::deserialize(d)? {
                Some(raw) => JobStatus::from_str(&raw).map(Some).map_err(|_| {
                    serde::de::Error::custom(format!("unknown job status `{raw}`"))
                }),
                None => Ok(None),
            }
        }
    }
}

/// A job row as persisted by the job store (snake_case, unix seconds).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRecord {
    pub id: Uuid,
    #[serde(default)]
    pub slurm_id: Option<String>,
    #[serde(with = "stored_status")]
    pub status: JobStatus,
    pub r2_key: String,
    #[serde(default = "now_secs")]
    pub created_at: i64,
    #[serde(default = "now_secs")]
    pub updated_at: i64,
    #[serde(default)]
    pub results_url: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// A job as exposed to the frontend (camelCase, ISO-8601 timestamps).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub external_scheduler_id: Option<String>,
    pub status: JobStatus,
    pub source_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub results_url: Option<String>,
    pub user_id: Option<String>,
    pub error: Option<String>,
}

impl From<JobRecord> for Job {
    fn from(record: JobRecord) -> Self {
        Self {
            id: record.id,
            external_scheduler_id: record.slurm_id,
            status: record.status,
            source_key: record.r2_key,
            created_at: unix_to_utc(record.created_at),
            updated_at: unix_to_utc(record.updated_at),
            results_url: record.results_url,
            user_id: record.user_id,
            error: None,
        }
    }
}

fn now_secs() -> i64 {
    Utc::now().timestamp()
}

fn unix_to_utc(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Body of `POST /jobs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewJob {
    #[serde(default)]
    #[garde(length(min = 1, max = 64))]
    pub id: String,

    #[serde(default)]
    #[garde(length(min = 1, max = 1024))]
    pub r2_key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub slurm_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub user_id: Option<String>,

    #[serde(default, with = "stored_status::option", skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub status: Option<JobStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub results_url: Option<String>,
}

/// Body of `PUT /jobs/{id}`. Absent fields keep their stored value; an empty
/// string clears `slurm_id` / `results_url`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobUpdate {
    #[serde(default, with = "stored_status::option", skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slurm_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_url: Option<String>,
}

/// Filters for listing jobs.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub user_id: Option<String>,
    pub limit: i64,
}

pub const DEFAULT_LIST_LIMIT: i64 = 100;
pub const MAX_LIST_LIMIT: i64 = 1000;

/// Clamp a raw `limit` query value into `[1, MAX_LIST_LIMIT]`. Anything that
/// is not an integer falls back to [`DEFAULT_LIST_LIMIT`].
pub fn clamp_limit(raw: Option<&str>) -> i64 {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => DEFAULT_LIST_LIMIT,
        Some(s) => match s.parse::<i64>() {
            Ok(n) => n.clamp(1, MAX_LIST_LIMIT),
            Err(_) => DEFAULT_LIST_LIMIT,
        },
    }
}
