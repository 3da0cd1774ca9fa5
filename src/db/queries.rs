use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::job::{JobFilter, JobRecord, JobStatus, JobUpdate, NewJob};
use crate::models::metric::ProcessingMetric;
use crate::models::user::{NewUser, User};

const JOB_COLUMNS: &str =
    "id, slurm_id, status, r2_key, created_at, updated_at, results_url, user_id";

fn job_from_row(r: &SqliteRow) -> Result<JobRecord, sqlx::Error> {
    let id: String = r.try_get("id")?;
    let status: String = r.try_get("status")?;

    Ok(JobRecord {
        id: Uuid::parse_str(&id).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        slurm_id: r.try_get("slurm_id")?,
        status: JobStatus::from_str(&status).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        r2_key: r.try_get("r2_key")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
        results_url: r.try_get("results_url")?,
        user_id: r.try_get("user_id")?,
    })
}

/// Insert a new job. `created_at` and `updated_at` are both set to `now`.
pub async fn create_job(
    pool: &SqlitePool,
    id: Uuid,
    job: &NewJob,
    now: i64,
) -> Result<JobRecord, sqlx::Error> {
    let status = job.status.unwrap_or(JobStatus::Submitted);

    let row = sqlx::query(&format!(
        r#"
        INSERT INTO jobs (id, slurm_id, status, r2_key, created_at, updated_at, results_url, user_id)
        VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?6, ?7)
        RETURNING {JOB_COLUMNS}
        "#
    ))
    .bind(id.to_string())
    .bind(job.slurm_id.as_deref().filter(|s| !s.is_empty()))
    .bind(status.as_stored())
    .bind(&job.r2_key)
    .bind(now)
    .bind(job.results_url.as_deref().filter(|s| !s.is_empty()))
    .bind(job.user_id.as_deref().filter(|s| !s.is_empty()))
    .fetch_one(pool)
    .await?;

    job_from_row(&row)
}

/// Get a job by ID
pub async fn get_job(pool: &SqlitePool, job_id: Uuid) -> Result<Option<JobRecord>, sqlx::Error> {
    let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"))
        .bind(job_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(job_from_row).transpose()
}

/// List jobs, newest first.
pub async fn list_jobs(pool: &SqlitePool, filter: &JobFilter) -> Result<Vec<JobRecord>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {JOB_COLUMNS}
        FROM jobs
        WHERE (?1 IS NULL OR status = ?1)
          AND (?2 IS NULL OR user_id = ?2)
        ORDER BY created_at DESC, rowid DESC
        LIMIT ?3
        "#
    ))
    .bind(filter.status.map(|s| s.as_stored()))
    .bind(filter.user_id.as_deref())
    .bind(filter.limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(job_from_row).collect()
}

/// Apply a partial update and return the resulting row, or `None` if the job
/// does not exist. `updated_at` never moves backwards.
pub async fn update_job(
    pool: &SqlitePool,
    job_id: Uuid,
    update: &JobUpdate,
    now: i64,
) -> Result<Option<JobRecord>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        UPDATE jobs
        SET updated_at = MAX(updated_at, ?1),
            status = COALESCE(?2, status),
            slurm_id = CASE WHEN ?3 IS NULL THEN slurm_id ELSE NULLIF(?3, '') END,
            results_url = CASE WHEN ?4 IS NULL THEN results_url ELSE NULLIF(?4, '') END
        WHERE id = ?5
        RETURNING {JOB_COLUMNS}
        "#
    ))
    .bind(now)
    .bind(update.status.map(|s| s.as_stored()))
    .bind(update.slurm_id.as_deref())
    .bind(update.results_url.as_deref())
    .bind(job_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(job_from_row).transpose()
}

/// Delete a job. Returns the number of rows removed (0 or 1).
pub async fn delete_job(pool: &SqlitePool, job_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM jobs WHERE id = ?1")
        .bind(job_id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Whether a job with the given (textual) id exists.
pub async fn job_exists(pool: &SqlitePool, job_id: &str) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT 1 FROM jobs WHERE id = ?1")
        .bind(job_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.is_some())
}

fn user_from_row(r: &SqliteRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: r.try_get("id")?,
        email: r.try_get("email")?,
        name: r.try_get("name")?,
        organization: r.try_get("organization")?,
        created_at: r.try_get("created_at")?,
        is_active: r.try_get("is_active")?,
    })
}

/// Insert a new user
pub async fn create_user(pool: &SqlitePool, user: &NewUser, now: i64) -> Result<User, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO users (id, email, name, organization, created_at, is_active)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        RETURNING id, email, name, organization, created_at, is_active
        "#,
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(user.name.as_deref())
    .bind(user.organization.as_deref())
    .bind(now)
    .bind(user.is_active.unwrap_or(true))
    .fetch_one(pool)
    .await?;

    user_from_row(&row)
}

/// Get a user by ID
pub async fn get_user(pool: &SqlitePool, user_id: &str) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT id, email, name, organization, created_at, is_active FROM users WHERE id = ?1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Insert a processing metric for an existing job
pub async fn create_processing_metric(
    pool: &SqlitePool,
    metric: &ProcessingMetric,
) -> Result<ProcessingMetric, sqlx::Error> {
    sqlx::query_as::<_, ProcessingMetric>(
        r#"
        INSERT INTO processing_metrics
            (id, job_id, processing_time_seconds, pdf_pages, pdf_size_bytes, success, error_message, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        RETURNING id, job_id, processing_time_seconds, pdf_pages, pdf_size_bytes, success, error_message, created_at
        "#,
    )
    .bind(&metric.id)
    .bind(&metric.job_id)
    .bind(metric.processing_time_seconds)
    .bind(metric.pdf_pages)
    .bind(metric.pdf_size_bytes)
    .bind(metric.success)
    .bind(metric.error_message.as_deref())
    .bind(metric.created_at)
    .fetch_one(pool)
    .await
}
