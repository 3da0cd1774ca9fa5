//! Scheduled pruning of old metric samples.

use std::str::FromStr;

use chrono::Utc;
use cron::Schedule;
use sqlx::SqlitePool;

use crate::db::{metrics_queries, unix_now};

const SECONDS_PER_DAY: i64 = 86_400;

/// Cutoff timestamp for a retention window ending at `now`.
pub fn cutoff(now: i64, retention_days: i64) -> i64 {
    now - retention_days.saturating_mul(SECONDS_PER_DAY)
}

/// Delete samples older than `retention_days`.
pub async fn prune_older_than(pool: &SqlitePool, retention_days: i64) -> Result<u64, sqlx::Error> {
    let cutoff = cutoff(unix_now(), retention_days);
    tracing::info!(retention_days, cutoff, "Pruning metrics older than retention window");
    metrics_queries::delete_older_than(pool, cutoff).await
}

/// Run one sweep, logging the outcome. Failures are left for the next run.
pub async fn run_sweep(pool: &SqlitePool, retention_days: i64) -> u64 {
    match prune_older_than(pool, retention_days).await {
        Ok(deleted) => {
            tracing::info!(deleted, "Metrics retention sweep completed");
            deleted
        }
        Err(e) => {
            tracing::error!(error = %e, "Metrics retention sweep failed");
            0
        }
    }
}

/// Accepts standard 5-field cron expressions as well as the 6/7-field form
/// the `cron` crate expects.
pub fn parse_schedule(expr: &str) -> Result<Schedule, cron::error::Error> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    let normalized = fields.join(" ");
    if fields.len() == 5 {
        Schedule::from_str(&format!("0 {normalized}"))
    } else {
        Schedule::from_str(&normalized)
    }
}

/// Sleep until each upcoming occurrence of `schedule` (UTC) and sweep.
pub async fn run_scheduled(pool: SqlitePool, schedule: Schedule, retention_days: i64) {
    loop {
        let Some(next) = schedule.upcoming(Utc).next() else {
            tracing::warn!("Retention schedule has no future occurrences; stopping");
            return;
        };
        let wait = (next - Utc::now()).to_std().unwrap_or_default();
        tracing::debug!(next_run = %next, "Next metrics retention sweep scheduled");
        tokio::time::sleep(wait).await;

        run_sweep(&pool, retention_days).await;
    }
}
