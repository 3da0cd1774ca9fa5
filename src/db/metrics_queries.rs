use sqlx::SqlitePool;

use crate::models::metric::MetricSample;

/// Maximum rows returned by a windowed query.
pub const QUERY_ROW_CAP: i64 = 10_000;

/// Insert a batch of samples sharing one source and timestamp.
pub async fn insert_samples(
    pool: &SqlitePool,
    source: &str,
    timestamp: i64,
    samples: &[(&str, f64)],
) -> Result<usize, sqlx::Error> {
    if samples.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    for (name, value) in samples {
        sqlx::query(
            "INSERT INTO metrics (source, timestamp, metric_name, metric_value) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(source)
        .bind(timestamp)
        .bind(*name)
        .bind(*value)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(samples.len())
}

/// Newest sample per `(source, metric_name)` with `timestamp > since`.
/// Ties on timestamp go to the most recently inserted row.
pub async fn latest_samples(pool: &SqlitePool, since: i64) -> Result<Vec<MetricSample>, sqlx::Error> {
    sqlx::query_as::<_, MetricSample>(
        r#"
        SELECT m.source, m.timestamp, m.metric_name, m.metric_value
        FROM metrics m
        WHERE m.timestamp > ?1
          AND m.id = (
              SELECT m2.id
              FROM metrics m2
              WHERE m2.source = m.source
                AND m2.metric_name = m.metric_name
                AND m2.timestamp > ?1
              ORDER BY m2.timestamp DESC, m2.id DESC
              LIMIT 1
          )
        ORDER BY m.source, m.metric_name
        "#,
    )
    .bind(since)
    .fetch_all(pool)
    .await
}

/// Samples newer than `since`, optionally filtered, newest first.
pub async fn query_samples(
    pool: &SqlitePool,
    since: i64,
    source: Option<&str>,
    metric_name: Option<&str>,
) -> Result<Vec<MetricSample>, sqlx::Error> {
    sqlx::query_as::<_, MetricSample>(
        r#"
        SELECT source, timestamp, metric_name, metric_value
        FROM metrics
        WHERE timestamp > ?1
          AND (?2 IS NULL OR source = ?2)
          AND (?3 IS NULL OR metric_name = ?3)
        ORDER BY timestamp DESC, id DESC
        LIMIT ?4
        "#,
    )
    .bind(since)
    .bind(source)
    .bind(metric_name)
    .bind(QUERY_ROW_CAP)
    .fetch_all(pool)
    .await
}

/// Distinct sources that reported after `since`, alphabetically.
pub async fn distinct_sources(pool: &SqlitePool, since: i64) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT source FROM metrics WHERE timestamp > ?1 ORDER BY source",
    )
    .bind(since)
    .fetch_all(pool)
    .await
}

/// Delete every sample with `timestamp < cutoff`. Returns the rows removed.
pub async fn delete_older_than(pool: &SqlitePool, cutoff: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM metrics WHERE timestamp < ?1")
        .bind(cutoff)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
