use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;

use super::error::ApiError;
use crate::app_state::MetricsStoreState;
use crate::db::{metrics_queries, unix_now};
use crate::models::metric::{
    parse_window, IngestPayload, IngestResponse, MetricSample, MetricsQuery, DEFAULT_WINDOW_SECS,
};
use crate::services::exposition;

/// POST /ingest
pub async fn ingest(
    State(state): State<MetricsStoreState>,
    body: Bytes,
) -> Result<Json<IngestResponse>, ApiError> {
    let payload = IngestPayload::parse(&body).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let (numeric, skipped) = payload.partition();
    for (name, value) in skipped {
        tracing::warn!(
            source = %payload.source,
            metric = name,
            value = %value,
            "Skipping non-numeric metric value"
        );
    }

    let inserted =
        metrics_queries::insert_samples(&state.db, &payload.source, payload.timestamp, &numeric)
            .await?;

    tracing::debug!(source = %payload.source, inserted, "Metrics ingested");
    Ok(Json(IngestResponse {
        status: "ok".to_string(),
        inserted,
    }))
}

/// GET /metrics: newest sample per source and metric, as Prometheus text.
pub async fn export(State(state): State<MetricsStoreState>) -> Result<impl IntoResponse, ApiError> {
    let since = unix_now() - exposition::EXPORT_WINDOW_SECS;
    let samples = metrics_queries::latest_samples(&state.db, since).await?;

    Ok((
        [(header::CONTENT_TYPE, exposition::CONTENT_TYPE)],
        exposition::render(&samples),
    ))
}

/// GET /api/metrics?source=&window=&metric=
pub async fn query(
    State(state): State<MetricsStoreState>,
    Query(params): Query<MetricsQuery>,
) -> Result<Json<Vec<MetricSample>>, ApiError> {
    let window = params
        .window
        .as_deref()
        .map(parse_window)
        .unwrap_or(DEFAULT_WINDOW_SECS);
    let since = unix_now() - window;

    let samples = metrics_queries::query_samples(
        &state.db,
        since,
        params.source.as_deref().filter(|s| !s.is_empty()),
        params.metric.as_deref().filter(|s| !s.is_empty()),
    )
    .await?;

    Ok(Json(samples))
}

/// GET /api/sources: sources seen in the last hour.
pub async fn sources(State(state): State<MetricsStoreState>) -> Result<Json<Vec<String>>, ApiError> {
    let since = unix_now() - DEFAULT_WINDOW_SECS;
    Ok(Json(metrics_queries::distinct_sources(&state.db, since).await?))
}
