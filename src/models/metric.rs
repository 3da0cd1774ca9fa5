use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One stored metric observation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct MetricSample {
    pub source: String,
    pub timestamp: i64,
    pub metric_name: String,
    pub metric_value: f64,
}

/// A validated `POST /ingest` body.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestPayload {
    pub source: String,
    pub timestamp: i64,
    pub metrics: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawIngest {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    metrics: Option<Value>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum IngestError {
    #[error("Invalid JSON payload")]
    InvalidJson,

    #[error("Invalid payload: missing source, timestamp, or metrics")]
    MissingFields,

    #[error("Invalid payload: metrics must be an object")]
    MetricsNotObject,
}

impl IngestPayload {
    pub fn parse(body: &[u8]) -> Result<Self, IngestError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| IngestError::InvalidJson)?;
        let raw: RawIngest =
            serde_json::from_value(value).map_err(|_| IngestError::MissingFields)?;

        let source = raw.source.filter(|s| !s.is_empty());
        let timestamp = raw.timestamp.filter(|t| *t != 0);
        let (Some(source), Some(timestamp), Some(metrics)) = (source, timestamp, raw.metrics) else {
            return Err(IngestError::MissingFields);
        };

        match metrics {
            Value::Object(metrics) => Ok(Self {
                source,
                timestamp,
                metrics,
            }),
            Value::Null => Err(IngestError::MissingFields),
            _ => Err(IngestError::MetricsNotObject),
        }
    }

    /// Split metrics into numeric samples and the names of skipped entries.
    pub fn partition(&self) -> (Vec<(&str, f64)>, Vec<(&str, &Value)>) {
        let mut numeric = Vec::with_capacity(self.metrics.len());
        let mut skipped = Vec::new();
        for (name, value) in &self.metrics {
            match value.as_f64() {
                Some(v) => numeric.push((name.as_str(), v)),
                None => skipped.push((name.as_str(), value)),
            }
        }
        (numeric, skipped)
    }
}

/// Response of `POST /ingest`.
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub status: String,
    pub inserted: usize,
}

/// Query of `GET /api/metrics`.
#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    pub source: Option<String>,
    pub window: Option<String>,
    pub metric: Option<String>,
}

pub const DEFAULT_WINDOW_SECS: i64 = 3600;

/// Parse a `<integer><unit>` window (`s`, `m`, `h`, `d`) into seconds.
/// Anything else is treated as one hour.
pub fn parse_window(window: &str) -> i64 {
    let Some(unit) = window.chars().last() else {
        return DEFAULT_WINDOW_SECS;
    };
    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        'd' => 86_400,
        _ => return DEFAULT_WINDOW_SECS,
    };
    let digits = &window[..window.len() - 1];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return DEFAULT_WINDOW_SECS;
    }
    digits
        .parse::<i64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .unwrap_or(DEFAULT_WINDOW_SECS)
}

/// A per-job processing record kept by the job store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct ProcessingMetric {
    pub id: String,
    pub job_id: String,
    pub processing_time_seconds: Option<f64>,
    pub pdf_pages: Option<i64>,
    pub pdf_size_bytes: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
    pub created_at: i64,
}

/// Body of the job store's `POST /metrics`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProcessingMetric {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub processing_time_seconds: Option<f64>,
    #[serde(default)]
    pub pdf_pages: Option<i64>,
    #[serde(default)]
    pub pdf_size_bytes: Option<i64>,
    #[serde(default, deserialize_with = "super::flag::deserialize")]
    pub success: Option<bool>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_units() {
        assert_eq!(parse_window("30s"), 30);
        assert_eq!(parse_window("15m"), 900);
        assert_eq!(parse_window("2h"), 7200);
        assert_eq!(parse_window("7d"), 604_800);
    }

    #[test]
    fn unparseable_window_falls_back_to_one_hour() {
        for w in ["", "h", "1w", "1.5h", "-1h", "abc", "10 m", "99999999999999999999d"] {
            assert_eq!(parse_window(w), DEFAULT_WINDOW_SECS, "window {w:?}");
        }
    }

    #[test]
    fn ingest_skips_non_numeric_values() {
        let payload = IngestPayload::parse(
            br#"{"source":"x","timestamp":1000,"metrics":{"a":1,"b":"oops","c":2.5,"d":null}}"#,
        )
        .unwrap();
        let (numeric, skipped) = payload.partition();
        assert_eq!(numeric, vec![("a", 1.0), ("c", 2.5)]);
        let names: Vec<_> = skipped.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["b", "d"]);
    }

    #[test]
    fn ingest_rejects_bad_payloads() {
        assert_eq!(IngestPayload::parse(b"{nope").unwrap_err(), IngestError::InvalidJson);
        assert_eq!(
            IngestPayload::parse(br#"{"timestamp":1,"metrics":{}}"#).unwrap_err(),
            IngestError::MissingFields
        );
        assert_eq!(
            IngestPayload::parse(br#"{"source":"x","timestamp":0,"metrics":{}}"#).unwrap_err(),
            IngestError::MissingFields
        );
        assert_eq!(
            IngestPayload::parse(br#"{"source":"x","timestamp":1,"metrics":[1]}"#).unwrap_err(),
            IngestError::MetricsNotObject
        );
    }
}
