//! Prometheus text exposition for samples held in the metrics store.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::models::metric::MetricSample;

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Samples newer than this many seconds are exported.
pub const EXPORT_WINDOW_SECS: i64 = 600;

/// Render the latest samples as gauges, one family per metric name and one
/// line per source.
pub fn render(samples: &[MetricSample]) -> String {
    let mut families: BTreeMap<&str, Vec<&MetricSample>> = BTreeMap::new();
    for sample in samples {
        families
            .entry(sample.metric_name.as_str())
            .or_default()
            .push(sample);
    }

    let mut out = String::new();
    for (name, rows) in families {
        let mut sources: Vec<&str> = Vec::with_capacity(rows.len());
        for row in &rows {
            if !sources.contains(&row.source.as_str()) {
                sources.push(row.source.as_str());
            }
        }

        let _ = writeln!(out, "# HELP {name} Metric from {}", sources.join(", "));
        let _ = writeln!(out, "# TYPE {name} gauge");
        for row in rows {
            let _ = writeln!(
                out,
                "{name}{{source=\"{}\"}} {} {}",
                escape_label(&row.source),
                row.metric_value,
                row.timestamp.saturating_mul(1000)
            );
        }
    }
    out
}

fn escape_label(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}
