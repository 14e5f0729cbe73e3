//! JSON output format for reports
//!
//! `--format json`: the report header, positional rows, totals and anomalies in
//! one document. Undefined percent deltas serialize as `null`.

use crate::anomaly::Anomaly;
use crate::metrics::{MetricInfo, MetricRegistry};
use crate::report::{Cell, Column, Length, Report, Summary};
use crate::run::RunId;
use crate::sort::SortKey;
use serde::Serialize;

/// Root JSON document for `desglose RUN [RUN2]`
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport<'a> {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    /// "flat" or "diff"
    pub mode: &'static str,
    pub runs: &'a [RunId],
    pub sort: &'a SortKey,
    pub length: Length,
    pub metrics: &'a [String],
    pub possible_metrics: &'a [MetricInfo],
    pub summary: &'a Summary,
    pub header: &'a [Column],
    /// Rows aligned with `header`
    pub rows: Vec<Vec<Cell>>,
    #[serde(skip_serializing_if = "no_anomalies")]
    pub anomalies: &'a [Anomaly],
}

impl<'a> JsonReport<'a> {
    pub fn new(report: &'a Report) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "desglose-json-v1".to_string(),
            mode: if report.is_diff() { "diff" } else { "flat" },
            runs: report.runs(),
            sort: report.sort_key(),
            length: report.length(),
            metrics: report.get_metrics(),
            possible_metrics: report.get_possible_metrics(),
            summary: report.get_summary(),
            header: report.header(),
            rows: report.symbols(),
            anomalies: report.anomalies(),
        }
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn no_anomalies(anomalies: &&[Anomaly]) -> bool {
    anomalies.is_empty()
}

/// Root JSON document for `--summary`
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary<'a> {
    pub version: String,
    pub format: String,
    pub runs: &'a [RunId],
    pub summary: &'a Summary,
    /// Registry entries for the metrics in `summary`
    pub possible_metrics: Vec<MetricInfo>,
}

impl<'a> JsonSummary<'a> {
    pub fn new(runs: &'a [RunId], summary: &'a Summary, registry: &MetricRegistry) -> Self {
        let totals = match summary {
            Summary::Single(totals) => totals,
            Summary::Diff(diff) => &diff.candidate,
        };
        let mut ids: Vec<&str> = totals.metrics.ids().collect();
        if let Summary::Diff(diff) = summary {
            ids.extend(diff.baseline.metrics.ids());
        }
        let present = registry.order(ids);
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "desglose-summary-v1".to_string(),
            runs,
            summary,
            possible_metrics: registry.possible_metrics(&present),
        }
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
