//! Recoverable data anomalies
//!
//! Profiling data is already captured and sometimes imperfect. Nothing here
//! aborts a report: each condition is repaired in place (defaulted, clamped,
//! or replaced by a fallback) and recorded so consumers can see what happened.

use serde::Serialize;
use thiserror::Error;

/// A condition that was repaired while building a report
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// Edge key could not be split into caller and callee
    #[error("Malformed edge key {key:?}: treated as a root call of {callee:?}")]
    MalformedEdge { key: String, callee: String },

    /// Edge lacks metrics that other edges of the same run carry
    #[error("Edge {edge} is missing {}: defaulted to 0", .metrics.join(", "))]
    MissingMetric { edge: String, metrics: Vec<String> },

    /// Metric value is not a finite, nonnegative number
    #[error("Edge {edge} has an invalid value for {metric}: defaulted to 0")]
    InvalidMetric { edge: String, metric: String },

    /// Requested sort key is not available for this run
    #[error("Unknown sort metric {requested:?}: falling back to {fallback:?}")]
    UnknownSortMetric { requested: String, fallback: String },

    /// Exclusive cost came out negative (recursive or inconsistent data)
    #[error("Negative exclusive {metric} ({value}) for {symbol}: clamped to 0")]
    NegativeExclusive {
        symbol: String,
        metric: String,
        value: f64,
    },
}

impl Anomaly {
    /// Emit the anomaly as a warning and hand it back for collection
    pub(crate) fn logged(self) -> Self {
        tracing::warn!("{}", self);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_metric_message_lists_metrics() {
        let anomaly = Anomaly::MissingMetric {
            edge: "main()==>foo".to_string(),
            metrics: vec!["cpu".to_string(), "mu".to_string()],
        };
        assert_eq!(
            anomaly.to_string(),
            "Edge main()==>foo is missing cpu, mu: defaulted to 0"
        );
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let anomaly = Anomaly::UnknownSortMetric {
            requested: "bogus".to_string(),
            fallback: "wt".to_string(),
        };
        let json = serde_json::to_value(&anomaly).unwrap();
        assert_eq!(json["kind"], "unknown_sort_metric");
        assert_eq!(json["requested"], "bogus");
        assert_eq!(json["fallback"], "wt");
    }
}
