//! Sort keys for report rows
//!
//! Accepted keys mirror the report columns: `fn` (name, ascending), `ct`
//! (calls), a metric id (inclusive value) or `excl_<metric>` (exclusive value).
//! Every ordering falls back to name ascending, so row order is total.

use crate::anomaly::Anomaly;
use crate::metrics::CALLS;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Symbol name ascending
    Name,
    /// Call count
    Calls,
    /// Inclusive value of a metric
    Inclusive(String),
    /// Exclusive value of a metric
    Exclusive(String),
}

impl SortKey {
    /// Syntactic parse; availability is checked by [`SortKey::resolve`]
    pub fn parse(key: &str) -> Self {
        match key {
            "fn" => Self::Name,
            CALLS => Self::Calls,
            _ => match key.strip_prefix("excl_") {
                Some(metric) => Self::Exclusive(metric.to_string()),
                None => Self::Inclusive(key.to_string()),
            },
        }
    }

    /// The metric this key reads, if any
    pub fn metric(&self) -> Option<&str> {
        match self {
            Self::Inclusive(metric) | Self::Exclusive(metric) => Some(metric),
            Self::Name | Self::Calls => None,
        }
    }

    /// Whether the key can be evaluated against a run carrying `metrics`
    pub fn is_available(&self, metrics: &[String]) -> bool {
        match self.metric() {
            Some(metric) => metrics.iter().any(|m| m == metric),
            None => true,
        }
    }

    /// Validate `requested` against the metrics present in the data
    ///
    /// An unavailable key is replaced by `fallback` when that is available,
    /// then by wall time, then by the first present metric, and finally by the
    /// call count. The replacement is reported as an anomaly.
    pub fn resolve(requested: &str, metrics: &[String], fallback: &str) -> (Self, Option<Anomaly>) {
        let key = Self::parse(requested);
        if key.is_available(metrics) {
            return (key, None);
        }

        let replacement = [fallback, crate::metrics::WALL_TIME]
            .into_iter()
            .map(Self::parse)
            .find(|candidate| candidate.is_available(metrics))
            .or_else(|| metrics.first().cloned().map(Self::Inclusive))
            .unwrap_or(Self::Calls);

        let anomaly = Anomaly::UnknownSortMetric {
            requested: requested.to_string(),
            fallback: replacement.to_string(),
        }
        .logged();
        (replacement, Some(anomaly))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => f.write_str("fn"),
            Self::Calls => f.write_str(CALLS),
            Self::Inclusive(metric) => f.write_str(metric),
            Self::Exclusive(metric) => write!(f, "excl_{}", metric),
        }
    }
}

impl Serialize for SortKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Descending by value, then ascending by name
pub(crate) fn by_value_then_name(a: (f64, &str), b: (f64, &str)) -> Ordering {
    b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1))
}
