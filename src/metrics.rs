//! Metric identifiers, the metric vector, and the metric registry
//!
//! The registry is a read-only table mapping a metric id (`wt`, `cpu`, `mu`, ...)
//! to its display label and unit. It only feeds header and unit rendering;
//! no computation ever consults it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Identifier of the call-count counter. Kept apart from the metric vector.
pub const CALLS: &str = "ct";

/// Identifier of wall time, the default sort metric.
pub const WALL_TIME: &str = "wt";

/// A set of named, nonnegative cost counters.
///
/// Missing entries read as `0.0`, so vectors with different key sets can be
/// combined without special casing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricVector(BTreeMap<String, f64>);

impl MetricVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and fixtures
    pub fn with(mut self, metric: impl Into<String>, value: f64) -> Self {
        self.0.insert(metric.into(), value);
        self
    }

    /// Value of `metric`, or 0 when absent
    pub fn get(&self, metric: &str) -> f64 {
        self.0.get(metric).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, metric: &str) -> bool {
        self.0.contains_key(metric)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Element-wise `self += other`
    pub(crate) fn accumulate(&mut self, other: &MetricVector) {
        for (metric, value) in &other.0 {
            *self.0.entry(metric.clone()).or_insert(0.0) += value;
        }
    }

    pub(crate) fn set(&mut self, metric: impl Into<String>, value: f64) {
        self.0.insert(metric.into(), value);
    }
}

impl FromIterator<(String, f64)> for MetricVector {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Display metadata for one metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricInfo {
    /// Identifier as it appears in raw runs (e.g. "wt")
    pub id: String,
    /// Short label used in percentage headers (e.g. "Wall" → "IWall%")
    pub label: String,
    /// Unit suffix (e.g. "microsecs")
    pub unit: String,
    /// Long name used in value headers (e.g. "Wall Time")
    pub long_name: String,
    /// What the metric measures
    pub description: String,
}

impl MetricInfo {
    pub fn new(id: &str, label: &str, unit: &str, long_name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            unit: unit.to_string(),
            long_name: long_name.to_string(),
            description: description.to_string(),
        }
    }
}

/// Immutable lookup table of known metrics, in canonical display order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRegistry {
    entries: Vec<MetricInfo>,
}

static BUILTIN: OnceLock<MetricRegistry> = OnceLock::new();

impl MetricRegistry {
    /// Build a registry from entries. Order of `entries` is the display order.
    ///
    /// Later duplicates of an id are dropped.
    pub fn new(entries: Vec<MetricInfo>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let entries = entries
            .into_iter()
            .filter(|info| seen.insert(info.id.clone()))
            .collect();
        Self { entries }
    }

    /// The process-wide table of metrics emitted by XHProf-compatible profilers
    pub fn builtin() -> &'static MetricRegistry {
        BUILTIN.get_or_init(|| {
            Self::new(vec![
                MetricInfo::new("wt", "Wall", "microsecs", "Wall Time", "walltime"),
                MetricInfo::new("ut", "User", "microsecs", "User CPU", "user cpu time"),
                MetricInfo::new("st", "Sys", "microsecs", "Sys CPU", "system cpu time"),
                MetricInfo::new("cpu", "Cpu", "microsecs", "CPU", "cpu time"),
                MetricInfo::new("mu", "MUse", "bytes", "MemUse", "memory usage"),
                MetricInfo::new("pmu", "PMUse", "bytes", "PeakMemUse", "peak memory usage"),
                MetricInfo::new("samples", "Samples", "samples", "Samples", "cpu time"),
            ])
        })
    }

    pub fn get(&self, id: &str) -> Option<&MetricInfo> {
        self.entries.iter().find(|info| info.id == id)
    }

    pub fn entries(&self) -> &[MetricInfo] {
        &self.entries
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|info| info.id == id)
    }

    /// Order metric ids for display: registry order first, unknown ids after,
    /// alphabetically. The call counter is never part of the result.
    pub fn order<'a, I>(&self, ids: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut ids: Vec<&str> = ids.into_iter().filter(|id| *id != CALLS).collect();
        ids.sort_by_key(|id| (self.position(id).unwrap_or(usize::MAX), *id));
        ids.dedup();
        ids.into_iter().map(str::to_string).collect()
    }

    /// Registry entries for the metrics in `present`, in `present` order
    pub fn possible_metrics(&self, present: &[String]) -> Vec<MetricInfo> {
        present.iter().filter_map(|id| self.get(id).cloned()).collect()
    }

    /// Human-readable label for a header column id
    ///
    /// Column ids follow the report layout: `fn`, `ct`, `ct_perc`, `<m>`,
    /// `<m>_perc`, `excl_<m>`, `excl_<m>_perc`. Unknown metrics use the raw id.
    pub fn describe_column(&self, column: &str) -> String {
        match column {
            "fn" => return "Function Name".to_string(),
            CALLS => return "Calls".to_string(),
            "ct_perc" => return "Calls%".to_string(),
            _ => {}
        }

        let (exclusive, rest) = match column.strip_prefix("excl_") {
            Some(rest) => (true, rest),
            None => (false, column),
        };
        let (percent, metric) = match rest.strip_suffix("_perc") {
            Some(metric) => (true, metric),
            None => (false, rest),
        };

        let Some(info) = self.get(metric) else {
            return column.to_string();
        };

        let scope = if exclusive { "Excl." } else { "Incl." };
        if percent {
            format!("{}{}%", if exclusive { 'E' } else { 'I' }, info.label)
        } else {
            format!("{} {} ({})", scope, info.long_name, info.unit)
        }
    }
}
