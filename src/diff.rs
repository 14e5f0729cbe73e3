//! Two-run comparison
//!
//! Wraps a baseline and a candidate [`Parser`] and reports, per metric, the
//! absolute delta (`candidate − baseline`) and the percent delta
//! (`(candidate / baseline − 1) × 100`).
//!
//! A percent delta against a zero baseline has no meaningful value and is
//! reported as [`PercentDelta::Undefined`]; callers have to branch on it.

use crate::anomaly::Anomaly;
use crate::metrics::{MetricVector, CALLS};
use crate::parser::{empty_symbol, Parser, SymbolMetrics, Totals};
use crate::run::Run;
use crate::sort::{by_value_then_name, SortKey};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

/// Relative change between two values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PercentDelta {
    Defined(f64),
    /// Baseline is zero while the candidate is not
    Undefined,
}

impl PercentDelta {
    pub fn between(baseline: f64, candidate: f64) -> Self {
        if baseline == 0.0 {
            return if candidate == 0.0 {
                Self::Defined(0.0)
            } else {
                Self::Undefined
            };
        }
        let percent = (candidate / baseline - 1.0) * 100.0;
        if percent.is_finite() {
            Self::Defined(percent)
        } else {
            Self::Undefined
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Self::Defined(percent) => Some(percent),
            Self::Undefined => None,
        }
    }

    pub fn is_undefined(self) -> bool {
        matches!(self, Self::Undefined)
    }
}

/// Serialized as a number, or `null` when undefined
impl Serialize for PercentDelta {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Defined(percent) => serializer.serialize_some(percent),
            Self::Undefined => serializer.serialize_none(),
        }
    }
}

/// One compared value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiffValue {
    pub baseline: f64,
    pub candidate: f64,
    pub delta: f64,
    pub percent: PercentDelta,
}

impl DiffValue {
    pub fn new(baseline: f64, candidate: f64) -> Self {
        Self {
            baseline,
            candidate,
            delta: candidate - baseline,
            percent: PercentDelta::between(baseline, candidate),
        }
    }
}

/// Totals of both runs and their per-metric differences
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffTotals {
    pub baseline: Totals,
    pub candidate: Totals,
    /// Compared totals keyed by metric id, plus `ct` for calls
    pub metrics: BTreeMap<String, DiffValue>,
}

impl DiffTotals {
    /// Absolute delta for `metric`, 0 when neither run carries it
    pub fn delta(&self, metric: &str) -> f64 {
        self.metrics.get(metric).map_or(0.0, |diff| diff.delta)
    }

    /// Percent delta for `metric`
    pub fn percent(&self, metric: &str) -> PercentDelta {
        self.metrics
            .get(metric)
            .map_or(PercentDelta::Defined(0.0), |diff| diff.percent)
    }
}

/// Compared metrics of one symbol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolDiff {
    pub name: String,
    pub calls: DiffValue,
    pub inclusive: BTreeMap<String, DiffValue>,
    pub exclusive: BTreeMap<String, DiffValue>,
}

#[derive(Debug, Clone)]
pub struct DiffParser {
    baseline: Parser,
    candidate: Parser,
    metrics: Vec<String>,
}

impl DiffParser {
    pub fn new(baseline: &Run, candidate: &Run) -> Self {
        Self::from_parsers(Parser::new(baseline), Parser::new(candidate))
    }

    pub fn from_parsers(baseline: Parser, candidate: Parser) -> Self {
        let metrics: BTreeSet<&str> = baseline
            .metrics()
            .iter()
            .chain(candidate.metrics())
            .map(String::as_str)
            .collect();
        let metrics = metrics.into_iter().map(str::to_string).collect();
        Self {
            baseline,
            candidate,
            metrics,
        }
    }

    pub fn baseline(&self) -> &Parser {
        &self.baseline
    }

    pub fn candidate(&self) -> &Parser {
        &self.candidate
    }

    /// Metric ids present in either run, alphabetical
    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    pub fn diff_totals(&self) -> DiffTotals {
        diff_totals(self.baseline.totals(), self.candidate.totals(), &self.metrics)
    }

    /// Per-symbol diffs over the union of both runs' symbols
    ///
    /// A symbol missing from one run reads as all zeros there. Rows are ordered
    /// by the absolute delta of `sort` descending (name ascending for `fn`),
    /// ties broken by name.
    pub fn symbol_diffs(&self, sort: &SortKey) -> Vec<SymbolDiff> {
        let names: BTreeSet<&str> = self
            .baseline
            .symbols()
            .chain(self.candidate.symbols())
            .map(|symbol| symbol.name.as_str())
            .collect();

        let mut rows: Vec<SymbolDiff> = names
            .into_iter()
            .map(|name| {
                diff_symbol(
                    name,
                    self.baseline.symbol(name),
                    self.candidate.symbol(name),
                    &self.metrics,
                )
            })
            .collect();

        match sort {
            SortKey::Name => rows.sort_by(|a, b| a.name.cmp(&b.name)),
            _ => rows.sort_by(|a, b| {
                by_value_then_name(
                    (sort_delta(sort, a), a.name.as_str()),
                    (sort_delta(sort, b), b.name.as_str()),
                )
            }),
        }
        rows
    }

    /// Anomalies of the baseline followed by those of the candidate
    pub fn anomalies(&self) -> Vec<Anomaly> {
        self.baseline
            .anomalies()
            .iter()
            .chain(self.candidate.anomalies())
            .cloned()
            .collect()
    }
}

/// Compare two sets of totals over `metrics` (the call total included)
pub(crate) fn diff_totals(baseline: &Totals, candidate: &Totals, metrics: &[String]) -> DiffTotals {
    let mut compared = compare(&baseline.metrics, &candidate.metrics, metrics);
    compared.insert(
        CALLS.to_string(),
        DiffValue::new(baseline.calls as f64, candidate.calls as f64),
    );
    DiffTotals {
        baseline: baseline.clone(),
        candidate: candidate.clone(),
        metrics: compared,
    }
}

fn compare(
    baseline: &MetricVector,
    candidate: &MetricVector,
    metrics: &[String],
) -> BTreeMap<String, DiffValue> {
    metrics
        .iter()
        .map(|metric| {
            (
                metric.clone(),
                DiffValue::new(baseline.get(metric), candidate.get(metric)),
            )
        })
        .collect()
}

fn diff_symbol(
    name: &str,
    baseline: Option<&SymbolMetrics>,
    candidate: Option<&SymbolMetrics>,
    metrics: &[String],
) -> SymbolDiff {
    let empty = empty_symbol(name);
    let baseline = baseline.unwrap_or(&empty);
    let candidate = candidate.unwrap_or(&empty);

    SymbolDiff {
        name: name.to_string(),
        calls: DiffValue::new(baseline.calls as f64, candidate.calls as f64),
        inclusive: compare(&baseline.inclusive, &candidate.inclusive, metrics),
        exclusive: compare(&baseline.exclusive, &candidate.exclusive, metrics),
    }
}

fn sort_delta(sort: &SortKey, row: &SymbolDiff) -> f64 {
    let delta = match sort {
        SortKey::Name => 0.0,
        SortKey::Calls => row.calls.delta,
        SortKey::Inclusive(metric) => row.inclusive.get(metric).map_or(0.0, |d| d.delta),
        SortKey::Exclusive(metric) => row.exclusive.get(metric).map_or(0.0, |d| d.delta),
    };
    delta.abs()
}
