//! Flat-profile aggregation of a single run
//!
//! Folds every edge of a run into per-symbol inclusive and exclusive metrics:
//!
//! - inclusive(s) = Σ metrics of every edge whose callee is `s`
//! - exclusive(s) = inclusive(s) − Σ metrics of every edge whose caller is `s`
//! - totals       = Σ metrics of root edges (no caller)
//!
//! A self-recursive edge `s==>s` feeds both sums of `s` exactly once, so the
//! exclusive values of all symbols partition the run totals. Exclusive values
//! are clamped at zero; a clamp beyond rounding noise is recorded as an anomaly.

use crate::anomaly::Anomaly;
use crate::metrics::{MetricVector, CALLS};
use crate::run::Run;
use crate::sort::{by_value_then_name, SortKey};
use serde::Serialize;
use std::collections::BTreeMap;

/// Relative tolerance below which a negative exclusive value is rounding noise
const NEGATIVE_TOLERANCE: f64 = 1e-9;

/// Aggregated metrics of one symbol across all of its call sites
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolMetrics {
    pub name: String,
    /// Invocations from every caller
    pub calls: u64,
    pub inclusive: MetricVector,
    pub exclusive: MetricVector,
}

/// Headline numbers of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    /// Invocations over every edge; denominator of the calls share
    pub calls: u64,
    /// Metrics summed over root edges
    pub metrics: MetricVector,
}

impl Totals {
    /// Sum the root edges of `run` without building any per-symbol state
    pub fn of(run: &Run) -> Self {
        let mut totals = Self::default();
        for edge in run.edges() {
            totals.calls = totals.calls.saturating_add(edge.calls);
            if edge.is_root() {
                totals.metrics.accumulate(&edge.metrics);
            }
        }
        totals
    }

    /// Total for a column id; `ct` reads the call total
    pub fn get(&self, metric: &str) -> f64 {
        if metric == CALLS {
            self.calls as f64
        } else {
            self.metrics.get(metric)
        }
    }

    /// `value` as a percentage of this run's total for `metric`
    pub fn percent(&self, metric: &str, value: f64) -> f64 {
        percent_of(value, self.get(metric))
    }
}

/// `value / total * 100`, defined as 0 when the total is zero or not finite
pub fn percent_of(value: f64, total: f64) -> f64 {
    if total == 0.0 || !total.is_finite() {
        return 0.0;
    }
    let percent = value / total * 100.0;
    if percent.is_finite() {
        percent
    } else {
        0.0
    }
}

/// Aggregated view of one run, computed once at construction
#[derive(Debug, Clone)]
pub struct Parser {
    totals: Totals,
    symbols: BTreeMap<String, SymbolMetrics>,
    metrics: Vec<String>,
    anomalies: Vec<Anomaly>,
}

impl Parser {
    pub fn new(run: &Run) -> Self {
        let mut symbols: BTreeMap<String, SymbolMetrics> = BTreeMap::new();
        let mut children: BTreeMap<&str, MetricVector> = BTreeMap::new();

        for edge in run.edges() {
            let symbol = symbols
                .entry(edge.callee.clone())
                .or_insert_with(|| empty_symbol(&edge.callee));
            symbol.calls = symbol.calls.saturating_add(edge.calls);
            symbol.inclusive.accumulate(&edge.metrics);

            if let Some(caller) = edge.caller.as_deref() {
                children.entry(caller).or_default().accumulate(&edge.metrics);
            }
        }

        let mut anomalies = run.anomalies().to_vec();

        // Callers that never appear as a callee still own their outgoing cost.
        for caller in children.keys() {
            if !symbols.contains_key(*caller) {
                symbols.insert(caller.to_string(), empty_symbol(caller));
            }
        }

        for symbol in symbols.values_mut() {
            let mut exclusive = symbol.inclusive.clone();
            if let Some(child_cost) = children.get(symbol.name.as_str()) {
                for metric in child_cost.ids() {
                    let inclusive = symbol.inclusive.get(metric);
                    let value = inclusive - child_cost.get(metric);
                    if value < -NEGATIVE_TOLERANCE * inclusive.max(1.0) {
                        anomalies.push(
                            Anomaly::NegativeExclusive {
                                symbol: symbol.name.clone(),
                                metric: metric.to_string(),
                                value,
                            }
                            .logged(),
                        );
                    }
                    exclusive.set(metric, value.max(0.0));
                }
            }
            symbol.exclusive = exclusive;
        }

        let metrics = run.metric_ids().into_iter().map(str::to_string).collect();

        tracing::debug!(
            "Aggregated run {}: {} symbols from {} edges ({} self-recursive)",
            run.id(),
            symbols.len(),
            run.edges().len(),
            run.edges().iter().filter(|edge| edge.is_self_recursive()).count()
        );

        Self {
            totals: Totals::of(run),
            symbols,
            metrics,
            anomalies,
        }
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    /// Inclusive metrics per symbol, name-ordered
    pub fn symbol_metrics(&self) -> BTreeMap<&str, &MetricVector> {
        self.symbols
            .iter()
            .map(|(name, symbol)| (name.as_str(), &symbol.inclusive))
            .collect()
    }

    pub fn symbol(&self, name: &str) -> Option<&SymbolMetrics> {
        self.symbols.get(name)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &SymbolMetrics> {
        self.symbols.values()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Every symbol, ordered by `sort` descending (name ascending for `fn`),
    /// ties broken by name ascending
    pub fn flat_profile(&self, sort: &SortKey) -> Vec<SymbolMetrics> {
        let mut rows: Vec<SymbolMetrics> = self.symbols.values().cloned().collect();
        match sort {
            SortKey::Name => rows.sort_by(|a, b| a.name.cmp(&b.name)),
            _ => rows.sort_by(|a, b| {
                by_value_then_name(
                    (sort_value(sort, a), a.name.as_str()),
                    (sort_value(sort, b), b.name.as_str()),
                )
            }),
        }
        rows
    }

    /// Metric ids present in the run, alphabetical
    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    /// Decode and aggregation anomalies, in discovery order
    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    /// `value` as a percentage of the run total for `metric`
    pub fn percent(&self, metric: &str, value: f64) -> f64 {
        self.totals.percent(metric, value)
    }
}

pub(crate) fn empty_symbol(name: &str) -> SymbolMetrics {
    SymbolMetrics {
        name: name.to_string(),
        calls: 0,
        inclusive: MetricVector::new(),
        exclusive: MetricVector::new(),
    }
}

fn sort_value(sort: &SortKey, symbol: &SymbolMetrics) -> f64 {
    match sort {
        SortKey::Name => 0.0,
        SortKey::Calls => symbol.calls as f64,
        SortKey::Inclusive(metric) => symbol.inclusive.get(metric),
        SortKey::Exclusive(metric) => symbol.exclusive.get(metric),
    }
}
