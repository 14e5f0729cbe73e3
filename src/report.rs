//! Report engine
//!
//! Builds a uniform [`Report`] from one run (flat profile) or two runs (diff),
//! applying sort-key validation, truncation, and share-of-total percentages.
//!
//! Row layout is a positional contract shared with every renderer:
//!
//! - flat: `fn, ct, ct_perc, then per metric m: m, m_perc, excl_m, excl_m_perc`
//! - diff: `fn, ct_base, ct_cand, ct_delta, ct_delta_perc, then per metric m:
//!   m_base, m_cand, m_delta, m_delta_perc, excl_m_base, excl_m_cand,
//!   excl_m_delta, excl_m_delta_perc`

use crate::anomaly::Anomaly;
use crate::config::ReportConfig;
use crate::diff::{diff_totals, DiffParser, DiffTotals, DiffValue, PercentDelta, SymbolDiff};
use crate::error::ProviderError;
use crate::metrics::{MetricInfo, MetricRegistry, CALLS, WALL_TIME};
use crate::parser::{Parser, SymbolMetrics, Totals};
use crate::provider::RunProvider;
use crate::run::{Run, RunId};
use crate::sort::SortKey;
use serde::{Serialize, Serializer};

/// How many rows a report keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Length {
    #[default]
    All,
    Top(usize),
}

impl Length {
    /// Interpret the `-1` ("no truncation") convention; any negative is `All`
    pub fn from_i64(length: i64) -> Self {
        usize::try_from(length).map_or(Self::All, Self::Top)
    }

    pub fn as_i64(self) -> i64 {
        match self {
            Self::All => -1,
            Self::Top(n) => i64::try_from(n).unwrap_or(i64::MAX),
        }
    }

    /// Number of rows kept out of `available`
    pub fn limit(self, available: usize) -> usize {
        match self {
            Self::All => available,
            Self::Top(n) => n.min(available),
        }
    }
}

impl Serialize for Length {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_i64())
    }
}

/// Caller-supplied report options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    /// Requested sort key; validated against the run's metrics
    pub sort: String,
    pub length: Length,
    /// Key used when `sort` is unavailable
    pub fallback_sort: String,
}

impl Default for ReportRequest {
    fn default() -> Self {
        Self {
            sort: WALL_TIME.to_string(),
            length: Length::All,
            fallback_sort: WALL_TIME.to_string(),
        }
    }
}

impl ReportRequest {
    pub fn new(sort: impl Into<String>, length: Length) -> Self {
        Self {
            sort: sort.into(),
            length,
            ..Self::default()
        }
    }
}

impl From<&ReportConfig> for ReportRequest {
    fn from(config: &ReportConfig) -> Self {
        Self {
            sort: config.default_sort.clone(),
            length: Length::from_i64(config.length),
            fallback_sort: config.fallback_sort.clone(),
        }
    }
}

/// One header column: stable id and display label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub id: String,
    pub label: String,
}

/// A rendered report cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Count(u64),
    Value(f64),
    Percent(f64),
    /// Percent delta against a zero baseline
    Undefined,
}

impl Cell {
    fn from_percent_delta(percent: PercentDelta) -> Self {
        match percent {
            PercentDelta::Defined(p) => Self::Percent(p),
            PercentDelta::Undefined => Self::Undefined,
        }
    }

    /// Plain-text form; percentages get a `%` suffix
    pub fn render(&self, precision: usize) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Count(n) => n.to_string(),
            Self::Value(v) => format_value(*v, precision),
            Self::Percent(p) => format!("{:.*}%", precision, p),
            Self::Undefined => "n/a".to_string(),
        }
    }
}

/// Whole numbers print without decimals, others with `precision` places
pub fn format_value(value: f64, precision: usize) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.*}", precision, value)
    }
}

/// Headline numbers of a report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Summary {
    Single(Totals),
    Diff(DiffTotals),
}

/// Ordered rows of a report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", content = "rows", rename_all = "snake_case")]
pub enum ReportRows {
    Flat(Vec<SymbolMetrics>),
    Diff(Vec<SymbolDiff>),
}

impl ReportRows {
    pub fn len(&self) -> usize {
        match self {
            Self::Flat(rows) => rows.len(),
            Self::Diff(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of one report request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    runs: Vec<RunId>,
    sort: SortKey,
    length: Length,
    metrics: Vec<String>,
    possible_metrics: Vec<MetricInfo>,
    columns: Vec<Column>,
    summary: Summary,
    rows: ReportRows,
    anomalies: Vec<Anomaly>,
}

impl Report {
    /// Run ids: one for a flat report, baseline then candidate for a diff
    pub fn runs(&self) -> &[RunId] {
        &self.runs
    }

    pub fn is_diff(&self) -> bool {
        matches!(self.rows, ReportRows::Diff(_))
    }

    /// Sort key actually applied (after fallback)
    pub fn sort_key(&self) -> &SortKey {
        &self.sort
    }

    pub fn length(&self) -> Length {
        self.length
    }

    /// Metric ids present in the data, in display order
    pub fn get_metrics(&self) -> &[String] {
        &self.metrics
    }

    /// Registry entries for the metrics present
    pub fn get_possible_metrics(&self) -> &[MetricInfo] {
        &self.possible_metrics
    }

    pub fn get_summary(&self) -> &Summary {
        &self.summary
    }

    pub fn header(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &ReportRows {
        &self.rows
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    /// Rows as cells aligned with [`Report::header`], at most `length` of them
    pub fn get_symbols(&self, length: Length) -> Vec<Vec<Cell>> {
        match (&self.rows, &self.summary) {
            (ReportRows::Flat(rows), Summary::Single(totals)) => {
                let keep = length.limit(rows.len());
                rows[..keep]
                    .iter()
                    .map(|row| flat_cells(row, totals, &self.metrics))
                    .collect()
            }
            (ReportRows::Diff(rows), _) => {
                let keep = length.limit(rows.len());
                rows[..keep]
                    .iter()
                    .map(|row| diff_cells(row, &self.metrics))
                    .collect()
            }
            (ReportRows::Flat(_), Summary::Diff(_)) => Vec::new(),
        }
    }

    /// [`Report::get_symbols`] with the report's own length
    pub fn symbols(&self) -> Vec<Vec<Cell>> {
        self.get_symbols(self.length)
    }
}

fn flat_cells(row: &SymbolMetrics, totals: &Totals, metrics: &[String]) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(3 + 4 * metrics.len());
    cells.push(Cell::Text(row.name.clone()));
    cells.push(Cell::Count(row.calls));
    cells.push(Cell::Percent(totals.percent(CALLS, row.calls as f64)));
    for metric in metrics {
        let inclusive = row.inclusive.get(metric);
        let exclusive = row.exclusive.get(metric);
        cells.push(Cell::Value(inclusive));
        cells.push(Cell::Percent(totals.percent(metric, inclusive)));
        cells.push(Cell::Value(exclusive));
        cells.push(Cell::Percent(totals.percent(metric, exclusive)));
    }
    cells
}

fn push_diff(cells: &mut Vec<Cell>, diff: DiffValue) {
    cells.push(Cell::Value(diff.baseline));
    cells.push(Cell::Value(diff.candidate));
    cells.push(Cell::Value(diff.delta));
    cells.push(Cell::from_percent_delta(diff.percent));
}

fn diff_cells(row: &SymbolDiff, metrics: &[String]) -> Vec<Cell> {
    let zero = DiffValue::new(0.0, 0.0);
    let mut cells = Vec::with_capacity(5 + 8 * metrics.len());
    cells.push(Cell::Text(row.name.clone()));
    cells.push(Cell::Count(row.calls.baseline as u64));
    cells.push(Cell::Count(row.calls.candidate as u64));
    cells.push(Cell::Value(row.calls.delta));
    cells.push(Cell::from_percent_delta(row.calls.percent));
    for metric in metrics {
        push_diff(&mut cells, row.inclusive.get(metric).copied().unwrap_or(zero));
        push_diff(&mut cells, row.exclusive.get(metric).copied().unwrap_or(zero));
    }
    cells
}

/// Column ids of a flat report
pub fn flat_column_ids(metrics: &[String]) -> Vec<String> {
    let mut ids = vec!["fn".to_string(), CALLS.to_string(), "ct_perc".to_string()];
    for metric in metrics {
        ids.push(metric.clone());
        ids.push(format!("{}_perc", metric));
        ids.push(format!("excl_{}", metric));
        ids.push(format!("excl_{}_perc", metric));
    }
    ids
}

/// Column ids of a diff report
pub fn diff_column_ids(metrics: &[String]) -> Vec<String> {
    let mut ids = vec!["fn".to_string()];
    let bases = std::iter::once(CALLS.to_string()).chain(
        metrics
            .iter()
            .flat_map(|m| [m.clone(), format!("excl_{}", m)]),
    );
    for base in bases {
        for suffix in ["base", "cand", "delta", "delta_perc"] {
            ids.push(format!("{}_{}", base, suffix));
        }
    }
    ids
}

/// Orchestrates parsers into reports; holds only the immutable registry
#[derive(Debug, Clone, Copy)]
pub struct ReportEngine<'r> {
    registry: &'r MetricRegistry,
}

impl Default for ReportEngine<'static> {
    fn default() -> Self {
        Self::new(MetricRegistry::builtin())
    }
}

impl<'r> ReportEngine<'r> {
    pub fn new(registry: &'r MetricRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r MetricRegistry {
        self.registry
    }

    /// Flat report for `run1`, or a diff report when `run2` is given
    pub fn get_report(&self, run1: &Run, run2: Option<&Run>, request: &ReportRequest) -> Report {
        match run2 {
            None => self.flat_report(run1, request),
            Some(run2) => self.diff_report(run1, run2, request),
        }
    }

    /// Totals only; no per-symbol aggregation happens
    pub fn get_summary(&self, run1: &Run, run2: Option<&Run>) -> Summary {
        let baseline = Totals::of(run1);
        match run2 {
            None => Summary::Single(baseline),
            Some(run2) => {
                let metrics = self.registry.order(run1.metric_ids().union(&run2.metric_ids()).copied());
                Summary::Diff(diff_totals(&baseline, &Totals::of(run2), &metrics))
            }
        }
    }

    /// Resolve run ids through `provider`, then build the report
    pub fn report_for_ids(
        &self,
        provider: &dyn RunProvider,
        run1: &RunId,
        run2: Option<&RunId>,
        request: &ReportRequest,
    ) -> Result<Report, ProviderError> {
        let first = provider.load(run1)?;
        let second = run2.map(|id| provider.load(id)).transpose()?;
        Ok(self.get_report(&first, second.as_ref(), request))
    }

    /// Resolve run ids through `provider`, then compute the summary
    pub fn summary_for_ids(
        &self,
        provider: &dyn RunProvider,
        run1: &RunId,
        run2: Option<&RunId>,
    ) -> Result<Summary, ProviderError> {
        let first = provider.load(run1)?;
        let second = run2.map(|id| provider.load(id)).transpose()?;
        Ok(self.get_summary(&first, second.as_ref()))
    }

    /// Registry entries for present metrics
    pub fn possible_metrics(&self, metrics: &[String]) -> Vec<MetricInfo> {
        self.registry.possible_metrics(metrics)
    }

    fn columns(&self, ids: Vec<String>) -> Vec<Column> {
        ids.into_iter()
            .map(|id| Column {
                label: self.describe(&id),
                id,
            })
            .collect()
    }

    /// Label for flat and diff column ids alike
    fn describe(&self, id: &str) -> String {
        for (suffix, tag) in [
            ("_delta_perc", "Delta%"),
            ("_delta", "Delta"),
            ("_base", "Base"),
            ("_cand", "Cand"),
        ] {
            if let Some(base) = id.strip_suffix(suffix) {
                return format!("{} {}", self.registry.describe_column(base), tag);
            }
        }
        self.registry.describe_column(id)
    }

    fn flat_report(&self, run: &Run, request: &ReportRequest) -> Report {
        let parser = Parser::new(run);
        let metrics = self.registry.order(parser.metrics().iter().map(String::as_str));
        let (sort, fallback) = SortKey::resolve(&request.sort, &metrics, &request.fallback_sort);

        let mut rows = parser.flat_profile(&sort);
        rows.truncate(request.length.limit(rows.len()));

        let mut anomalies = parser.anomalies().to_vec();
        anomalies.extend(fallback);

        tracing::debug!(
            "Flat report for run {}: {} of {} symbols sorted by {}",
            run.id(),
            rows.len(),
            parser.symbol_count(),
            sort
        );

        Report {
            runs: vec![run.id().clone()],
            sort,
            length: request.length,
            possible_metrics: self.possible_metrics(&metrics),
            columns: self.columns(flat_column_ids(&metrics)),
            summary: Summary::Single(parser.totals().clone()),
            rows: ReportRows::Flat(rows),
            metrics,
            anomalies,
        }
    }

    fn diff_report(&self, baseline: &Run, candidate: &Run, request: &ReportRequest) -> Report {
        let diff = DiffParser::new(baseline, candidate);
        let metrics = self.registry.order(diff.metrics().iter().map(String::as_str));
        let (sort, fallback) = SortKey::resolve(&request.sort, &metrics, &request.fallback_sort);

        let mut rows = diff.symbol_diffs(&sort);
        let available = rows.len();
        rows.truncate(request.length.limit(available));

        let mut anomalies = diff.anomalies();
        anomalies.extend(fallback);

        tracing::debug!(
            "Diff report {} -> {}: {} of {} symbols sorted by {}",
            baseline.id(),
            candidate.id(),
            rows.len(),
            available,
            sort
        );

        Report {
            runs: vec![baseline.id().clone(), candidate.id().clone()],
            sort,
            length: request.length,
            possible_metrics: self.possible_metrics(&metrics),
            columns: self.columns(diff_column_ids(&metrics)),
            summary: Summary::Diff(diff_totals(
                diff.baseline().totals(),
                diff.candidate().totals(),
                &metrics,
            )),
            rows: ReportRows::Diff(rows),
            metrics,
            anomalies,
        }
    }
}
