//! Human-readable table output (default `--format text`)

use crate::diff::PercentDelta;
use crate::metrics::{MetricRegistry, CALLS};
use crate::report::{format_value, Cell, Report, Summary};
use crate::run::RunId;
use crate::sort::SortKey;

/// Widest the function-name column gets before names are abbreviated
const MAX_NAME_WIDTH: usize = 60;

/// Keep long (usually namespaced) symbol names readable in a fixed-width column
///
/// Names longer than `width` keep their head and the last few characters,
/// joined by an ellipsis.
pub fn abbreviate(name: &str, width: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= width || width < 8 {
        return name.to_string();
    }
    let tail = 5;
    let head = width - tail - 1;
    let mut short: String = chars[..head].iter().collect();
    short.push('…');
    short.extend(&chars[chars.len() - tail..]);
    short
}

fn boxed_title(title: &str) -> String {
    let width = title.chars().count() + 4;
    format!(
        "╔{bar}╗\n║  {title}  ║\n╚{bar}╝\n",
        bar = "═".repeat(width),
        title = title
    )
}

fn sort_label(report: &Report) -> String {
    let id = match report.sort_key() {
        SortKey::Name => "fn".to_string(),
        key if report.is_diff() => format!("{}_delta", key),
        key => key.to_string(),
    };
    report
        .header()
        .iter()
        .find(|column| column.id == id)
        .map_or(id, |column| column.label.clone())
}

fn run_list(runs: &[RunId]) -> String {
    runs.iter()
        .map(RunId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Render a report as an aligned table with a title and row count line
pub fn format_report(report: &Report, precision: usize) -> String {
    let rows: Vec<Vec<String>> = report
        .symbols()
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(i, cell)| match (i, cell) {
                    (0, Cell::Text(name)) => abbreviate(name, MAX_NAME_WIDTH),
                    _ => cell.render(precision),
                })
                .collect()
        })
        .collect();

    let labels: Vec<&str> = report.header().iter().map(|c| c.label.as_str()).collect();
    let mut widths: Vec<usize> = labels.iter().map(|l| l.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let kind = if report.is_diff() { "Diff report" } else { "Flat profile" };
    out.push_str(&boxed_title(&format!(
        "{} for {} (sorted by {})",
        kind,
        run_list(report.runs()),
        sort_label(report)
    )));
    out.push('\n');

    let total = report.rows().len();
    match report.length().as_i64() {
        -1 => out.push_str(&format!("Displaying all {} functions.\n\n", total)),
        n => out.push_str(&format!("Displaying top {} functions.\n\n", n.min(total as i64))),
    }

    let line_width = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    out.push_str(&format_line(&labels, &widths));
    out.push_str(&format!("{}\n", "─".repeat(line_width)));
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(&format_line(&cells, &widths));
    }
    out.push_str(&format!("{}\n", "─".repeat(line_width)));

    if !report.anomalies().is_empty() {
        out.push_str(&format!(
            "\n⚠️  {} data anomalies repaired:\n",
            report.anomalies().len()
        ));
        for anomaly in report.anomalies() {
            out.push_str(&format!("  - {}\n", anomaly));
        }
    }

    out
}

fn format_line(cells: &[&str], widths: &[usize]) -> String {
    let mut line = String::new();
    for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if i == 0 {
            line.push_str(&format!("{:<width$}", cell, width = width));
        } else {
            line.push_str(&format!("  {:>width$}", cell, width = width));
        }
    }
    line.truncate(line.trim_end().len());
    line.push('\n');
    line
}

fn unit_for(registry: &MetricRegistry, metric: &str) -> String {
    if metric == CALLS {
        return String::new();
    }
    registry
        .get(metric)
        .map(|info| format!(" {}", info.unit))
        .unwrap_or_default()
}

fn label_for(registry: &MetricRegistry, metric: &str) -> String {
    if metric == CALLS {
        return "Calls".to_string();
    }
    registry
        .get(metric)
        .map_or_else(|| metric.to_string(), |info| info.label.clone())
}

/// Render headline totals: one line per metric, with units
pub fn format_summary(
    runs: &[RunId],
    summary: &Summary,
    registry: &MetricRegistry,
    precision: usize,
) -> String {
    let mut out = String::new();
    match summary {
        Summary::Single(totals) => {
            out.push_str(&boxed_title(&format!("Summary of {}", run_list(runs))));
            let mut metrics = vec![CALLS.to_string()];
            metrics.extend(registry.order(totals.metrics.ids()));
            for metric in &metrics {
                out.push_str(&format!(
                    "  {:<10} {:>14}{}\n",
                    label_for(registry, metric),
                    format_value(totals.get(metric), precision),
                    unit_for(registry, metric)
                ));
            }
        }
        Summary::Diff(diff) => {
            out.push_str(&boxed_title(&format!("Summary of {}", run_list(runs))));
            out.push_str(&format!(
                "  {:<10} {:>14} {:>14} {:>14} {:>10}\n",
                "Metric", "Baseline", "Candidate", "Delta", "Delta%"
            ));
            let mut metrics = vec![CALLS.to_string()];
            metrics.extend(registry.order(diff.metrics.keys().map(String::as_str)));
            for metric in &metrics {
                let Some(value) = diff.metrics.get(metric) else {
                    continue;
                };
                let percent = match value.percent {
                    PercentDelta::Defined(p) => format!("{:+.*}%", precision, p),
                    PercentDelta::Undefined => "n/a".to_string(),
                };
                out.push_str(&format!(
                    "  {:<10} {:>14} {:>14} {:>14} {:>10}{}\n",
                    label_for(registry, metric),
                    format_value(value.baseline, precision),
                    format_value(value.candidate, precision),
                    format_value(value.delta, precision),
                    percent,
                    unit_for(registry, metric)
                ));
            }
        }
    }
    out
}
