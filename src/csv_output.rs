//! CSV output format for reports
//!
//! `--format csv`: one header row of column labels, then one row per symbol.
//! Percentages are written without the `%` sign and undefined percent deltas
//! are left empty, so every numeric column parses cleanly in a spreadsheet.

use crate::diff::PercentDelta;
use crate::metrics::CALLS;
use crate::report::{format_value, Cell, Report, Summary};

/// CSV output formatter
#[derive(Debug)]
pub struct CsvOutput {
    precision: usize,
    /// Column ids instead of display labels in the header row
    use_ids: bool,
}

impl CsvOutput {
    pub fn new(precision: usize) -> Self {
        Self {
            precision,
            use_ids: false,
        }
    }

    /// Write stable column ids (`excl_wt_perc`) instead of labels
    pub fn with_column_ids(mut self) -> Self {
        self.use_ids = true;
        self
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn format_cell(&self, cell: &Cell) -> String {
        match cell {
            Cell::Text(text) => Self::escape_field(text),
            Cell::Count(n) => n.to_string(),
            Cell::Value(v) => format_value(*v, self.precision),
            Cell::Percent(p) => format!("{:.*}", self.precision, p),
            Cell::Undefined => String::new(),
        }
    }

    /// Header plus one line per row of `report`
    pub fn format_report(&self, report: &Report) -> String {
        let header: Vec<String> = report
            .header()
            .iter()
            .map(|column| {
                let text = if self.use_ids { &column.id } else { &column.label };
                Self::escape_field(text)
            })
            .collect();

        let mut output = header.join(",");
        output.push('\n');
        for row in report.symbols() {
            let fields: Vec<String> = row.iter().map(|cell| self.format_cell(cell)).collect();
            output.push_str(&fields.join(","));
            output.push('\n');
        }
        output
    }

    /// `metric,value` lines for a single run, or
    /// `metric,baseline,candidate,delta,delta_perc` for a diff
    pub fn format_summary(&self, summary: &Summary) -> String {
        let mut output = String::new();
        match summary {
            Summary::Single(totals) => {
                output.push_str("metric,value\n");
                output.push_str(&format!("{},{}\n", CALLS, totals.calls));
                for (metric, value) in totals.metrics.iter() {
                    output.push_str(&format!(
                        "{},{}\n",
                        Self::escape_field(metric),
                        format_value(value, self.precision)
                    ));
                }
            }
            Summary::Diff(diff) => {
                output.push_str("metric,baseline,candidate,delta,delta_perc\n");
                for (metric, value) in &diff.metrics {
                    let percent = match value.percent {
                        PercentDelta::Defined(p) => format!("{:.*}", self.precision, p),
                        PercentDelta::Undefined => String::new(),
                    };
                    output.push_str(&format!(
                        "{},{},{},{},{}\n",
                        Self::escape_field(metric),
                        format_value(value.baseline, self.precision),
                        format_value(value.candidate, self.precision),
                        format_value(value.delta, self.precision),
                        percent
                    ));
                }
            }
        }
        output
    }
}
