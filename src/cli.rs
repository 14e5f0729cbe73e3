//! CLI argument parsing for desglose

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "desglose")]
#[command(version)]
#[command(
    about = "Flat profiles and run-to-run diffs of XHProf-format call graph profiles",
    long_about = None
)]
pub struct Cli {
    /// Run id to report on (the baseline when RUN2 is given)
    #[arg(value_name = "RUN", required_unless_present = "list")]
    pub run: Option<String>,

    /// Second run id: report the difference RUN -> RUN2
    #[arg(value_name = "RUN2")]
    pub run2: Option<String>,

    /// Directory holding `<run>[.<namespace>].xhprof` files
    #[arg(long = "runs-dir", value_name = "DIR")]
    pub runs_dir: Option<PathBuf>,

    /// Run file namespace
    #[arg(long = "namespace", value_name = "NS")]
    pub namespace: Option<String>,

    /// Sort key: a metric id (wt, cpu, mu, ...), excl_<metric>, ct or fn
    #[arg(short = 's', long = "sort", value_name = "KEY")]
    pub sort: Option<String>,

    /// Number of functions to show (-1 for all)
    #[arg(short = 'n', long = "length", value_name = "N", allow_negative_numbers = true)]
    pub length: Option<i64>,

    /// Show headline totals only
    #[arg(long = "summary")]
    pub summary: bool,

    /// List the run ids available in the runs directory
    #[arg(long = "list", conflicts_with_all = ["summary", "run2"])]
    pub list: bool,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Decimal places for fractional values and percentages
    #[arg(long = "precision", value_name = "DIGITS")]
    pub precision: Option<usize>,

    /// TOML config file (default: ./desglose.toml if present)
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_single_run() {
        let cli = Cli::parse_from(["desglose", "5f1a"]);
        assert_eq!(cli.run.as_deref(), Some("5f1a"));
        assert!(cli.run2.is_none());
        assert!(!cli.summary);
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(cli.sort.is_none());
        assert!(cli.length.is_none());
    }

    #[test]
    fn test_cli_diff_runs() {
        let cli = Cli::parse_from(["desglose", "a", "b"]);
        assert_eq!(cli.run.as_deref(), Some("a"));
        assert_eq!(cli.run2.as_deref(), Some("b"));
    }

    #[test]
    fn test_cli_sort_and_length() {
        let cli = Cli::parse_from(["desglose", "-s", "excl_cpu", "-n", "25", "a"]);
        assert_eq!(cli.sort.as_deref(), Some("excl_cpu"));
        assert_eq!(cli.length, Some(25));
    }

    #[test]
    fn test_cli_negative_length() {
        let cli = Cli::parse_from(["desglose", "--length", "-1", "a"]);
        assert_eq!(cli.length, Some(-1));
    }

    #[test]
    fn test_cli_format_json() {
        let cli = Cli::parse_from(["desglose", "--format", "json", "a"]);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn test_cli_format_csv() {
        let cli = Cli::parse_from(["desglose", "--format", "csv", "a"]);
        assert_eq!(cli.format, OutputFormat::Csv);
    }

    #[test]
    fn test_cli_runs_dir_and_namespace() {
        let cli = Cli::parse_from([
            "desglose",
            "--runs-dir",
            "/var/tmp/xhprof",
            "--namespace",
            "shop",
            "a",
        ]);
        assert_eq!(cli.runs_dir, Some(PathBuf::from("/var/tmp/xhprof")));
        assert_eq!(cli.namespace.as_deref(), Some("shop"));
    }

    #[test]
    fn test_cli_list_without_run() {
        let cli = Cli::parse_from(["desglose", "--list"]);
        assert!(cli.list);
        assert!(cli.run.is_none());
    }

    #[test]
    fn test_cli_requires_run() {
        assert!(Cli::try_parse_from(["desglose"]).is_err());
    }

    #[test]
    fn test_cli_list_conflicts_with_summary() {
        assert!(Cli::try_parse_from(["desglose", "--list", "--summary"]).is_err());
    }

    #[test]
    fn test_cli_debug_and_config() {
        let cli = Cli::parse_from(["desglose", "--debug", "--config", "my.toml", "a"]);
        assert!(cli.debug);
        assert_eq!(cli.config, Some(PathBuf::from("my.toml")));
    }
}
