use anyhow::{Context, Result};
use clap::Parser;
use desglose::cli::{Cli, OutputFormat};
use desglose::config::ReportConfig;
use desglose::csv_output::CsvOutput;
use desglose::json_output::{JsonReport, JsonSummary};
use desglose::provider::{DirectoryProvider, RunProvider};
use desglose::report::{ReportEngine, ReportRequest};
use desglose::run::RunId;
use desglose::text_output;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Config file values, overridden by whatever the command line sets
fn effective_config(args: &Cli) -> Result<ReportConfig> {
    let mut config =
        ReportConfig::discover(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(sort) = &args.sort {
        config.default_sort = sort.clone();
    }
    if let Some(length) = args.length {
        config.length = length.max(-1);
    }
    if let Some(dir) = &args.runs_dir {
        config.runs_dir = Some(dir.clone());
    }
    if let Some(namespace) = &args.namespace {
        config.namespace = Some(namespace.clone());
    }
    if let Some(precision) = args.precision {
        config.percent_precision = precision;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn provider_for(config: &ReportConfig) -> DirectoryProvider {
    let dir = config
        .runs_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let provider = DirectoryProvider::new(dir);
    match &config.namespace {
        Some(namespace) => provider.with_namespace(namespace.clone()),
        None => provider,
    }
}

fn print_run_list(provider: &DirectoryProvider, format: OutputFormat) -> Result<()> {
    let ids = provider.list()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ids)?),
        OutputFormat::Text | OutputFormat::Csv => {
            for id in ids {
                println!("{}", id);
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let config = effective_config(&args)?;
    let provider = provider_for(&config);
    tracing::debug!("Reading runs from {}", provider.dir().display());

    if args.list {
        return print_run_list(&provider, args.format);
    }

    let Some(run) = args.run.as_deref() else {
        anyhow::bail!("A run id is required");
    };
    let run1 = RunId::new(run);
    let run2 = args.run2.as_deref().map(RunId::new);
    let engine = ReportEngine::default();
    let precision = config.percent_precision;

    if args.summary {
        let summary = engine.summary_for_ids(&provider, &run1, run2.as_ref())?;
        let mut runs = vec![run1];
        runs.extend(run2);
        match args.format {
            OutputFormat::Text => print!(
                "{}",
                text_output::format_summary(&runs, &summary, engine.registry(), precision)
            ),
            OutputFormat::Json => println!(
                "{}",
                JsonSummary::new(&runs, &summary, engine.registry()).to_json_string()?
            ),
            OutputFormat::Csv => print!("{}", CsvOutput::new(precision).format_summary(&summary)),
        }
        return Ok(());
    }

    let request = ReportRequest::from(&config);
    let report = engine.report_for_ids(&provider, &run1, run2.as_ref(), &request)?;

    match args.format {
        OutputFormat::Text => print!("{}", text_output::format_report(&report, precision)),
        OutputFormat::Json => println!("{}", JsonReport::new(&report).to_json_string()?),
        OutputFormat::Csv => print!("{}", CsvOutput::new(precision).format_report(&report)),
    }

    Ok(())
}
