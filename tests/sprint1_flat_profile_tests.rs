//! Integration tests for flat profiles (Sprint 1)
//!
//! Runs are loaded from `tests/fixtures/runs` through the directory provider.

use desglose::anomaly::Anomaly;
use desglose::metrics::MetricVector;
use desglose::parser::Parser;
use desglose::provider::{DirectoryProvider, MemoryProvider, RunProvider};
use desglose::report::{Cell, Length, ReportEngine, ReportRequest};
use desglose::run::{Edge, Run, RunId};
use desglose::sort::SortKey;
use desglose::ProviderError;

fn fixtures() -> DirectoryProvider {
    DirectoryProvider::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/runs"))
        .with_namespace("demo")
}

fn names(report: &desglose::Report) -> Vec<String> {
    report
        .symbols()
        .into_iter()
        .map(|row| match &row[0] {
            Cell::Text(name) => name.clone(),
            other => panic!("first cell should be the name, got {:?}", other),
        })
        .collect()
}

#[test]
fn test_fixture_runs_are_listed() {
    let ids = fixtures().list().unwrap();
    assert_eq!(ids, vec![RunId::new("baseline"), RunId::new("candidate")]);
}

#[test]
fn test_exclusive_partitions_totals() {
    let run = fixtures().load(&RunId::new("baseline")).unwrap();
    let parser = Parser::new(&run);

    for metric in ["wt", "cpu", "mu"] {
        let total = parser.totals().get(metric);
        let sum: f64 = parser.symbols().map(|s| s.exclusive.get(metric)).sum();
        assert!((sum - total).abs() < 1e-9, "{}: {} != {}", metric, sum, total);
    }
    assert_eq!(parser.totals().calls, 19);
    assert!(parser.anomalies().is_empty());
}

#[test]
fn test_parse_aggregates_over_callers() {
    let run = fixtures().load(&RunId::new("baseline")).unwrap();
    let parser = Parser::new(&run);
    let parse = parser.symbol("parse").unwrap();

    assert_eq!(parse.calls, 15);
    assert_eq!(parse.inclusive.get("wt"), 500.0);
    assert_eq!(parse.exclusive.get("wt"), 500.0);

    let main = parser.symbol("main()").unwrap();
    assert_eq!(main.exclusive.get("wt"), 100.0);
}

#[test]
fn test_sort_by_inclusive_wall_time() {
    let engine = ReportEngine::default();
    let report = engine
        .report_for_ids(&fixtures(), &RunId::new("baseline"), None, &ReportRequest::default())
        .unwrap();
    assert_eq!(names(&report), vec!["main()", "load", "parse", "render"]);
}

#[test]
fn test_sort_by_exclusive_breaks_ties_by_name() {
    let engine = ReportEngine::default();
    let request = ReportRequest::new("excl_wt", Length::All);
    let report = engine
        .report_for_ids(&fixtures(), &RunId::new("baseline"), None, &request)
        .unwrap();
    // load and render both have 200 exclusive
    assert_eq!(names(&report), vec!["parse", "load", "render", "main()"]);
    assert_eq!(report.sort_key(), &SortKey::Exclusive("wt".into()));
}

#[test]
fn test_sort_by_name_and_calls() {
    let engine = ReportEngine::default();
    let run = fixtures().load(&RunId::new("baseline")).unwrap();

    let by_name = engine.get_report(&run, None, &ReportRequest::new("fn", Length::All));
    assert_eq!(names(&by_name), vec!["load", "main()", "parse", "render"]);

    let by_calls = engine.get_report(&run, None, &ReportRequest::new("ct", Length::All));
    assert_eq!(names(&by_calls)[0], "parse");
}

#[test]
fn test_truncation_keeps_largest() {
    let engine = ReportEngine::default();
    let run = fixtures().load(&RunId::new("baseline")).unwrap();

    let top = engine.get_report(&run, None, &ReportRequest::new("wt", Length::from_i64(2)));
    assert_eq!(names(&top), vec!["main()", "load"]);

    let all = engine.get_report(&run, None, &ReportRequest::new("wt", Length::from_i64(-1)));
    assert_eq!(all.symbols().len(), 4);

    let zero = engine.get_report(&run, None, &ReportRequest::new("wt", Length::Top(0)));
    assert!(zero.symbols().is_empty());
    assert_eq!(zero.header().len(), 3 + 4 * 3);
}

#[test]
fn test_metrics_in_registry_order() {
    let engine = ReportEngine::default();
    let run = fixtures().load(&RunId::new("baseline")).unwrap();
    let report = engine.get_report(&run, None, &ReportRequest::default());

    assert_eq!(report.get_metrics(), &["wt", "cpu", "mu"]);
    let units: Vec<_> = report
        .get_possible_metrics()
        .iter()
        .map(|m| m.unit.as_str())
        .collect();
    assert_eq!(units, vec!["microsecs", "microsecs", "bytes"]);
    assert_eq!(report.header()[3].label, "Incl. Wall Time (microsecs)");
    assert_eq!(report.header()[4].label, "IWall%");
}

#[test]
fn test_unknown_metric_still_reported() {
    let run = Run::from_json_str(
        "custom",
        r#"{"main()": {"ct": 1, "wt": 10, "io_wait": 4}, "main()==>read": {"ct": 3, "wt": 6, "io_wait": 4}}"#,
    )
    .unwrap();
    let report = ReportEngine::default().get_report(&run, None, &ReportRequest::default());
    assert_eq!(report.get_metrics(), &["wt", "io_wait"]);
    assert!(report.header().iter().any(|c| c.id == "excl_io_wait" && c.label == "excl_io_wait"));
    assert_eq!(report.get_possible_metrics().len(), 1);
}

#[test]
fn test_unavailable_sort_key_falls_back() {
    let engine = ReportEngine::default();
    let run = fixtures().load(&RunId::new("baseline")).unwrap();
    let report = engine.get_report(&run, None, &ReportRequest::new("pmu", Length::All));

    assert_eq!(report.sort_key(), &SortKey::Inclusive("wt".into()));
    assert_eq!(
        report.anomalies(),
        &[Anomaly::UnknownSortMetric {
            requested: "pmu".into(),
            fallback: "wt".into(),
        }]
    );
}

#[test]
fn test_dirty_data_is_repaired() {
    let run = Run::from_json_str(
        "dirty",
        r#"{
            "main()": {"ct": 1, "wt": 100},
            "main()==>a": {"ct": 1, "wt": -5},
            "main()==>b": {"ct": 1},
            "a==>b==>c": {"ct": 1, "wt": 1}
        }"#,
    )
    .unwrap();
    let report = ReportEngine::default().get_report(&run, None, &ReportRequest::default());
    let anomalies = report.anomalies();

    assert!(anomalies.iter().any(|a| matches!(a, Anomaly::InvalidMetric { .. })));
    assert!(anomalies.iter().any(|a| matches!(a, Anomaly::MissingMetric { .. })));
    assert!(anomalies.iter().any(|a| matches!(a, Anomaly::MalformedEdge { .. })));
    for row in report.symbols() {
        assert_eq!(row.len(), report.header().len());
    }
}

#[test]
fn test_children_over_parent_are_clamped() {
    let run = Run::from_edges(
        "skewed",
        vec![
            Edge::root("main()", 1, MetricVector::new().with("wt", 10.0)),
            Edge::call("main()", "child", 1, MetricVector::new().with("wt", 12.0)),
        ],
    );
    let parser = Parser::new(&run);
    assert_eq!(parser.symbol("main()").unwrap().exclusive.get("wt"), 0.0);
    assert!(matches!(
        parser.anomalies(),
        [Anomaly::NegativeExclusive { symbol, .. }] if symbol == "main()"
    ));
}

#[test]
fn test_missing_run_is_a_provider_error() {
    let engine = ReportEngine::default();
    let err = engine
        .report_for_ids(&fixtures(), &RunId::new("nope"), None, &ReportRequest::default())
        .unwrap_err();
    assert!(matches!(err, ProviderError::NotFound(id) if id.as_str() == "nope"));
}

#[test]
fn test_memory_provider_matches_direct_report() {
    let run = fixtures().load(&RunId::new("baseline")).unwrap();
    let engine = ReportEngine::default();
    let direct = engine.get_report(&run, None, &ReportRequest::default());

    let provider = MemoryProvider::new().with_run(run);
    let resolved = engine
        .report_for_ids(&provider, &RunId::new("baseline"), None, &ReportRequest::default())
        .unwrap();
    assert_eq!(direct, resolved);
}
