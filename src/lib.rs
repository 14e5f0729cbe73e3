//! Desglose - call graph profile reports in pure Rust
//!
//! This library turns raw XHProf-format profiling runs (a map of
//! `caller==>callee` edges to metric counters) into flat per-function
//! profiles and run-to-run diff reports, with inclusive and exclusive
//! accounting, share-of-total percentages, sorting and truncation.
//!
//! ```
//! use desglose::report::{Length, ReportEngine, ReportRequest};
//! use desglose::run::Run;
//!
//! let run = Run::from_json_str(
//!     "demo",
//!     r#"{"main()": {"ct": 1, "wt": 100}, "main()==>work": {"ct": 2, "wt": 60}}"#,
//! )
//! .unwrap();
//!
//! let report = ReportEngine::default().get_report(&run, None, &ReportRequest::new("excl_wt", Length::All));
//! assert_eq!(report.get_metrics(), &["wt"]);
//! assert_eq!(report.symbols().len(), 2);
//! ```

pub mod anomaly;
pub mod cli;
pub mod config;
pub mod csv_output;
pub mod diff;
pub mod error;
pub mod json_output;
pub mod metrics;
pub mod parser;
pub mod provider;
pub mod report;
pub mod run;
pub mod sort;
pub mod text_output;

pub use anomaly::Anomaly;
pub use error::{ConfigError, DecodeError, ProviderError};
pub use report::{Report, ReportEngine, ReportRequest};
pub use run::{Edge, Run, RunId};
