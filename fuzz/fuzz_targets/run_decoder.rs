#![no_main]

use desglose::report::{Length, ReportEngine, ReportRequest};
use desglose::run::Run;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Decoding may fail, but a decoded run must always produce a report
        if let Ok(run) = Run::from_json_str("fuzz", input) {
            let engine = ReportEngine::default();
            let report = engine.get_report(&run, None, &ReportRequest::new("excl_wt", Length::All));
            for row in report.symbols() {
                assert_eq!(row.len(), report.header().len());
            }
            let _ = engine.get_report(&run, Some(&run), &ReportRequest::default());
        }
    }
});
