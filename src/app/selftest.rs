//! End-to-end check of every query operation against a live table.
//!
//! Each check calls one public operation and compares the envelope's
//! `success` flag with what the input should produce: the happy paths must
//! succeed and the invalid inputs (zero limit, out-of-range coordinates,
//! malformed or inverted dates) must come back as `success = false`.

use std::{
    sync::LazyLock,
    time::{Duration, Instant}
};

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    envelope::Envelope,
    output::{OutputFormat, OutputOptions, banner, heading},
    service::OceanDataQuery
};

/// Result of one check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckOutcome {
    pub name:             String,
    pub expected_success: bool,
    pub success:          bool,
    pub message:          String,
    pub returned:         Option<usize>,
    pub elapsed_ms:       u128
}

impl CheckOutcome {
    pub fn new<T: Serialize>(name: &str, expected_success: bool, envelope: &Envelope<T>, elapsed: Duration) -> Self {
        let returned = serde_json::to_value(&envelope.data)
            .ok()
            .and_then(|v| v.as_array().map(Vec::len));
        Self {
            name: name.to_string(),
            expected_success,
            success: envelope.success,
            message: envelope.message.clone(),
            returned,
            elapsed_ms: elapsed.as_millis()
        }
    }

    pub fn passed(&self) -> bool {
        self.success == self.expected_success
    }
}

/// All check outcomes in run order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelfTestReport {
    pub table:  String,
    pub checks: Vec<CheckOutcome>
}

impl SelfTestReport {
    pub fn failed(&self) -> usize {
        self.checks.iter().filter(|c| !c.passed()).count()
    }

    pub fn passed(&self) -> bool {
        self.failed() == 0
    }

    /// `0` when every check behaved as expected
    pub fn exit_code(&self) -> i32 {
        if self.passed() { 0 } else { 1 }
    }
}

macro_rules! check {
    ($report:expr, $name:expr, $expect:expr, $call:expr) => {{
        let started = Instant::now();
        let envelope = $call.await;
        $report
            .checks
            .push(CheckOutcome::new($name, $expect, &envelope, started.elapsed()));
    }};
}

static CALENDAR_DAY: LazyLock<NaiveDate> =
    LazyLock::new(|| NaiveDate::from_ymd_opt(2019, 1, 29).expect("valid date"));

/// Run every check in order
pub async fn run_selftest(service: &OceanDataQuery) -> SelfTestReport {
    let mut report = SelfTestReport {
        table:  service.table_name().to_string(),
        checks: Vec::new()
    };

    check!(report, "Sample data (5 records)", true, service.get_sample_data(5));
    check!(report, "Sample data (1 record)", true, service.get_sample_data(1));
    check!(report, "Sample data (invalid limit)", false, service.get_sample_data(0));

    check!(report, "Total data count", true, service.get_data_count());

    check!(
        report,
        "Location (Indian Ocean)",
        true,
        service.query_by_location((-10.0, 10.0), (60.0, 80.0), 5)
    );
    check!(
        report,
        "Location (smaller region)",
        true,
        service.query_by_location((0.0, 5.0), (63.0, 65.0), 3)
    );
    check!(
        report,
        "Location (invalid latitude)",
        false,
        service.query_by_location((-100.0, 100.0), (60.0, 80.0), 5)
    );
    check!(
        report,
        "Location (invalid longitude)",
        false,
        service.query_by_location((-10.0, 10.0), (-200.0, 200.0), 5)
    );

    check!(
        report,
        "Date range (text dates)",
        true,
        service.query_by_date_range("2019-01-29", "2019-01-30", 5)
    );
    check!(
        report,
        "Date range (calendar dates)",
        true,
        service.query_by_date_range(*CALENDAR_DAY, *CALENDAR_DAY, 3)
    );
    check!(
        report,
        "Date range (invalid format)",
        false,
        service.query_by_date_range("2019/01/29", "2019-01-30", 5)
    );
    check!(
        report,
        "Date range (start after end)",
        false,
        service.query_by_date_range("2019-01-30", "2019-01-29", 5)
    );

    check!(report, "Data summary", true, service.get_data_summary());

    check!(report, "Timing (100 sample records)", true, service.get_sample_data(100));
    check!(
        report,
        "Timing (location, up to 1,000 records)",
        true,
        service.query_by_location((-20.0, 20.0), (50.0, 90.0), 1000)
    );

    report
}

/// Format a self-test report
pub fn format_selftest_report(report: &SelfTestReport, opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Json => return serde_json::to_string_pretty(report).unwrap_or_default(),
        OutputFormat::Yaml => return serde_yaml::to_string(report).unwrap_or_default(),
        OutputFormat::Text => {}
    }

    let mut output = heading(&format!("Self-test against '{}'", report.table), opts);
    for check in &report.checks {
        let expectation = if check.expected_success { "expected success" } else { "expected failure" };
        let mut line = format!("{} ({}, {} ms): {}", check.name, expectation, check.elapsed_ms, check.message);
        if let Some(n) = check.returned
            && check.success
        {
            line.push_str(&format!(" [{} rows]", n));
        }
        output.push_str(&banner(check.passed(), &line, opts.colored));
        output.push('\n');
    }
    output.push('\n');
    let summary = format!(
        "{} of {} checks behaved as expected",
        report.checks.len() - report.failed(),
        report.checks.len()
    );
    output.push_str(&banner(report.passed(), &summary, opts.colored));
    output.push('\n');
    output
}
