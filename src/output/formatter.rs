//! Output formatters for run summaries
//!
//! Provides table, JSON and one-line summary output.

use crate::models::{RunSummary, TestOutcome, TestRecord};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Format a single record
    pub fn format_record(&self, record: &TestRecord) -> String {
        let label = format!("{} {}", record.outcome.symbol(), record.outcome);
        let status = match (self.colorize, record.outcome) {
            (false, _) => label,
            (true, TestOutcome::Passed) => format!("\x1b[32m{label}\x1b[0m"),
            (true, TestOutcome::Skipped | TestOutcome::ExpectedFailure) => {
                format!("\x1b[33m{label}\x1b[0m")
            }
            (true, _) => format!("\x1b[31m{label}\x1b[0m"),
        };

        match &record.message {
            Some(message) => format!("{:32} {} {}", record.test, status, message),
            None => format!("{:32} {}", record.test, status),
        }
    }

    /// Format a run summary
    pub fn format_summary(&self, summary: &RunSummary) -> String {
        match self.format {
            OutputFormat::Table => self.format_summary_table(summary),
            OutputFormat::Json => serde_json::to_string(summary).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(summary).unwrap_or_default(),
            OutputFormat::Summary => self.format_summary_brief(summary),
        }
    }

    fn format_summary_table(&self, summary: &RunSummary) -> String {
        let mut output = String::new();

        output.push_str("\n╔══════════════════════════════════════════════════════════════╗\n");
        output.push_str(&format!(
            "║  Run started {:48} ║\n",
            summary.started_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
        ));
        output.push_str("╚══════════════════════════════════════════════════════════════╝\n");

        for record in &summary.records {
            output.push_str(&format!("  {}\n", self.format_record(record)));
        }

        output.push_str("────────────────────────────────────────────────────────────────\n");
        output.push_str(&format!(
            "  Ran: {} | Pass: {} | Fail: {} | Error: {} | Skip: {}\n",
            summary.tests_run, summary.passed, summary.failed, summary.errors, summary.skipped
        ));
        output.push_str(&format!(
            "  Expected failures: {} | Unexpected successes: {}\n",
            summary.expected_failures, summary.unexpected_successes
        ));
        output.push_str(&format!("  {}\n", self.format_summary_brief(summary)));

        output
    }

    fn format_summary_brief(&self, summary: &RunSummary) -> String {
        let verdict = match (summary.was_successful(), self.colorize) {
            (true, true) => "\x1b[32mPASSED\x1b[0m",
            (true, false) => "PASSED",
            (false, true) => "\x1b[31mFAILED\x1b[0m",
            (false, false) => "FAILED",
        };
        let stopped = if summary.stopped { " (stopped early)" } else { "" };

        format!(
            "{} - {} test(s) in {}ms{}",
            verdict, summary.tests_run, summary.total_duration_ms, stopped
        )
    }
}
