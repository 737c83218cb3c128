//! Test outcome models
//!
//! Defines outcomes, the records a sink keeps, and run summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::FailureKind;

/// Terminal classification of a single record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
    Passed,
    Failed,
    Errored,
    Skipped,
    ExpectedFailure,
    UnexpectedSuccess,
}

impl TestOutcome {
    pub fn symbol(&self) -> &'static str {
        match self {
            TestOutcome::Passed => "✓",
            TestOutcome::Failed => "✗",
            TestOutcome::Errored => "!",
            TestOutcome::Skipped => "○",
            TestOutcome::ExpectedFailure => "x",
            TestOutcome::UnexpectedSuccess => "u",
        }
    }

    /// Outcomes that make a run unsuccessful
    pub fn is_problem(&self) -> bool {
        matches!(
            self,
            TestOutcome::Failed | TestOutcome::Errored | TestOutcome::UnexpectedSuccess
        )
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestOutcome::Passed => write!(f, "PASS"),
            TestOutcome::Failed => write!(f, "FAIL"),
            TestOutcome::Errored => write!(f, "ERROR"),
            TestOutcome::Skipped => write!(f, "SKIP"),
            TestOutcome::ExpectedFailure => write!(f, "TODO"),
            TestOutcome::UnexpectedSuccess => write!(f, "UNEXPECTED SUCCESS"),
        }
    }
}

/// One call received by a result sink
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestRecord {
    pub test: String,
    pub outcome: TestOutcome,
    pub kind: Option<FailureKind>,
    pub message: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl TestRecord {
    pub fn new(test: impl Into<String>, outcome: TestOutcome) -> Self {
        Self {
            test: test.into(),
            outcome,
            kind: None,
            message: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_kind(mut self, kind: FailureKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl fmt::Display for TestRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [{}]", self.outcome.symbol(), self.test, self.outcome)?;
        if let Some(msg) = &self.message {
            write!(f, " - {msg}")?;
        }
        Ok(())
    }
}

/// Summary of a whole run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub tests_run: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub skipped: usize,
    pub expected_failures: usize,
    pub unexpected_successes: usize,
    pub stopped: bool,
    pub total_duration_ms: u64,
    pub records: Vec<TestRecord>,
}

impl RunSummary {
    pub fn new(
        started_at: DateTime<Utc>,
        tests_run: usize,
        records: Vec<TestRecord>,
        total_duration_ms: u64,
    ) -> Self {
        let count = |outcome: TestOutcome| records.iter().filter(|r| r.outcome == outcome).count();

        Self {
            started_at,
            tests_run,
            passed: count(TestOutcome::Passed),
            failed: count(TestOutcome::Failed),
            errors: count(TestOutcome::Errored),
            skipped: count(TestOutcome::Skipped),
            expected_failures: count(TestOutcome::ExpectedFailure),
            unexpected_successes: count(TestOutcome::UnexpectedSuccess),
            stopped: false,
            total_duration_ms,
            records,
        }
    }

    pub fn with_stopped(mut self, stopped: bool) -> Self {
        self.stopped = stopped;
        self
    }

    pub fn was_successful(&self) -> bool {
        self.failed == 0 && self.errors == 0 && self.unexpected_successes == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run started {}", self.started_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for record in &self.records {
            writeln!(f, "  {record}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Ran {} | Pass: {} | Fail: {} | Error: {} | Skip: {} | Todo: {} | Unexpected: {}",
            self.tests_run,
            self.passed,
            self.failed,
            self.errors,
            self.skipped,
            self.expected_failures,
            self.unexpected_successes
        )?;
        write!(
            f,
            "{} in {}ms",
            if self.was_successful() { "PASSED" } else { "FAILED" },
            self.total_duration_ms
        )?;
        if self.stopped {
            write!(f, " (stopped early)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display() {
        assert_eq!(TestOutcome::Passed.to_string(), "PASS");
        assert_eq!(TestOutcome::ExpectedFailure.to_string(), "TODO");
        assert!(TestOutcome::UnexpectedSuccess.is_problem());
        assert!(!TestOutcome::Skipped.is_problem());
    }

    #[test]
    fn test_record_display() {
        let record = TestRecord::new("test_fetch", TestOutcome::Errored)
            .with_kind(FailureKind::Timeout)
            .with_message("still running at 0.1 secs");
        assert_eq!(
            record.to_string(),
            "! test_fetch [ERROR] - still running at 0.1 secs"
        );
    }

    #[test]
    fn test_run_summary() {
        let records = vec![
            TestRecord::new("a", TestOutcome::Passed),
            TestRecord::new("b", TestOutcome::Failed),
            TestRecord::new("c", TestOutcome::Skipped),
            TestRecord::new("c", TestOutcome::Errored),
        ];

        let summary = RunSummary::new(Utc::now(), 3, records, 12);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errors, 1);
        assert!(!summary.was_successful());
        assert!(summary.to_string().contains("Ran 3"));
    }
}
