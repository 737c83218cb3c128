//! Asynchronous test-case execution engine
//!
//! Runs unit tests whose fixture phases may complete later on an event
//! loop. Each test goes through setUp, the body, registered cleanups and
//! tearDown under a per-phase timeout, and every outcome is reported to a
//! [`ResultSink`](results::ResultSink).
//!
//! ```no_run
//! use async_trial::case::{Action, TestCase};
//! use async_trial::config::RunnerConfig;
//! use async_trial::executor::run_suite;
//!
//! let summary = run_suite(
//!     RunnerConfig::default(),
//!     vec![TestCase::new("test_ok", Action::noop())],
//! )?;
//! assert!(summary.was_successful());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod case;
pub mod config;
pub mod demos;
pub mod executor;
pub mod models;
pub mod output;
pub mod reactor;
pub mod results;
pub mod utils;

pub use case::{Action, TestCase, TestContext};
pub use config::RunnerConfig;
pub use executor::{run_suite, PendingResult, TestRunner};
pub use models::{Failure, FailureKind, RunSummary, Todo};
pub use results::{RecordingSink, ResultSink};
