//! Test execution engine
//!
//! Pending results, per-phase timeouts, the fixture sequence and the
//! blocking bridge that drives the event loop for each test.

mod bridge;
mod cleanup;
mod pending;
mod phase;
mod runner;
mod sequencer;
mod timeout;

pub use bridge::BlockingBridge;
pub use cleanup::{CleanupAction, CleanupStack};
pub use pending::{Chained, Outcome, PendingResult};
pub use phase::PhaseRunner;
pub use runner::{run_suite, TestRunner};
pub use sequencer::{classify, PhaseSequencer, SequenceState, Verdict};
pub use timeout::{TimeoutFlag, TimeoutGuard};
