//! Result reporting
//!
//! The sink interface the engine reports into and an in-memory recorder.

mod sink;

pub use sink::{RecordingSink, ResultSink};
