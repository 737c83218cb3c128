//! Output formatting module
//!
//! Renders run summaries for the command line.

mod formatter;

pub use formatter::{OutputFormat, ResultFormatter};
