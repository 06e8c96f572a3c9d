//! Display formatting for terminal output
//!
//! Provides the colored stage lines, the export spinner, the remote archive
//! table, and human-readable sizes and durations.

pub mod console;
pub mod format;
pub mod remote;

pub use console::{failure_line, success_line, warning_line, ConsoleReporter};
pub use format::{format_age, format_duration, format_rate, format_size};
pub use remote::format_remote_archives;
