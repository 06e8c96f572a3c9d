//! Run log for wsl-vault
//!
//! Every significant lifecycle event of a run (start, stage failure,
//! completion, retention deletions) is appended to a plain-text log in the
//! backup directory, one line per event:
//!
//! ```text
//! 2026-10-16 02:00:01  Backup started: run 3f2c9a1e
//! 2026-10-16 02:00:01  Distro: Ubuntu
//! 2026-10-16 02:31:46  Retention: deleted /srv/wsl/Ubuntu-20261009-020001.tar.zst
//! ```
//!
//! # Architecture
//!
//! - `LogEntry`: one timestamped line, with parsing for reading the log back
//! - `RunLog`: opens, appends, flushes and closes the file for every entry, so
//!   nothing is lost when a stage fails and the run returns early

mod entry;
mod logger;

pub use entry::LogEntry;
pub use logger::RunLog;
