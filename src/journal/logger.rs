//! Append-only run log writer

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{VaultError, VaultResult};

use super::entry::LogEntry;

/// Handles writing run events to the log file
///
/// The file is opened, appended to, flushed and closed for every entry; there
/// is no long-lived handle to lose on an early return.
#[derive(Debug, Clone)]
pub struct RunLog {
    /// Path to the log file
    log_path: PathBuf,
}

impl RunLog {
    /// Create a new RunLog that writes to the specified path
    pub fn new(log_path: PathBuf) -> Self {
        Self { log_path }
    }

    /// Append an entry
    pub fn log(&self, entry: &LogEntry) -> VaultResult<()> {
        if let Some(parent) = self.log_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                VaultError::Io(format!("Failed to create log directory: {}", e))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| VaultError::Io(format!("Failed to open run log: {}", e)))?;

        writeln!(file, "{}", entry)
            .map_err(|e| VaultError::Io(format!("Failed to write run log entry: {}", e)))?;

        file.flush()
            .map_err(|e| VaultError::Io(format!("Failed to flush run log: {}", e)))?;

        Ok(())
    }

    /// Append a message stamped now; a log that can't be written never fails a run
    pub fn note(&self, message: impl Into<String>) {
        let entry = LogEntry::now(message);
        if let Err(e) = self.log(&entry) {
            warn!(path = %self.log_path.display(), error = %e, "run log entry dropped");
        }
    }

    /// Read all entries, oldest first
    ///
    /// Lines that aren't in the log format are skipped.
    pub fn read_all(&self) -> VaultResult<Vec<LogEntry>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.log_path)
            .map_err(|e| VaultError::Io(format!("Failed to open run log: {}", e)))?;

        let mut entries = Vec::new();
        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| {
                VaultError::Io(format!("Failed to read run log line {}: {}", line_num + 1, e))
            })?;

            if let Some(entry) = LogEntry::parse(&line) {
                entries.push(entry);
            }
        }

        Ok(entries)
    }

    /// Read the most recent N entries from the log
    pub fn read_recent(&self, count: usize) -> VaultResult<Vec<LogEntry>> {
        let all_entries = self.read_all()?;
        let start = all_entries.len().saturating_sub(count);
        Ok(all_entries[start..].to_vec())
    }

    /// Get the path to the log file
    pub fn path(&self) -> &Path {
        &self.log_path
    }
}
