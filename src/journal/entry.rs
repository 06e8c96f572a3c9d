//! Run log line format

use std::fmt;

use chrono::{Local, NaiveDateTime};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const SEPARATOR: &str = "  ";

/// A single run log line: `<YYYY-MM-DD HH:MM:SS>  <message>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Local wall-clock time of the event
    pub timestamp: NaiveDateTime,
    pub message: String,
}

impl LogEntry {
    /// Create an entry stamped with the current local time
    pub fn now(message: impl Into<String>) -> Self {
        Self::at(Local::now().naive_local(), message)
    }

    /// Create an entry with an explicit timestamp
    ///
    /// Line breaks in the message are flattened so one entry stays one line.
    pub fn at(timestamp: NaiveDateTime, message: impl Into<String>) -> Self {
        let message: String = message.into();
        let message = message
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Self { timestamp, message }
    }

    /// Parse a line written by [`LogEntry`]'s `Display` impl
    pub fn parse(line: &str) -> Option<Self> {
        let (stamp, message) = line.split_once(SEPARATOR)?;
        let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
        Some(Self {
            timestamp,
            message: message.to_string(),
        })
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            SEPARATOR,
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(2, 0, 1)
            .unwrap()
    }

    #[test]
    fn test_display_format() {
        let entry = LogEntry::at(stamp(), "Backup started");
        assert_eq!(entry.to_string(), "2026-10-16 02:00:01  Backup started");
    }

    #[test]
    fn test_parse_line() {
        let entry = LogEntry::parse("2026-10-16 02:00:01  Export failed: exit code 1").unwrap();
        assert_eq!(entry.timestamp, stamp());
        assert_eq!(entry.message, "Export failed: exit code 1");
    }

    #[test]
    fn test_parse_rejects_foreign_lines() {
        assert!(LogEntry::parse("not a log line").is_none());
        assert!(LogEntry::parse("yesterday  something").is_none());
    }

    #[test]
    fn test_multiline_message_is_flattened() {
        let entry = LogEntry::at(stamp(), "zstd failed:\n  corrupted block\n");
        assert_eq!(entry.message, "zstd failed: corrupted block");
    }
}
