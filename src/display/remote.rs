//! Table of remote archives for `list-cloud`

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::backup::ArchiveName;
use crate::tools::RemoteEntry;

use super::format::format_size;

#[derive(Tabled)]
struct RemoteRow {
    #[tabled(rename = "Archive")]
    name: String,
    #[tabled(rename = "Distro")]
    distro: String,
    #[tabled(rename = "Taken")]
    taken: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Uploaded")]
    uploaded: String,
}

/// Render remote archives, newest first by embedded timestamp
///
/// Entries that aren't archives are left out.
pub fn format_remote_archives(entries: &[RemoteEntry]) -> String {
    let mut archives: Vec<(ArchiveName, &RemoteEntry)> = entries
        .iter()
        .filter_map(|e| ArchiveName::parse(&e.name).map(|n| (n, e)))
        .collect();

    if archives.is_empty() {
        return "No remote archives found.".to_string();
    }

    archives.sort_by(|a, b| b.0.timestamp.cmp(&a.0.timestamp));

    let total: u64 = archives.iter().map(|(_, e)| e.size).sum();
    let count = archives.len();

    let rows = archives.into_iter().map(|(name, entry)| RemoteRow {
        name: entry.name.clone(),
        distro: name.distro,
        taken: name.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        size: format_size(entry.size),
        uploaded: entry
            .modified
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string()),
    });

    let mut table = Table::new(rows);
    table.with(Style::rounded());

    format!(
        "{}\nTotal: {} archive(s), {}",
        table,
        count,
        format_size(total)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(name: &str, size: u64) -> RemoteEntry {
        RemoteEntry {
            name: name.into(),
            size,
            modified: None,
        }
    }

    #[test]
    fn test_empty_listing() {
        assert_eq!(format_remote_archives(&[]), "No remote archives found.");
        assert_eq!(
            format_remote_archives(&[entry("readme.txt", 10)]),
            "No remote archives found."
        );
    }

    #[test]
    fn test_newest_first_with_total() {
        let output = format_remote_archives(&[
            entry("Ubuntu-20261014-020000.tar.zst", 1024),
            entry("Ubuntu-20261015-020000.tar.zst", 2048),
            entry("readme.txt", 10),
        ]);

        let newest = output.find("Ubuntu-20261015-020000.tar.zst").unwrap();
        let older = output.find("Ubuntu-20261014-020000.tar.zst").unwrap();
        assert!(newest < older);
        assert!(!output.contains("readme.txt"));
        assert!(output.contains("2026-10-15 02:00:00"));
        assert!(output.ends_with("Total: 2 archive(s), 3.0 KB"));
    }

    #[test]
    fn test_upload_time_column() {
        let uploaded = RemoteEntry {
            modified: Some(Utc.with_ymd_and_hms(2026, 10, 15, 2, 41, 7).unwrap()),
            ..entry("Ubuntu-20261015-020000.tar.zst", 2048)
        };
        let output = format_remote_archives(&[uploaded]);

        assert!(output.contains("Uploaded"));
        assert!(output.contains("2026-10-15 02:41"));

        let output = format_remote_archives(&[entry("Ubuntu-20261015-020000.tar.zst", 2048)]);
        assert!(output.contains(" - "));
    }
}
