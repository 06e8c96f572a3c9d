//! Archive naming and local archive discovery
//!
//! Every run produces `<distro>-<YYYYMMDD-HHMMSS>.tar` from the export, which
//! the compressor turns into `<distro>-<YYYYMMDD-HHMMSS>.tar.zst.unverified`.
//! Only once the remote copy is verified is it renamed to the plain
//! `.tar.zst` archive name. The timestamp embedded in the name is what orders
//! remote archives.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};

/// Suffix of every compressed archive
pub const ARCHIVE_SUFFIX: &str = ".tar.zst";

/// Suffix of the transient raw export
pub const RAW_SUFFIX: &str = ".tar";

/// Suffix of a compressed archive whose remote copy isn't verified yet
pub const UNVERIFIED_SUFFIX: &str = ".tar.zst.unverified";

const STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Which stage of a run left a file behind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Raw export, not yet compressed
    Raw,
    /// Compressed, remote copy not verified
    Unverified,
    /// Verified archive
    Archive,
}

impl ArtifactKind {
    fn suffix(self) -> &'static str {
        match self {
            ArtifactKind::Raw => RAW_SUFFIX,
            ArtifactKind::Unverified => UNVERIFIED_SUFFIX,
            ArtifactKind::Archive => ARCHIVE_SUFFIX,
        }
    }
}

/// Identity of one snapshot: which distro, and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveName {
    pub distro: String,
    pub timestamp: NaiveDateTime,
}

impl ArchiveName {
    pub fn new(distro: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            distro: distro.into(),
            timestamp,
        }
    }

    fn stem(&self) -> String {
        format!("{}-{}", self.distro, self.timestamp.format(STAMP_FORMAT))
    }

    /// File name of the raw export artifact
    pub fn raw_file_name(&self) -> String {
        format!("{}{}", self.stem(), RAW_SUFFIX)
    }

    /// File name of the compressed archive
    pub fn archive_file_name(&self) -> String {
        format!("{}{}", self.stem(), ARCHIVE_SUFFIX)
    }

    /// File name of the compressed archive before verification
    pub fn unverified_file_name(&self) -> String {
        format!("{}{}", self.stem(), UNVERIFIED_SUFFIX)
    }

    /// Parse a verified archive name, `<distro>-<YYYYMMDD>-<HHMMSS>.tar.zst`
    pub fn parse(file_name: &str) -> Option<Self> {
        match Self::parse_artifact(file_name)? {
            (name, ArtifactKind::Archive) => Some(name),
            _ => None,
        }
    }

    /// Parse any file a run produces, telling which kind it is
    ///
    /// Distro names may themselves contain dashes, so the timestamp is taken
    /// from the right.
    pub fn parse_artifact(file_name: &str) -> Option<(Self, ArtifactKind)> {
        let kind = [
            ArtifactKind::Unverified,
            ArtifactKind::Archive,
            ArtifactKind::Raw,
        ]
        .into_iter()
        .find(|kind| file_name.ends_with(kind.suffix()))?;
        let stem = file_name.strip_suffix(kind.suffix())?;

        let mut parts = stem.rsplitn(3, '-');
        let time_part = parts.next()?;
        let date_part = parts.next()?;
        let distro = parts.next()?;

        if distro.is_empty() || date_part.len() != 8 || time_part.len() != 6 {
            return None;
        }

        let timestamp =
            NaiveDateTime::parse_from_str(&format!("{}-{}", date_part, time_part), STAMP_FORMAT)
                .ok()?;

        Some((Self::new(distro, timestamp), kind))
    }
}

/// A snapshot that made it through the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupArchive {
    pub name: ArchiveName,
    /// Compressed archive on local disk
    pub local_path: PathBuf,
    /// Object path at the remote, `remote:path/<file>`
    pub remote_path: String,
    /// Size of the raw export in bytes
    pub raw_size: u64,
    /// Size of the compressed archive in bytes
    pub compressed_size: u64,
    /// MD5 digest, equal locally and remotely
    pub digest: String,
}

impl BackupArchive {
    pub fn file_name(&self) -> String {
        self.name.archive_file_name()
    }
}

/// `raw / compressed`, rounded to two decimals; 0.0 when nothing was compressed
pub fn compression_ratio(raw_size: u64, compressed_size: u64) -> f64 {
    if compressed_size == 0 {
        return 0.0;
    }
    let ratio = raw_size as f64 / compressed_size as f64;
    (ratio * 100.0).round() / 100.0
}

/// An archive file found in the backup directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalArchive {
    /// Archive filename
    pub file_name: String,
    /// Full path to the archive
    pub path: PathBuf,
    /// File modification time
    pub modified: DateTime<Utc>,
    /// Size in bytes
    pub size_bytes: u64,
}

/// List the verified archives directly inside `dir`, newest first
///
/// A missing directory simply has no archives. Raw exports and unverified
/// archives are not listed.
pub fn list_local_archives(dir: &Path) -> VaultResult<Vec<LocalArchive>> {
    scan(dir, |name| name.ends_with(ARCHIVE_SUFFIX))
}

/// List raw exports and unverified archives left by failed runs, newest first
pub fn list_leftovers(dir: &Path) -> VaultResult<Vec<LocalArchive>> {
    scan(dir, |name| {
        matches!(
            ArchiveName::parse_artifact(name),
            Some((_, ArtifactKind::Raw | ArtifactKind::Unverified))
        )
    })
}

fn scan(dir: &Path, wanted: impl Fn(&str) -> bool) -> VaultResult<Vec<LocalArchive>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut archives = Vec::new();

    for entry in fs::read_dir(dir).map_err(|e| {
        VaultError::Io(format!("Failed to read backup directory: {}", e))
    })? {
        let entry = entry
            .map_err(|e| VaultError::Io(format!("Failed to read directory entry: {}", e)))?;

        let file_name = entry.file_name().to_string_lossy().to_string();
        if !wanted(&file_name) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => continue,
        };

        let modified = metadata
            .modified()
            .map_err(|e| VaultError::Io(format!("Failed to read modification time: {}", e)))?;

        archives.push(LocalArchive {
            file_name,
            path: entry.path(),
            modified: DateTime::<Utc>::from(modified),
            size_bytes: metadata.len(),
        });
    }

    archives.sort_by(|a, b| b.modified.cmp(&a.modified));

    Ok(archives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate, Timelike};
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 15)
            .unwrap()
            .and_hms_opt(2, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_file_names() {
        let name = ArchiveName::new("Ubuntu", stamp());
        assert_eq!(name.raw_file_name(), "Ubuntu-20261015-020000.tar");
        assert_eq!(name.archive_file_name(), "Ubuntu-20261015-020000.tar.zst");
    }

    #[test]
    fn test_parse_archive_name() {
        let name = ArchiveName::parse("Ubuntu-22.04-20261015-020000.tar.zst").unwrap();
        assert_eq!(name.distro, "Ubuntu-22.04");
        assert_eq!(name.timestamp.year(), 2026);
        assert_eq!(name.timestamp.month(), 10);
        assert_eq!(name.timestamp.day(), 15);
        assert_eq!(name.timestamp.hour(), 2);
    }

    #[test]
    fn test_parse_rejects_other_files() {
        assert!(ArchiveName::parse("Ubuntu-20261015-020000.tar").is_none());
        assert!(ArchiveName::parse("notes.tar.zst").is_none());
        assert!(ArchiveName::parse("-20261015-020000.tar.zst").is_none());
        assert!(ArchiveName::parse("Ubuntu-20261399-020000.tar.zst").is_none());
    }

    #[test]
    fn test_parse_artifact_kinds() {
        let (name, kind) = ArchiveName::parse_artifact("Ubuntu-20261015-020000.tar").unwrap();
        assert_eq!(kind, ArtifactKind::Raw);
        assert_eq!(name.distro, "Ubuntu");

        let (_, kind) =
            ArchiveName::parse_artifact("Ubuntu-20261015-020000.tar.zst.unverified").unwrap();
        assert_eq!(kind, ArtifactKind::Unverified);

        let (_, kind) = ArchiveName::parse_artifact("Ubuntu-20261015-020000.tar.zst").unwrap();
        assert_eq!(kind, ArtifactKind::Archive);

        assert!(ArchiveName::parse("Ubuntu-20261015-020000.tar.zst.unverified").is_none());
        assert_eq!(
            ArchiveName::new("Ubuntu", stamp()).unverified_file_name(),
            "Ubuntu-20261015-020000.tar.zst.unverified"
        );
    }

    #[test]
    fn test_unverified_archives_not_listed() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("Ubuntu-20261015-020000.tar.zst"), b"ok").unwrap();
        fs::write(
            temp_dir.path().join("Ubuntu-20261016-020000.tar.zst.unverified"),
            b"pending",
        )
        .unwrap();
        fs::write(temp_dir.path().join("Ubuntu-20261016-010000.tar"), b"raw").unwrap();
        fs::write(temp_dir.path().join("notes.tar"), b"unrelated").unwrap();

        let archives = list_local_archives(temp_dir.path()).unwrap();
        assert_eq!(archives.len(), 1);
        assert_eq!(archives[0].file_name, "Ubuntu-20261015-020000.tar.zst");

        let mut leftovers: Vec<_> = list_leftovers(temp_dir.path())
            .unwrap()
            .into_iter()
            .map(|a| a.file_name)
            .collect();
        leftovers.sort();
        assert_eq!(
            leftovers,
            vec![
                "Ubuntu-20261016-010000.tar".to_string(),
                "Ubuntu-20261016-020000.tar.zst.unverified".to_string(),
            ]
        );
    }

    #[test]
    fn test_compression_ratio() {
        const MB: u64 = 1024 * 1024;
        assert_eq!(compression_ratio(4500 * MB, 1500 * MB), 3.0);
        assert_eq!(format!("{:.2}x", compression_ratio(4500 * MB, 1500 * MB)), "3.00x");
        assert_eq!(compression_ratio(1000, 3), 333.33);
        assert_eq!(compression_ratio(10, 0), 0.0);
    }

    #[test]
    fn test_list_local_archives_newest_first() {
        let temp_dir = TempDir::new().unwrap();
        let now = SystemTime::now();

        for (name, age_hours) in [("old.tar.zst", 48), ("new.tar.zst", 1), ("mid.tar.zst", 24)] {
            let path = temp_dir.path().join(name);
            fs::write(&path, b"data").unwrap();
            let file = fs::File::options().write(true).open(&path).unwrap();
            file.set_modified(now - Duration::from_secs(age_hours * 3600))
                .unwrap();
        }
        fs::write(temp_dir.path().join("backup.log"), b"log").unwrap();
        fs::write(temp_dir.path().join("Ubuntu-20261015-020000.tar"), b"raw").unwrap();

        let archives = list_local_archives(temp_dir.path()).unwrap();
        let names: Vec<_> = archives.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, vec!["new.tar.zst", "mid.tar.zst", "old.tar.zst"]);
        assert_eq!(archives[0].size_bytes, 4);
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let archives = list_local_archives(&temp_dir.path().join("nope")).unwrap();
        assert!(archives.is_empty());
    }
}
