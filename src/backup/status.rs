//! Freshness check for the `status` command

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};

use crate::error::VaultResult;

use super::archive::{list_local_archives, LocalArchive};

/// Age past which the newest local archive counts as overdue
pub const OVERDUE_AFTER_HOURS: i64 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Overdue,
}

impl Freshness {
    pub fn for_age(age: Duration) -> Self {
        if age > Duration::hours(OVERDUE_AFTER_HOURS) {
            Freshness::Overdue
        } else {
            Freshness::Fresh
        }
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Freshness::Fresh => write!(f, "FRESH"),
            Freshness::Overdue => write!(f, "OVERDUE"),
        }
    }
}

/// What `status` found in the backup directory
#[derive(Debug)]
pub enum BackupStatus {
    /// No archives at all
    Empty,
    Latest {
        archive: LocalArchive,
        age: Duration,
        freshness: Freshness,
    },
}

/// Inspect the newest local archive as of `now`
pub fn check_status(backup_dir: &Path, now: DateTime<Utc>) -> VaultResult<BackupStatus> {
    let Some(archive) = list_local_archives(backup_dir)?.into_iter().next() else {
        return Ok(BackupStatus::Empty);
    };

    // Clock skew can put the mtime slightly in the future
    let age = (now - archive.modified).max(Duration::zero());
    Ok(BackupStatus::Latest {
        archive,
        age,
        freshness: Freshness::for_age(age),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn archive_aged(dir: &Path, name: &str, now: SystemTime, hours: u64) {
        let path = dir.join(name);
        fs::write(&path, b"archive").unwrap();
        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(now - std::time::Duration::from_secs(hours * 3600))
            .unwrap();
    }

    #[test]
    fn test_no_archives() {
        let temp_dir = TempDir::new().unwrap();
        let status = check_status(temp_dir.path(), Utc::now()).unwrap();
        assert!(matches!(status, BackupStatus::Empty));
    }

    #[test]
    fn test_overdue_after_26_hours() {
        let temp_dir = TempDir::new().unwrap();
        let now = SystemTime::now();
        archive_aged(temp_dir.path(), "Ubuntu-20261015-020000.tar.zst", now, 26);

        match check_status(temp_dir.path(), DateTime::<Utc>::from(now)).unwrap() {
            BackupStatus::Latest { freshness, age, .. } => {
                assert_eq!(freshness, Freshness::Overdue);
                assert_eq!(age.num_hours(), 26);
            }
            BackupStatus::Empty => panic!("expected an archive"),
        }
    }

    #[test]
    fn test_fresh_after_10_hours() {
        let temp_dir = TempDir::new().unwrap();
        let now = SystemTime::now();
        archive_aged(temp_dir.path(), "Ubuntu-20261014-020000.tar.zst", now, 40);
        archive_aged(temp_dir.path(), "Ubuntu-20261015-020000.tar.zst", now, 10);

        match check_status(temp_dir.path(), DateTime::<Utc>::from(now)).unwrap() {
            BackupStatus::Latest {
                archive, freshness, ..
            } => {
                assert_eq!(freshness, Freshness::Fresh);
                assert_eq!(archive.file_name, "Ubuntu-20261015-020000.tar.zst");
            }
            BackupStatus::Empty => panic!("expected an archive"),
        }
    }

    #[test]
    fn test_threshold_is_exclusive() {
        assert_eq!(Freshness::for_age(Duration::hours(25)), Freshness::Fresh);
        assert_eq!(
            Freshness::for_age(Duration::hours(25) + Duration::seconds(1)),
            Freshness::Overdue
        );
        assert_eq!(Freshness::Overdue.to_string(), "OVERDUE");
    }
}
