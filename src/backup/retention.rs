//! Retention enforcement
//!
//! Local and remote copies age out independently:
//! - local archives by file modification time, one file at a time
//! - remote archives through the remote tool's own age filter, in one call

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{VaultError, VaultResult};
use crate::tools::RemoteStore;

use super::archive::{list_leftovers, list_local_archives, LocalArchive};

/// Retention windows per storage tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Days to keep local archives
    pub local_days: u32,
    /// Days to keep remote archives
    pub cloud_days: u32,
}

/// Outcome of the local sweep
#[derive(Debug, Default)]
pub struct LocalSweep {
    /// Archives removed
    pub deleted: Vec<PathBuf>,
    /// Archives that should have been removed but couldn't be, with the reason
    pub skipped: Vec<(PathBuf, String)>,
    /// Archives still inside the window
    pub kept: usize,
}

/// Outcome of both sweeps
#[derive(Debug, Default)]
pub struct RetentionReport {
    pub local: LocalSweep,
    /// Set when the remote age filter could not be applied
    pub cloud_error: Option<String>,
}

impl RetentionReport {
    /// Whether anything needs the operator's attention
    pub fn has_warnings(&self) -> bool {
        !self.local.skipped.is_empty() || self.cloud_error.is_some()
    }
}

/// Applies a [`RetentionPolicy`] to the backup directory and the remote
pub struct RetentionEnforcer<'a> {
    backup_dir: &'a Path,
    remote: &'a dyn RemoteStore,
    location: &'a str,
    policy: RetentionPolicy,
}

impl<'a> RetentionEnforcer<'a> {
    pub fn new(
        backup_dir: &'a Path,
        remote: &'a dyn RemoteStore,
        location: &'a str,
        policy: RetentionPolicy,
    ) -> Self {
        Self {
            backup_dir,
            remote,
            location,
            policy,
        }
    }

    /// Run both sweeps
    ///
    /// A failing cloud sweep is reported in the result, not as an error: by
    /// the time retention runs the new archive is already verified.
    pub fn enforce(&self) -> VaultResult<RetentionReport> {
        let local = self.sweep_local_at(Utc::now())?;

        let cloud_error = match self.sweep_cloud() {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "cloud retention sweep failed");
                Some(e.to_string())
            }
        };

        Ok(RetentionReport { local, cloud_error })
    }

    /// Delete local archives strictly older than the local window, as of `now`
    ///
    /// Raw exports and unverified archives left by failed runs age out on the
    /// same window but never count as kept. Files that can't be deleted are
    /// skipped and reported.
    pub fn sweep_local_at(&self, now: DateTime<Utc>) -> VaultResult<LocalSweep> {
        let cutoff = now - Duration::days(i64::from(self.policy.local_days));
        let mut sweep = LocalSweep::default();

        for archive in list_local_archives(self.backup_dir)? {
            if archive.modified >= cutoff {
                sweep.kept += 1;
                continue;
            }
            delete_expired(archive, &mut sweep);
        }

        for leftover in list_leftovers(self.backup_dir)? {
            if leftover.modified < cutoff {
                delete_expired(leftover, &mut sweep);
            }
        }

        Ok(sweep)
    }

    /// Delete remote objects older than the cloud window
    pub fn sweep_cloud(&self) -> VaultResult<()> {
        self.remote
            .delete_older_than(self.location, self.policy.cloud_days)
            .map_err(|e| VaultError::ToolFailed {
                tool: "rclone",
                message: format!("age-filtered delete on {}: {}", self.location, e),
            })
    }
}

fn delete_expired(file: LocalArchive, sweep: &mut LocalSweep) {
    match fs::remove_file(&file.path) {
        Ok(()) => {
            info!(file = %file.file_name, "deleted expired local file");
            sweep.deleted.push(file.path);
        }
        Err(e) => {
            warn!(file = %file.file_name, error = %e, "could not delete expired file");
            sweep.skipped.push((file.path, e.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::fake::FakeRemote;
    use std::time::SystemTime;
    use tempfile::TempDir;

    const POLICY: RetentionPolicy = RetentionPolicy {
        local_days: 7,
        cloud_days: 30,
    };

    fn archive_aged(dir: &Path, name: &str, now: SystemTime, age: std::time::Duration) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"archive").unwrap();
        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(now - age).unwrap();
        path
    }

    const DAY: std::time::Duration = std::time::Duration::from_secs(24 * 3600);
    const HOUR: std::time::Duration = std::time::Duration::from_secs(3600);

    #[test]
    fn test_local_sweep_respects_window() {
        let temp_dir = TempDir::new().unwrap();
        let now = SystemTime::now();

        let fresh = archive_aged(temp_dir.path(), "fresh.tar.zst", now, DAY);
        let edge = archive_aged(temp_dir.path(), "edge.tar.zst", now, 7 * DAY - HOUR);
        let stale = archive_aged(temp_dir.path(), "stale.tar.zst", now, 7 * DAY + HOUR);
        let ancient = archive_aged(temp_dir.path(), "ancient.tar.zst", now, 90 * DAY);
        let log = temp_dir.path().join("backup.log");
        fs::write(&log, b"log").unwrap();

        let remote = FakeRemote::default();
        let enforcer = RetentionEnforcer::new(temp_dir.path(), &remote, "gdrive:wsl", POLICY);
        let sweep = enforcer.sweep_local_at(DateTime::<Utc>::from(now)).unwrap();

        assert_eq!(sweep.deleted.len(), 2);
        assert_eq!(sweep.kept, 2);
        assert!(fresh.exists());
        assert!(edge.exists());
        assert!(!stale.exists());
        assert!(!ancient.exists());
        assert!(log.exists());
    }

    #[test]
    fn test_leftovers_expire_but_are_never_kept() {
        let temp_dir = TempDir::new().unwrap();
        let now = SystemTime::now();

        let old_raw = archive_aged(temp_dir.path(), "Ubuntu-20260901-020000.tar", now, 20 * DAY);
        let old_unverified = archive_aged(
            temp_dir.path(),
            "Ubuntu-20260902-020000.tar.zst.unverified",
            now,
            20 * DAY,
        );
        let recent_unverified = archive_aged(
            temp_dir.path(),
            "Ubuntu-20261015-020000.tar.zst.unverified",
            now,
            DAY,
        );
        let verified = archive_aged(temp_dir.path(), "Ubuntu-20261014-020000.tar.zst", now, DAY);

        let remote = FakeRemote::default();
        let enforcer = RetentionEnforcer::new(temp_dir.path(), &remote, "gdrive:wsl", POLICY);
        let sweep = enforcer.sweep_local_at(DateTime::<Utc>::from(now)).unwrap();

        assert_eq!(sweep.kept, 1);
        assert_eq!(sweep.deleted.len(), 2);
        assert!(!old_raw.exists());
        assert!(!old_unverified.exists());
        assert!(recent_unverified.exists());
        assert!(verified.exists());
    }

    #[test]
    fn test_stale_archive_deleted_on_a_later_run() {
        let temp_dir = TempDir::new().unwrap();
        let now = SystemTime::now();
        let archive = archive_aged(temp_dir.path(), "a.tar.zst", now, 6 * DAY);

        let remote = FakeRemote::default();
        let enforcer = RetentionEnforcer::new(temp_dir.path(), &remote, "gdrive:wsl", POLICY);

        enforcer.sweep_local_at(DateTime::<Utc>::from(now)).unwrap();
        assert!(archive.exists());

        let two_days_later = DateTime::<Utc>::from(now + 2 * DAY);
        let sweep = enforcer.sweep_local_at(two_days_later).unwrap();
        assert_eq!(sweep.deleted, vec![archive.clone()]);
        assert!(!archive.exists());
    }

    #[test]
    fn test_cloud_sweep_delegates_age_filter() {
        let temp_dir = TempDir::new().unwrap();
        let remote = FakeRemote::default();
        let enforcer = RetentionEnforcer::new(temp_dir.path(), &remote, "gdrive:wsl", POLICY);

        let report = enforcer.enforce().unwrap();
        assert!(!report.has_warnings());
        assert_eq!(
            *remote.age_deletes.borrow(),
            vec![("gdrive:wsl".to_string(), 30)]
        );
    }

    #[test]
    fn test_cloud_sweep_failure_is_a_warning() {
        let temp_dir = TempDir::new().unwrap();
        let remote = FakeRemote {
            fail_delete: true,
            ..FakeRemote::default()
        };
        let enforcer = RetentionEnforcer::new(temp_dir.path(), &remote, "gdrive:wsl", POLICY);

        let report = enforcer.enforce().unwrap();
        assert!(report.has_warnings());
        assert!(report.cloud_error.is_some());
    }
}
