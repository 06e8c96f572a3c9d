//! Restore from the newest remote archive
//!
//! The restore walks a fixed sequence of states. Every transition is checked,
//! and any state may fall into `Failed`:
//!
//! ```text
//! Idle -> Locating -> Downloading -> Decompressing -> Importing -> Complete
//! ```
//!
//! The restored distribution is always imported under a new name,
//! `<distro>-restored`; an existing distribution is never overwritten.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{VaultError, VaultResult};
use crate::journal::RunLog;
use crate::tools::{RemoteEntry, Tools};

use super::archive::{ArchiveName, RAW_SUFFIX};
use super::export::remove_if_present;
use super::verify::Verifier;

/// Suffix appended to the source distro for the imported copy
pub const RESTORED_SUFFIX: &str = "-restored";

/// Progress of a restore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreState {
    Idle,
    Locating,
    Downloading,
    Decompressing,
    Importing,
    Complete,
    Failed,
}

impl RestoreState {
    /// Whether `next` may follow `self`
    pub fn can_transition_to(self, next: RestoreState) -> bool {
        use RestoreState::*;

        match (self, next) {
            (Complete | Failed, _) => false,
            (_, Failed) => true,
            (Idle, Locating)
            | (Locating, Downloading)
            | (Downloading, Decompressing)
            | (Decompressing, Importing)
            | (Importing, Complete) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RestoreState::Complete | RestoreState::Failed)
    }
}

impl fmt::Display for RestoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RestoreState::Idle => "Idle",
            RestoreState::Locating => "Locating",
            RestoreState::Downloading => "Downloading",
            RestoreState::Decompressing => "Decompressing",
            RestoreState::Importing => "Importing",
            RestoreState::Complete => "Complete",
            RestoreState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// The archive picked for restore
#[derive(Debug, Clone)]
pub struct RemoteArchive {
    pub name: ArchiveName,
    pub file_name: String,
    /// Size as listed by the remote
    pub size: u64,
}

/// Receives restore state changes
pub trait RestoreObserver {
    fn state_changed(&mut self, _state: RestoreState, _detail: &str) {}
    fn failed(&mut self, _state: RestoreState, _error: &VaultError) {}
}

/// Result of a finished restore
#[derive(Debug)]
pub struct RestoreOutcome {
    pub archive: RemoteArchive,
    /// Name the distribution was imported as
    pub restored_name: String,
    pub install_dir: PathBuf,
    /// Whether a complete local copy was reused instead of downloading
    pub reused_download: bool,
}

/// Pick `distro`'s archive with the greatest embedded timestamp
///
/// Entries whose names don't parse are ignored.
pub fn latest_archive(entries: &[RemoteEntry], distro: &str) -> Option<RemoteArchive> {
    entries
        .iter()
        .filter_map(|entry| {
            let name = ArchiveName::parse(&entry.name)?;
            if name.distro != distro {
                return None;
            }
            Some(RemoteArchive {
                name,
                file_name: entry.name.clone(),
                size: entry.size,
            })
        })
        .max_by(|a, b| a.name.timestamp.cmp(&b.name.timestamp))
}

/// Drives one restore through its states
pub struct RestoreOrchestrator<'a> {
    config: &'a Config,
    tools: Tools<'a>,
    log: &'a RunLog,
    state: RestoreState,
}

impl<'a> RestoreOrchestrator<'a> {
    pub fn new(config: &'a Config, tools: Tools<'a>, log: &'a RunLog) -> Self {
        Self {
            config,
            tools,
            log,
            state: RestoreState::Idle,
        }
    }

    pub fn state(&self) -> RestoreState {
        self.state
    }

    /// Restore the newest remote archive as a new distribution
    pub fn restore_latest(
        &mut self,
        observer: &mut dyn RestoreObserver,
    ) -> VaultResult<RestoreOutcome> {
        self.log.note("Restore started");

        match self.run(observer) {
            Ok(outcome) => {
                self.advance(RestoreState::Complete, observer, &outcome.restored_name)?;
                self.log.note(format!(
                    "Restore complete: {} imported as {}",
                    outcome.archive.file_name, outcome.restored_name
                ));
                Ok(outcome)
            }
            Err(e) => {
                let failed_in = self.state;
                observer.failed(failed_in, &e);
                self.state = RestoreState::Failed;
                self.log.note(format!(
                    "Restore failed while {} ({}): {}",
                    failed_in.to_string().to_lowercase(),
                    e.kind(),
                    e
                ));
                Err(e)
            }
        }
    }

    fn run(&mut self, observer: &mut dyn RestoreObserver) -> VaultResult<RestoreOutcome> {
        let config = self.config;
        self.advance(RestoreState::Locating, observer, &config.rclone_remote)?;
        let resolved = config.with_resolved_distro(self.tools.virtualizer)?;
        let archive = self.locate(&resolved.distro_name)?;
        info!(archive = %archive.file_name, "latest remote archive");

        self.advance(RestoreState::Downloading, observer, &archive.file_name)?;
        let (archive_path, reused_download) = self.download(&archive)?;

        self.advance(RestoreState::Decompressing, observer, &archive.file_name)?;
        let raw_path = self.decompress(&archive_path)?;

        let restored_name = format!("{}{}", archive.name.distro, RESTORED_SUFFIX);
        self.advance(RestoreState::Importing, observer, &restored_name)?;
        let install_dir = self.import(&restored_name, &raw_path)?;

        // The image is only discarded once the import has succeeded
        if let Err(e) = remove_if_present(&raw_path) {
            warn!(error = %e, "restored image left on disk");
        }

        Ok(RestoreOutcome {
            archive,
            restored_name,
            install_dir,
            reused_download,
        })
    }

    fn advance(
        &mut self,
        next: RestoreState,
        observer: &mut dyn RestoreObserver,
        detail: &str,
    ) -> VaultResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(VaultError::Io(format!(
                "invalid restore transition {} -> {}",
                self.state, next
            )));
        }
        info!(from = %self.state, to = %next, "restore state");
        self.state = next;
        observer.state_changed(next, detail);
        Ok(())
    }

    fn locate(&self, distro: &str) -> VaultResult<RemoteArchive> {
        let remote = &self.config.rclone_remote;
        let entries = self.tools.remote.list(remote)?;

        latest_archive(&entries, distro).ok_or_else(|| {
            VaultError::NoBackupFound(format!("no {} archives at {}", distro, remote))
        })
    }

    /// Fetch the archive into the restore staging directory and check its digest
    fn download(&self, archive: &RemoteArchive) -> VaultResult<(PathBuf, bool)> {
        let restore_dir = self.config.restore_dir();
        fs::create_dir_all(&restore_dir).map_err(|e| {
            VaultError::Io(format!(
                "Failed to create restore directory {}: {}",
                restore_dir.display(),
                e
            ))
        })?;

        let local = restore_dir.join(&archive.file_name);
        let remote_path = self.config.remote_path(&archive.file_name);

        // Only a complete earlier download is worth keeping
        let reused = fs::metadata(&local)
            .map(|m| m.is_file() && m.len() == archive.size)
            .unwrap_or(false);

        if reused {
            info!(path = %local.display(), "reusing complete local copy");
        } else {
            remove_if_present(&local)?;
            self.tools.remote.copy_from(&remote_path, &local)?;
        }

        Verifier::new(self.tools.remote).verify(&local, &remote_path)?;

        Ok((local, reused))
    }

    fn decompress(&self, archive_path: &Path) -> VaultResult<PathBuf> {
        let raw_path = raw_image_path(archive_path);
        remove_if_present(&raw_path)?;

        self.tools
            .codec
            .decompress(archive_path, &raw_path, false)
            .map_err(|e| VaultError::DecompressionFailed(e.to_string()))?;

        let size = fs::metadata(&raw_path).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(VaultError::DecompressionFailed(format!(
                "{} is missing or empty after decompression",
                raw_path.display()
            )));
        }

        Ok(raw_path)
    }

    fn import(&self, name: &str, image: &Path) -> VaultResult<PathBuf> {
        let virtualizer = self.tools.virtualizer;

        if virtualizer.list_distributions()?.iter().any(|d| d == name) {
            return Err(VaultError::DuplicateTarget(name.to_string()));
        }

        let install_dir = self.config.instances_dir().join(name);
        fs::create_dir_all(&install_dir).map_err(|e| {
            VaultError::Io(format!(
                "Failed to create install directory {}: {}",
                install_dir.display(),
                e
            ))
        })?;

        if let Err(e) = virtualizer.import(name, &install_dir, image) {
            // A failed import can still leave a half-registered distribution
            let registered = virtualizer
                .list_distributions()
                .map(|names| names.iter().any(|d| d == name))
                .unwrap_or(false);
            if registered {
                if let Err(unregister_err) = virtualizer.unregister(name) {
                    warn!(name, error = %unregister_err, "could not unregister failed import");
                }
            }
            return Err(VaultError::ImportFailed(e.to_string()));
        }

        Ok(install_dir)
    }
}

/// `x.tar.zst` -> `x.tar`
fn raw_image_path(archive_path: &Path) -> PathBuf {
    let file_name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = file_name.strip_suffix(".zst").unwrap_or(&file_name);
    let raw_name = if stem.ends_with(RAW_SUFFIX) {
        stem.to_string()
    } else {
        format!("{}{}", stem, RAW_SUFFIX)
    };
    archive_path.with_file_name(raw_name)
}
