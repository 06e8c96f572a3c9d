//! Export monitoring
//!
//! The export of a distribution can run for tens of minutes with no output of
//! its own, so the monitor watches the artifact grow on disk to report
//! progress. Completion is taken from the process exit alone: the artifact's
//! size can stall mid-stream on slow or network-backed storage.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{VaultError, VaultResult};
use crate::tools::Virtualizer;

use super::archive::{list_leftovers, ArchiveName, ArtifactKind};

/// Default sampling interval for the artifact size
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Upper bound on the sampling interval
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// One sample of a running export
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportProgress {
    /// Size of the artifact so far
    pub bytes_written: u64,
    /// Time since the export was started
    pub elapsed: Duration,
}

impl ExportProgress {
    /// Average throughput since start, in bytes per second
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes_written as f64 / secs
        } else {
            0.0
        }
    }
}

/// Runs an export and watches it until the process exits
pub struct ExportMonitor<'a> {
    virtualizer: &'a dyn Virtualizer,
    poll_interval: Duration,
}

impl<'a> ExportMonitor<'a> {
    pub fn new(virtualizer: &'a dyn Virtualizer) -> Self {
        Self {
            virtualizer,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the sampling interval, capped at one second
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.min(MAX_POLL_INTERVAL);
        self
    }

    /// Export `distro` to `destination`, reporting progress on every sample
    ///
    /// Returns the final artifact size. On failure the partial artifact is
    /// removed.
    pub fn export(
        &self,
        distro: &str,
        destination: &Path,
        on_progress: &mut dyn FnMut(&ExportProgress),
    ) -> VaultResult<u64> {
        // Leftover from an interrupted run
        remove_if_present(destination)?;

        let started = Instant::now();
        let mut handle = self
            .virtualizer
            .start_export(distro, destination)
            .map_err(|e| VaultError::ExportFailed(e.to_string()))?;

        info!(distro, destination = %destination.display(), "export started");

        let outcome = loop {
            let status = match handle.try_wait() {
                Ok(status) => status,
                Err(e) => {
                    if let Err(kill_err) = handle.kill() {
                        warn!(error = %kill_err, "failed to stop export process");
                    }
                    discard_partial(destination);
                    return Err(VaultError::ExportFailed(format!(
                        "lost track of export process: {}",
                        e
                    )));
                }
            };

            if let Some(outcome) = status {
                break outcome;
            }

            on_progress(&ExportProgress {
                bytes_written: artifact_size(destination),
                elapsed: started.elapsed(),
            });
            thread::sleep(self.poll_interval);
        };

        if !outcome.success() {
            discard_partial(destination);
            return Err(VaultError::ExportFailed(outcome.describe()));
        }

        let size = artifact_size(destination);
        if size == 0 {
            discard_partial(destination);
            return Err(VaultError::ExportFailed(format!(
                "export reported success but {} is missing or empty",
                destination.display()
            )));
        }

        on_progress(&ExportProgress {
            bytes_written: size,
            elapsed: started.elapsed(),
        });
        debug!(size, elapsed = ?started.elapsed(), "export finished");

        Ok(size)
    }
}

fn artifact_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Delete a file, treating "already gone" as success
pub(crate) fn remove_if_present(path: &Path) -> VaultResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(VaultError::Io(format!(
            "Failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Delete raw exports of `distro` that an interrupted run left in `dir`
///
/// Returns the removed paths. Other distros' files and compressed archives
/// are left alone.
pub fn remove_stale_exports(dir: &Path, distro: &str) -> VaultResult<Vec<PathBuf>> {
    let mut removed = Vec::new();

    for leftover in list_leftovers(dir)? {
        let is_stale_raw = matches!(
            ArchiveName::parse_artifact(&leftover.file_name),
            Some((name, ArtifactKind::Raw)) if name.distro == distro
        );
        if !is_stale_raw {
            continue;
        }

        remove_if_present(&leftover.path)?;
        info!(path = %leftover.path.display(), "removed stale export");
        removed.push(leftover.path);
    }

    Ok(removed)
}

fn discard_partial(path: &Path) {
    if let Err(e) = remove_if_present(path) {
        warn!(error = %e, "partial export left on disk");
    }
}
