//! The daily backup run
//!
//! Stages run strictly in order and each one gates the next:
//!
//! ```text
//! Config -> Export -> Compress -> Upload -> Verify -> Retention
//! ```
//!
//! A failing stage ends the run. Whatever the completed stages left on disk
//! (a compressed archive that never got uploaded, say) stays there for the
//! operator or the next run; nothing is rolled back.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::display::{format_duration, format_size};
use crate::error::{VaultError, VaultResult};
use crate::journal::RunLog;
use crate::tools::Tools;

use super::archive::{compression_ratio, ArchiveName, BackupArchive};
use super::compress::Compressor;
use super::export::{remove_stale_exports, ExportMonitor, ExportProgress, DEFAULT_POLL_INTERVAL};
use super::retention::{RetentionEnforcer, RetentionReport};
use super::upload::Uploader;
use super::verify::Verifier;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Export,
    Compress,
    Upload,
    Verify,
    Retention,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Config => "Config",
            Stage::Export => "Export",
            Stage::Compress => "Compress",
            Stage::Upload => "Upload",
            Stage::Verify => "Verify",
            Stage::Retention => "Retention",
        };
        f.write_str(name)
    }
}

/// A stage that ended the run
#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: VaultError,
}

/// Outcome of one backup invocation
#[derive(Debug)]
pub struct RunResult {
    pub run_id: Uuid,
    pub success: bool,
    pub raw_size: u64,
    pub compressed_size: u64,
    /// `raw_size / compressed_size`, two decimals
    pub ratio: f64,
    pub elapsed: Duration,
    pub failure: Option<StageFailure>,
    /// The verified archive, on success
    pub archive: Option<BackupArchive>,
    pub retention: Option<RetentionReport>,
}

impl RunResult {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            success: false,
            raw_size: 0,
            compressed_size: 0,
            ratio: 0.0,
            elapsed: Duration::ZERO,
            failure: None,
            archive: None,
            retention: None,
        }
    }

    pub fn failed_stage(&self) -> Option<Stage> {
        self.failure.as_ref().map(|f| f.stage)
    }
}

/// Receives stage events as the run progresses
///
/// All methods default to doing nothing.
pub trait PipelineObserver {
    fn stage_started(&mut self, _stage: Stage) {}
    fn export_progress(&mut self, _progress: &ExportProgress) {}
    fn stage_finished(&mut self, _stage: Stage, _detail: &str) {}
    fn stage_failed(&mut self, _stage: Stage, _error: &VaultError) {}
}

/// Observer that ignores everything
pub struct SilentObserver;

impl PipelineObserver for SilentObserver {}

/// One configured backup run
pub struct BackupPipeline<'a> {
    config: &'a Config,
    tools: Tools<'a>,
    log: &'a RunLog,
    poll_interval: Duration,
}

impl<'a> BackupPipeline<'a> {
    pub fn new(config: &'a Config, tools: Tools<'a>, log: &'a RunLog) -> Self {
        Self {
            config,
            tools,
            log,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the export sampling interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Execute every stage, stopping at the first failure
    pub fn run(&self, observer: &mut dyn PipelineObserver) -> RunResult {
        let started = Instant::now();
        let mut result = RunResult::new(Uuid::new_v4());

        self.log.note(format!("Backup started: run {}", short_id(&result.run_id)));

        match self.execute(&mut result, observer) {
            Ok(()) => {
                result.success = true;
                result.elapsed = started.elapsed();
                self.log_completion(&result);
            }
            Err(failure) => {
                result.elapsed = started.elapsed();
                self.log.note(format!(
                    "{} stage failed ({}): {}",
                    failure.stage,
                    failure.error.kind(),
                    failure.error
                ));
                result.failure = Some(failure);
            }
        }

        result
    }

    fn execute(
        &self,
        result: &mut RunResult,
        observer: &mut dyn PipelineObserver,
    ) -> Result<(), StageFailure> {
        let config = gate(Stage::Config, observer, |_| {
            let config = self.config.with_resolved_distro(self.tools.virtualizer)?;
            fs::create_dir_all(&config.backup_dir).map_err(|e| {
                VaultError::ConfigInvalid(format!(
                    "cannot create backupDir {}: {}",
                    config.backup_dir.display(),
                    e
                ))
            })?;
            Ok(config)
        })?;
        observer.stage_finished(Stage::Config, &format!("distro {}", config.distro_name));
        self.log.note(format!("Distro: {}", config.distro_name));

        let name = ArchiveName::new(&config.distro_name, Local::now().naive_local());
        let raw_path: PathBuf = config.backup_dir.join(name.raw_file_name());
        let staged_path = config.backup_dir.join(name.unverified_file_name());
        let archive_path = config.backup_dir.join(name.archive_file_name());

        // Export
        let monitor =
            ExportMonitor::new(self.tools.virtualizer).with_poll_interval(self.poll_interval);
        result.raw_size = gate(Stage::Export, observer, |observer| {
            for stale in remove_stale_exports(&config.backup_dir, &config.distro_name)? {
                self.log.note(format!("Removed stale export {}", stale.display()));
            }
            monitor.export(&config.distro_name, &raw_path, &mut |progress| {
                observer.export_progress(progress)
            })
        })?;
        observer.stage_finished(Stage::Export, &format_size(result.raw_size));

        // Compress
        let compressed_size = gate(Stage::Compress, observer, |_| {
            Compressor::new(self.tools.codec).compress(&raw_path, &staged_path)
        })?;
        result.compressed_size = compressed_size;
        result.ratio = compression_ratio(result.raw_size, compressed_size);
        observer.stage_finished(
            Stage::Compress,
            &format!("{} ({:.2}x)", format_size(compressed_size), result.ratio),
        );

        // Upload
        let remote_path = gate(Stage::Upload, observer, |_| {
            Uploader::new(self.tools.remote, &config.rclone_remote)
                .upload(&staged_path, &name.archive_file_name())
        })?;
        observer.stage_finished(Stage::Upload, &remote_path);

        // Verify, then give the local copy its archive name
        let digest = gate(Stage::Verify, observer, |_| {
            let digest = Verifier::new(self.tools.remote).verify(&staged_path, &remote_path)?;
            fs::rename(&staged_path, &archive_path).map_err(|e| {
                VaultError::Io(format!(
                    "Failed to rename verified archive to {}: {}",
                    archive_path.display(),
                    e
                ))
            })?;
            Ok(digest)
        })?;
        observer.stage_finished(Stage::Verify, &format!("md5 {}", digest));

        result.archive = Some(BackupArchive {
            name,
            local_path: archive_path,
            remote_path,
            raw_size: result.raw_size,
            compressed_size,
            digest,
        });

        // Retention, only ever after a verified upload
        let enforcer = RetentionEnforcer::new(
            &config.backup_dir,
            self.tools.remote,
            &config.rclone_remote,
            config.retention_policy(),
        );
        let report = gate(Stage::Retention, observer, |_| enforcer.enforce())?;
        for path in &report.local.deleted {
            self.log.note(format!("Retention: deleted {}", path.display()));
        }
        for (path, reason) in &report.local.skipped {
            self.log
                .note(format!("Retention: could not delete {}: {}", path.display(), reason));
        }
        if let Some(reason) = &report.cloud_error {
            self.log.note(format!("Retention: cloud sweep failed: {}", reason));
        }
        observer.stage_finished(
            Stage::Retention,
            &format!(
                "{} local deleted, cloud older than {}d pruned{}",
                report.local.deleted.len(),
                config.retention_cloud,
                if report.has_warnings() { " (with warnings)" } else { "" }
            ),
        );
        result.retention = Some(report);

        Ok(())
    }

    fn log_completion(&self, result: &RunResult) {
        let file_name = result
            .archive
            .as_ref()
            .map(|a| a.file_name())
            .unwrap_or_default();
        info!(run = %result.run_id, archive = %file_name, "backup complete");
        self.log.note(format!(
            "Backup complete: {}, {} -> {} ({:.2}x) in {}",
            file_name,
            format_size(result.raw_size),
            format_size(result.compressed_size),
            result.ratio,
            format_duration(result.elapsed),
        ));
    }
}

/// Run one stage, announcing it and tagging any error with the stage
fn gate<T>(
    stage: Stage,
    observer: &mut dyn PipelineObserver,
    body: impl FnOnce(&mut dyn PipelineObserver) -> VaultResult<T>,
) -> Result<T, StageFailure> {
    info!(%stage, "stage started");
    observer.stage_started(stage);
    body(&mut *observer).map_err(|error| {
        observer.stage_failed(stage, &error);
        StageFailure { stage, error }
    })
}

fn short_id(id: &Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}
