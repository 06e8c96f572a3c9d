//! Backup and restore for WSL distributions
//!
//! # Architecture
//!
//! A daily run is a strict sequence of stages, each a hard gate for the next:
//!
//! - `export`: the virtualizer writes the distribution to a `.tar`, watched
//!   until the process exits
//! - `compress`: the `.tar` becomes a staged `.tar.zst.unverified` and the
//!   raw file is dropped
//! - `upload`: the archive is copied to the configured remote
//! - `verify`: local and remote MD5 digests must match, then the staged file
//!   takes its final `.tar.zst` name
//! - `retention`: expired local and remote archives are pruned
//!
//! [`BackupPipeline`] sequences them; [`RestoreOrchestrator`] runs the
//! reverse trip for the newest remote archive.
//!
//! # Archive Format
//!
//! Archives are named `<distro>-<YYYYMMDD-HHMMSS>.tar.zst`. Restore orders
//! remote archives by that embedded timestamp.
//!
//! # Example
//!
//! ```rust,ignore
//! use wsl_vault::backup::{BackupPipeline, SilentObserver};
//! use wsl_vault::config::Config;
//! use wsl_vault::journal::RunLog;
//! use wsl_vault::tools::Toolset;
//!
//! let config = Config::load(path)?;
//! let toolset = Toolset::system(&config);
//! let log = RunLog::new(config.log_file());
//!
//! let result = BackupPipeline::new(&config, toolset.tools(), &log).run(&mut SilentObserver);
//! println!("{:.2}x", result.ratio);
//! ```

pub mod archive;
pub mod compress;
pub mod export;
pub mod pipeline;
pub mod restore;
pub mod retention;
pub mod status;
pub mod upload;
pub mod verify;

pub use archive::{ArchiveName, BackupArchive, LocalArchive};
pub use pipeline::{BackupPipeline, PipelineObserver, RunResult, SilentObserver, Stage};
pub use restore::{RestoreObserver, RestoreOrchestrator, RestoreOutcome, RestoreState};
pub use retention::{RetentionEnforcer, RetentionPolicy, RetentionReport};
pub use status::{check_status, BackupStatus, Freshness};
