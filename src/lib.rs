//! wsl-vault - Disaster-recovery backups for WSL distributions
//!
//! This library provides the backup and restore pipeline behind the
//! `wsl-vault` command. A daily run exports a distribution, compresses it,
//! uploads it to an rclone remote, verifies the remote copy by digest and then
//! prunes expired archives. A restore brings the newest remote archive back as
//! a new, separately named distribution.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Config file location and settings
//! - `error`: Custom error types
//! - `tools`: Narrow traits over `wsl.exe`, `zstd` and `rclone`, and their
//!   command-line adapters
//! - `backup`: Pipeline stages, retention, status and restore
//! - `journal`: Append-only run log
//! - `cli`: Command handlers
//! - `display`: Terminal formatting
//!
//! # Example
//!
//! ```rust,ignore
//! use wsl_vault::config::{Config, VaultPaths};
//!
//! let paths = VaultPaths::resolve(None)?;
//! let config = Config::load(paths.config_file())?;
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod journal;
pub mod tools;

pub use error::VaultError;
