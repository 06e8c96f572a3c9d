//! Configuration module for wsl-vault
//!
//! This module provides configuration management including:
//! - Config file location resolution
//! - Loading and validating operator settings
//! - Automatic resolution of the distribution to back up

pub mod paths;
pub mod settings;

pub use paths::VaultPaths;
pub use settings::{join_remote, Config, ToolCommands};
