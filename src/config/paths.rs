//! Config file location for wsl-vault
//!
//! ## Resolution Order
//!
//! 1. `--config <path>` or the `WSL_VAULT_CONFIG` environment variable
//! 2. `config.json` in the current directory (if present)
//! 3. Platform config directory: `~/.config/wsl-vault/config.json` on Unix,
//!    `%APPDATA%\wsl-vault\config\config.json` on Windows

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::error::{VaultError, VaultResult};

/// File name looked up in the current directory and the platform config dir
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Resolved location of the configuration file
#[derive(Debug, Clone)]
pub struct VaultPaths {
    config_file: PathBuf,
}

impl VaultPaths {
    /// Resolve the config file location
    ///
    /// The returned path is not required to exist; loading it reports
    /// `ConfigMissing` when it doesn't.
    pub fn resolve(explicit: Option<PathBuf>) -> VaultResult<Self> {
        if let Some(config_file) = explicit {
            return Ok(Self { config_file });
        }

        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.is_file() {
            return Ok(Self { config_file: local });
        }

        let dirs = ProjectDirs::from("", "", "wsl-vault").ok_or_else(|| {
            VaultError::ConfigMissing(
                "could not determine a configuration directory; pass --config".into(),
            )
        })?;

        Ok(Self {
            config_file: dirs.config_dir().join(CONFIG_FILE_NAME),
        })
    }

    /// Get the path to the config file
    pub fn config_file(&self) -> &Path {
        &self.config_file
    }
}
