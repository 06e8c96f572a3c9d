//! Operator settings for wsl-vault
//!
//! The config file is JSON, or YAML when its extension is `.yaml`/`.yml`:
//!
//! ```json
//! {
//!   "backupDir": "D:\\Backups\\WSL",
//!   "distroName": "",
//!   "rcloneRemote": "gdrive:Backups/WSL",
//!   "retentionLocal": 7,
//!   "retentionCloud": 30
//! }
//! ```
//!
//! An empty `distroName` means "the default WSL distribution".

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::backup::retention::RetentionPolicy;
use crate::error::{VaultError, VaultResult};
use crate::tools::Virtualizer;

/// Executable names for the external tools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCommands {
    #[serde(default = "default_wsl")]
    pub wsl: String,
    #[serde(default = "default_zstd")]
    pub zstd: String,
    #[serde(default = "default_rclone")]
    pub rclone: String,
}

impl Default for ToolCommands {
    fn default() -> Self {
        Self {
            wsl: default_wsl(),
            zstd: default_zstd(),
            rclone: default_rclone(),
        }
    }
}

/// Settings for one invocation
///
/// Loaded once and never mutated; [`Config::with_resolved_distro`] returns a
/// new value instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Where archives, staging files and the run log live
    #[serde(default)]
    pub backup_dir: PathBuf,

    /// Distribution to back up; empty means auto-detect
    #[serde(default, alias = "environmentName")]
    pub distro_name: String,

    /// rclone destination in `remote:path` form
    #[serde(default, alias = "remoteLocation")]
    pub rclone_remote: String,

    /// Days to keep local archives
    #[serde(default = "default_retention_local")]
    pub retention_local: u32,

    /// Days to keep remote archives
    #[serde(default = "default_retention_cloud")]
    pub retention_cloud: u32,

    /// Transfer retries handed to rclone
    #[serde(default = "default_upload_retries")]
    pub upload_retries: u32,

    #[serde(default)]
    pub tools: ToolCommands,
}

fn default_retention_local() -> u32 {
    7
}

fn default_retention_cloud() -> u32 {
    30
}

fn default_upload_retries() -> u32 {
    3
}

fn default_wsl() -> String {
    "wsl.exe".to_string()
}

fn default_zstd() -> String {
    "zstd".to_string()
}

fn default_rclone() -> String {
    "rclone".to_string()
}

impl Config {
    /// Load and validate the config file at `path`
    pub fn load(path: &Path) -> VaultResult<Self> {
        if !path.is_file() {
            return Err(VaultError::ConfigMissing(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            VaultError::Io(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config = Self::parse(&contents, is_yaml(path)).map_err(|e| {
            VaultError::ConfigInvalid(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    fn parse(contents: &str, yaml: bool) -> VaultResult<Self> {
        if yaml {
            Ok(serde_yaml::from_str(contents)?)
        } else {
            Ok(serde_json::from_str(contents)?)
        }
    }

    /// Check the invariants the pipeline relies on
    pub fn validate(&self) -> VaultResult<()> {
        if self.backup_dir.as_os_str().is_empty() {
            return Err(VaultError::ConfigInvalid("backupDir is required".into()));
        }

        match self.rclone_remote.split_once(':') {
            Some((remote, _)) if !remote.trim().is_empty() => {}
            _ => {
                return Err(VaultError::ConfigInvalid(format!(
                    "rcloneRemote must be in remote:path form, got '{}'",
                    self.rclone_remote
                )))
            }
        }

        if self.retention_local == 0 {
            return Err(VaultError::ConfigInvalid(
                "retentionLocal must be at least 1 day".into(),
            ));
        }
        if self.retention_cloud == 0 {
            return Err(VaultError::ConfigInvalid(
                "retentionCloud must be at least 1 day".into(),
            ));
        }
        if self.upload_retries == 0 {
            return Err(VaultError::ConfigInvalid(
                "uploadRetries must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Fill in an empty `distroName` from the virtualization layer's default
    pub fn with_resolved_distro(&self, virtualizer: &dyn Virtualizer) -> VaultResult<Self> {
        if !self.distro_name.trim().is_empty() {
            return Ok(Self {
                distro_name: self.distro_name.trim().to_string(),
                ..self.clone()
            });
        }

        let detected = virtualizer.default_distribution()?.ok_or_else(|| {
            VaultError::ConfigInvalid(
                "distroName is empty and no default WSL distribution is registered".into(),
            )
        })?;

        Ok(Self {
            distro_name: detected,
            ..self.clone()
        })
    }

    /// Distribution name filter, `None` when auto-detect is configured
    pub fn distro_filter(&self) -> Option<&str> {
        let name = self.distro_name.trim();
        (!name.is_empty()).then_some(name)
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            local_days: self.retention_local,
            cloud_days: self.retention_cloud,
        }
    }

    /// Append-only run log
    pub fn log_file(&self) -> PathBuf {
        self.backup_dir.join("backup.log")
    }

    /// Staging directory for downloaded archives during a restore
    pub fn restore_dir(&self) -> PathBuf {
        self.backup_dir.join("restore")
    }

    /// Parent of the install directories of restored distributions
    pub fn instances_dir(&self) -> PathBuf {
        self.backup_dir.join("instances")
    }

    /// Full remote path of an object under the configured remote
    pub fn remote_path(&self, file_name: &str) -> String {
        join_remote(&self.rclone_remote, file_name)
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext == "yaml" || ext == "yml")
}

/// Join an rclone location and an object name
///
/// `gdrive:` and `gdrive:dir/` take the name directly; anything else gets a `/`.
pub fn join_remote(location: &str, name: &str) -> String {
    if location.ends_with(':') || location.ends_with('/') {
        format!("{}{}", location, name)
    } else {
        format!("{}/{}", location, name)
    }
}
