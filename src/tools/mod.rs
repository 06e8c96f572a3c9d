//! External tool boundaries
//!
//! Every external program wsl-vault drives sits behind a narrow trait so the
//! orchestration code never sees command lines or output formats:
//!
//! - [`Virtualizer`]: export/import/unregister of WSL distributions (`wsl.exe`)
//! - [`Codec`]: compression and decompression of archives (`zstd`)
//! - [`RemoteStore`]: the remote-sync tool (`rclone`)
//!
//! [`Toolset`] owns one adapter of each kind and lends them out as [`Tools`].
//! The concrete adapters live in the `wsl`, `zstd` and `rclone` submodules;
//! `fake` holds in-memory replacements for tests.

pub mod process;
pub mod rclone;
pub mod wsl;
pub mod zstd;

#[cfg(test)]
pub mod fake;

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::error::VaultResult;

pub use process::{ChildProcess, ExitOutcome, ProcessHandle};
pub use rclone::RcloneCli;
pub use wsl::WslCli;
pub use zstd::ZstdCli;

/// Operations of the host virtualization layer
pub trait Virtualizer {
    /// Start exporting `distro` to `destination` and return immediately
    fn start_export(&self, distro: &str, destination: &Path) -> VaultResult<Box<dyn ProcessHandle>>;

    /// Register `image` as a new distribution called `name`, stored under `install_dir`
    fn import(&self, name: &str, install_dir: &Path, image: &Path) -> VaultResult<()>;

    /// Remove a registered distribution
    fn unregister(&self, name: &str) -> VaultResult<()>;

    /// Names of all registered distributions
    fn list_distributions(&self) -> VaultResult<Vec<String>>;

    /// The distribution marked as default, if any
    fn default_distribution(&self) -> VaultResult<Option<String>>;
}

/// Compression codec
pub trait Codec {
    /// Compress `input` into `output`; `remove_input` deletes `input` on success
    fn compress(
        &self,
        input: &Path,
        output: &Path,
        level: u32,
        remove_input: bool,
    ) -> VaultResult<()>;

    /// Decompress `input` into `output`; `remove_input` deletes `input` on success
    fn decompress(&self, input: &Path, output: &Path, remove_input: bool) -> VaultResult<()>;
}

/// One object reported by a remote listing
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEntry {
    /// Object name relative to the listed location
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Modification time reported by the store
    pub modified: Option<DateTime<Utc>>,
}

/// Remote storage reached through the sync tool
///
/// Locations and paths use the tool's `remote:path` notation.
pub trait RemoteStore {
    /// Create `location` if it does not exist yet
    fn mkdir(&self, location: &str) -> VaultResult<()>;

    /// Upload a local file to `remote_path`, overwriting any existing object
    fn copy_to(&self, local: &Path, remote_path: &str) -> VaultResult<()>;

    /// Download `remote_path` into a local file
    fn copy_from(&self, remote_path: &str, local: &Path) -> VaultResult<()>;

    /// List the objects directly under `location`
    fn list(&self, location: &str) -> VaultResult<Vec<RemoteEntry>>;

    /// MD5 digest reported by the store, `None` when the object is absent
    /// or the store cannot provide one
    fn md5sum(&self, remote_path: &str) -> VaultResult<Option<String>>;

    /// Delete every object under `location` older than `days`
    fn delete_older_than(&self, location: &str, days: u32) -> VaultResult<()>;
}

/// Borrowed view of one adapter per external boundary
#[derive(Clone, Copy)]
pub struct Tools<'a> {
    pub virtualizer: &'a dyn Virtualizer,
    pub codec: &'a dyn Codec,
    pub remote: &'a dyn RemoteStore,
}

/// Owned adapters for a real invocation
pub struct Toolset {
    pub virtualizer: Box<dyn Virtualizer>,
    pub codec: Box<dyn Codec>,
    pub remote: Box<dyn RemoteStore>,
}

impl Toolset {
    /// The real command-line adapters, configured from `config`
    pub fn system(config: &Config) -> Self {
        Self {
            virtualizer: Box::new(WslCli::new(config.tools.wsl.clone())),
            codec: Box::new(ZstdCli::new(config.tools.zstd.clone())),
            remote: Box::new(RcloneCli::new(config.tools.rclone.clone(), config.upload_retries)),
        }
    }

    pub fn tools(&self) -> Tools<'_> {
        Tools {
            virtualizer: self.virtualizer.as_ref(),
            codec: self.codec.as_ref(),
            remote: self.remote.as_ref(),
        }
    }
}
