//! Upload stage

use std::path::Path;

use tracing::info;

use crate::config::join_remote;
use crate::error::{VaultError, VaultResult};
use crate::tools::RemoteStore;

/// Pushes an archive to the configured remote location
///
/// Transient network errors are retried by the transport itself; whatever
/// it finally reports is final here.
pub struct Uploader<'a> {
    remote: &'a dyn RemoteStore,
    location: &'a str,
}

impl<'a> Uploader<'a> {
    pub fn new(remote: &'a dyn RemoteStore, location: &'a str) -> Self {
        Self { remote, location }
    }

    /// Upload `archive` as `file_name`, returning its remote path
    ///
    /// The local file may carry a staging name; the remote object always gets
    /// `file_name`.
    pub fn upload(&self, archive: &Path, file_name: &str) -> VaultResult<String> {
        self.remote.mkdir(self.location).map_err(|e| {
            VaultError::UploadFailed(format!("cannot create {}: {}", self.location, e))
        })?;

        let remote_path = join_remote(self.location, file_name);
        self.remote
            .copy_to(archive, &remote_path)
            .map_err(|e| VaultError::UploadFailed(e.to_string()))?;

        info!(remote = %remote_path, "uploaded");
        Ok(remote_path)
    }
}
