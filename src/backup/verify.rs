//! Verification stage
//!
//! An archive only counts once the digest the remote store reports for it
//! equals the digest of the local file.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use md5::{Digest, Md5};
use tracing::info;

use crate::error::{VaultError, VaultResult};
use crate::tools::RemoteStore;

const READ_BUFFER: usize = 1024 * 1024;

/// Compares local and remote MD5 digests
pub struct Verifier<'a> {
    remote: &'a dyn RemoteStore,
}

impl<'a> Verifier<'a> {
    pub fn new(remote: &'a dyn RemoteStore) -> Self {
        Self { remote }
    }

    /// Check that `remote_path` holds exactly the bytes of `local`
    ///
    /// Returns the shared digest.
    pub fn verify(&self, local: &Path, remote_path: &str) -> VaultResult<String> {
        let local_digest = md5_file(local)?;

        let remote_digest = self
            .remote
            .md5sum(remote_path)
            .map_err(|e| {
                VaultError::VerificationFailed(format!("remote digest unavailable: {}", e))
            })?
            .ok_or_else(|| {
                VaultError::VerificationFailed(format!(
                    "no MD5 digest reported for {}",
                    remote_path
                ))
            })?;

        if !remote_digest.eq_ignore_ascii_case(&local_digest) {
            return Err(VaultError::VerificationFailed(format!(
                "digest mismatch for {}: local {}, remote {}",
                remote_path, local_digest, remote_digest
            )));
        }

        info!(remote = %remote_path, digest = %local_digest, "verified");
        Ok(local_digest)
    }
}

/// Hex MD5 of a file, streamed
pub fn md5_file(path: &Path) -> VaultResult<String> {
    let file = File::open(path).map_err(|e| {
        VaultError::VerificationFailed(format!("cannot read {}: {}", path.display(), e))
    })?;

    let mut reader = BufReader::with_capacity(READ_BUFFER, file);
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; READ_BUFFER];

    loop {
        let read = reader.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
