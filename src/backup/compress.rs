//! Compression stage

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{VaultError, VaultResult};
use crate::tools::Codec;

use super::export::remove_if_present;

/// zstd level used for every archive
pub const COMPRESSION_LEVEL: u32 = 9;

/// Turns a raw export into a compressed archive
pub struct Compressor<'a> {
    codec: &'a dyn Codec,
}

impl<'a> Compressor<'a> {
    pub fn new(codec: &'a dyn Codec) -> Self {
        Self { codec }
    }

    /// Compress `raw` into `output`, returning the archive size
    ///
    /// The raw artifact is removed only once a non-empty archive exists; on
    /// failure it stays in place for manual recovery.
    pub fn compress(&self, raw: &Path, output: &Path) -> VaultResult<u64> {
        remove_if_present(output)?;

        self.codec
            .compress(raw, output, COMPRESSION_LEVEL, false)
            .map_err(|e| VaultError::CompressionFailed(e.to_string()))?;

        let size = match fs::metadata(output) {
            Ok(metadata) if metadata.len() > 0 => metadata.len(),
            _ => {
                return Err(VaultError::CompressionFailed(format!(
                    "codec reported success but {} is missing or empty",
                    output.display()
                )))
            }
        };

        if let Err(e) = remove_if_present(raw) {
            warn!(error = %e, "raw export left next to its archive");
        }

        info!(archive = %output.display(), size, "compressed");
        Ok(size)
    }
}
