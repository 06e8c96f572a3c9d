//! Custom error types for wsl-vault
//!
//! Every fatal outcome of a backup or restore run maps onto one variant of
//! [`VaultError`]. All of them are terminal for the current invocation.

use thiserror::Error;

/// The main error type for wsl-vault operations
#[derive(Error, Debug)]
pub enum VaultError {
    /// No configuration file could be found
    #[error("Configuration not found: {0}")]
    ConfigMissing(String),

    /// The configuration file exists but is unusable
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The distribution export failed or produced no artifact
    #[error("Export failed: {0}")]
    ExportFailed(String),

    /// The codec failed to produce the compressed archive
    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    /// The remote transfer failed after the transport's own retries
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// Local and remote digests disagree, or the remote digest is unavailable
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    /// Nothing to restore at the remote location
    #[error("No backup found: {0}")]
    NoBackupFound(String),

    /// The restore target distribution is already registered
    #[error("Restore target already exists: {0}")]
    DuplicateTarget(String),

    /// The codec failed to unpack a downloaded archive
    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    /// The virtualization layer refused the import
    #[error("Import failed: {0}")]
    ImportFailed(String),

    /// An external executable could not be started at all
    #[error("{tool} is not available: {reason}")]
    ToolUnavailable { tool: &'static str, reason: String },

    /// An external executable ran but reported failure
    #[error("{tool} failed: {message}")]
    ToolFailed { tool: &'static str, message: String },

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// YAML deserialization errors
    #[error("YAML error: {0}")]
    Yaml(String),
}

impl VaultError {
    /// Short taxonomy name, used as the prefix of failure lines in the run log
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigMissing(_) => "ConfigMissing",
            Self::ConfigInvalid(_) => "ConfigInvalid",
            Self::ExportFailed(_) => "ExportFailed",
            Self::CompressionFailed(_) => "CompressionFailed",
            Self::UploadFailed(_) => "UploadFailed",
            Self::VerificationFailed(_) => "VerificationFailed",
            Self::NoBackupFound(_) => "NoBackupFound",
            Self::DuplicateTarget(_) => "DuplicateTarget",
            Self::DecompressionFailed(_) => "DecompressionFailed",
            Self::ImportFailed(_) => "ImportFailed",
            Self::ToolUnavailable { .. } => "ToolUnavailable",
            Self::ToolFailed { .. } => "ToolFailed",
            Self::Io(_) => "Io",
            Self::Json(_) => "Json",
            Self::Yaml(_) => "Yaml",
        }
    }

    /// Check if this error means an external executable is missing
    pub fn is_tool_unavailable(&self) -> bool {
        matches!(self, Self::ToolUnavailable { .. })
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<serde_yaml::Error> for VaultError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err.to_string())
    }
}

/// Result type alias for wsl-vault operations
pub type VaultResult<T> = Result<T, VaultError>;
