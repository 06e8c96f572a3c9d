//! In-memory tool adapters for tests

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};

use crate::error::{VaultError, VaultResult};

use super::{Codec, ExitOutcome, ProcessHandle, RemoteEntry, RemoteStore, Virtualizer};

/// Scripted export: writes `chunks` chunks, one per poll, keeps running for
/// `idle_polls` more polls without writing, then exits with `exit_code`
#[derive(Debug, Clone)]
pub struct ExportScript {
    pub chunks: u32,
    pub chunk_size: usize,
    pub idle_polls: u32,
    pub exit_code: i32,
}

impl Default for ExportScript {
    fn default() -> Self {
        Self {
            chunks: 4,
            chunk_size: 4096,
            idle_polls: 0,
            exit_code: 0,
        }
    }
}

struct FakeExport {
    destination: PathBuf,
    remaining: u32,
    chunk_size: usize,
    idle_polls: u32,
    exit_code: i32,
}

impl ProcessHandle for FakeExport {
    fn try_wait(&mut self) -> VaultResult<Option<ExitOutcome>> {
        if self.remaining > 0 {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.destination)?;
            let byte = b'a' + (self.remaining % 26) as u8;
            file.write_all(&vec![byte; self.chunk_size])?;
            self.remaining -= 1;
            return Ok(None);
        }

        if self.idle_polls > 0 {
            self.idle_polls -= 1;
            return Ok(None);
        }

        Ok(Some(ExitOutcome {
            code: Some(self.exit_code),
            stderr: if self.exit_code == 0 {
                String::new()
            } else {
                "export interrupted".to_string()
            },
        }))
    }

    fn kill(&mut self) -> VaultResult<()> {
        self.remaining = 0;
        self.idle_polls = 0;
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeVirtualizer {
    pub distributions: RefCell<Vec<String>>,
    pub default: Option<String>,
    pub export: ExportScript,
    pub fail_import: bool,
    /// Register the name even when the import fails
    pub register_on_failed_import: bool,
    pub imported: RefCell<Vec<(String, PathBuf, PathBuf)>>,
    pub unregistered: RefCell<Vec<String>>,
}

impl FakeVirtualizer {
    pub fn with_distributions(names: &[&str]) -> Self {
        Self {
            distributions: RefCell::new(names.iter().map(|n| n.to_string()).collect()),
            default: names.first().map(|n| n.to_string()),
            ..Self::default()
        }
    }
}

impl Virtualizer for FakeVirtualizer {
    fn start_export(
        &self,
        distro: &str,
        destination: &Path,
    ) -> VaultResult<Box<dyn ProcessHandle>> {
        if !self.distributions.borrow().iter().any(|d| d == distro) {
            return Err(VaultError::ToolFailed {
                tool: "wsl",
                message: format!("no distribution named {}", distro),
            });
        }
        Ok(Box::new(FakeExport {
            destination: destination.to_path_buf(),
            remaining: self.export.chunks,
            chunk_size: self.export.chunk_size,
            idle_polls: self.export.idle_polls,
            exit_code: self.export.exit_code,
        }))
    }

    fn import(&self, name: &str, install_dir: &Path, image: &Path) -> VaultResult<()> {
        if self.fail_import {
            if self.register_on_failed_import {
                self.distributions.borrow_mut().push(name.to_string());
            }
            return Err(VaultError::ToolFailed {
                tool: "wsl",
                message: "import rejected".into(),
            });
        }
        if !image.exists() {
            return Err(VaultError::ToolFailed {
                tool: "wsl",
                message: format!("image not found: {}", image.display()),
            });
        }
        self.distributions.borrow_mut().push(name.to_string());
        self.imported.borrow_mut().push((
            name.to_string(),
            install_dir.to_path_buf(),
            image.to_path_buf(),
        ));
        Ok(())
    }

    fn unregister(&self, name: &str) -> VaultResult<()> {
        self.distributions.borrow_mut().retain(|d| d != name);
        self.unregistered.borrow_mut().push(name.to_string());
        Ok(())
    }

    fn list_distributions(&self) -> VaultResult<Vec<String>> {
        Ok(self.distributions.borrow().clone())
    }

    fn default_distribution(&self) -> VaultResult<Option<String>> {
        Ok(self.default.clone())
    }
}

/// Prefixes the payload so compressed and raw bytes differ
const FAKE_MAGIC: &[u8] = b"FAKEZST1";

#[derive(Default)]
pub struct FakeCodec {
    pub fail_compress: bool,
    pub fail_decompress: bool,
    /// Report success without writing the output
    pub skip_output: bool,
}

impl Codec for FakeCodec {
    fn compress(
        &self,
        input: &Path,
        output: &Path,
        _level: u32,
        remove_input: bool,
    ) -> VaultResult<()> {
        if self.fail_compress {
            return Err(VaultError::ToolFailed {
                tool: "zstd",
                message: "exit code 1".into(),
            });
        }
        if !self.skip_output {
            let mut data = FAKE_MAGIC.to_vec();
            data.extend(fs::read(input)?);
            fs::write(output, data)?;
        }
        if remove_input {
            fs::remove_file(input)?;
        }
        Ok(())
    }

    fn decompress(&self, input: &Path, output: &Path, remove_input: bool) -> VaultResult<()> {
        if self.fail_decompress {
            return Err(VaultError::ToolFailed {
                tool: "zstd",
                message: "corrupted block".into(),
            });
        }
        let data = fs::read(input)?;
        let payload = data.strip_prefix(FAKE_MAGIC).ok_or_else(|| VaultError::ToolFailed {
            tool: "zstd",
            message: "unknown header".into(),
        })?;
        fs::write(output, payload)?;
        if remove_input {
            fs::remove_file(input)?;
        }
        Ok(())
    }
}

/// Objects keyed by their full `remote:path`
#[derive(Default)]
pub struct FakeRemote {
    pub objects: RefCell<BTreeMap<String, Vec<u8>>>,
    pub directories: RefCell<Vec<String>>,
    pub fail_upload: bool,
    pub fail_delete: bool,
    pub corrupt_digest: bool,
    pub digest_unavailable: bool,
    pub downloads: Cell<u32>,
    pub age_deletes: RefCell<Vec<(String, u32)>>,
}

impl FakeRemote {
    pub fn insert(&self, remote_path: &str, data: &[u8]) {
        self.objects
            .borrow_mut()
            .insert(remote_path.to_string(), data.to_vec());
    }
}

impl RemoteStore for FakeRemote {
    fn mkdir(&self, location: &str) -> VaultResult<()> {
        let mut dirs = self.directories.borrow_mut();
        if !dirs.iter().any(|d| d == location) {
            dirs.push(location.to_string());
        }
        Ok(())
    }

    fn copy_to(&self, local: &Path, remote_path: &str) -> VaultResult<()> {
        if self.fail_upload {
            return Err(VaultError::ToolFailed {
                tool: "rclone",
                message: "exit code 1: connection reset".into(),
            });
        }
        let data = fs::read(local)?;
        self.insert(remote_path, &data);
        Ok(())
    }

    fn copy_from(&self, remote_path: &str, local: &Path) -> VaultResult<()> {
        let objects = self.objects.borrow();
        let data = objects.get(remote_path).ok_or_else(|| VaultError::ToolFailed {
            tool: "rclone",
            message: format!("object not found: {}", remote_path),
        })?;
        fs::write(local, data)?;
        self.downloads.set(self.downloads.get() + 1);
        Ok(())
    }

    fn list(&self, location: &str) -> VaultResult<Vec<RemoteEntry>> {
        let prefix = crate::config::join_remote(location, "");
        Ok(self
            .objects
            .borrow()
            .iter()
            .filter_map(|(path, data)| {
                let name = path.strip_prefix(&prefix)?;
                (!name.contains('/')).then(|| RemoteEntry {
                    name: name.to_string(),
                    size: data.len() as u64,
                    modified: None,
                })
            })
            .collect())
    }

    fn md5sum(&self, remote_path: &str) -> VaultResult<Option<String>> {
        if self.digest_unavailable {
            return Ok(None);
        }
        let objects = self.objects.borrow();
        let Some(data) = objects.get(remote_path) else {
            return Ok(None);
        };
        if self.corrupt_digest {
            return Ok(Some("0".repeat(32)));
        }
        Ok(Some(format!("{:x}", Md5::digest(data))))
    }

    fn delete_older_than(&self, location: &str, days: u32) -> VaultResult<()> {
        if self.fail_delete {
            return Err(VaultError::ToolFailed {
                tool: "rclone",
                message: "exit code 3: directory not found".into(),
            });
        }
        self.age_deletes
            .borrow_mut()
            .push((location.to_string(), days));
        Ok(())
    }
}
