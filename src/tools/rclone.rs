//! `rclone` adapter

use std::path::Path;
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::backup::archive::ARCHIVE_SUFFIX;
use crate::error::{VaultError, VaultResult};

use super::process::{run_checked, run_tool};
use super::{RemoteEntry, RemoteStore};

const TOOL: &str = "rclone";

/// [`RemoteStore`] backed by the `rclone` command line
pub struct RcloneCli {
    program: String,
    retries: u32,
}

impl RcloneCli {
    pub fn new(program: impl Into<String>, retries: u32) -> Self {
        Self {
            program: program.into(),
            retries,
        }
    }

    fn command(&self) -> Command {
        Command::new(&self.program)
    }

    /// `copyto` with the transfer retry flags
    fn transfer(&self, source: &str, destination: &str) -> VaultResult<()> {
        let retries = self.retries.to_string();
        run_checked(
            TOOL,
            self.command()
                .arg("copyto")
                .arg(source)
                .arg(destination)
                .args(["--retries", retries.as_str()])
                .args(["--low-level-retries", "10"])
                .args(["--retries-sleep", "10s"]),
        )?;
        Ok(())
    }
}

/// One element of `rclone lsjson` output
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LsJsonEntry {
    name: String,
    size: i64,
    #[serde(default)]
    mod_time: Option<DateTime<Utc>>,
    #[serde(default)]
    is_dir: bool,
}

impl RemoteStore for RcloneCli {
    fn mkdir(&self, location: &str) -> VaultResult<()> {
        run_checked(TOOL, self.command().arg("mkdir").arg(location))?;
        Ok(())
    }

    fn copy_to(&self, local: &Path, remote_path: &str) -> VaultResult<()> {
        self.transfer(&local.to_string_lossy(), remote_path)
    }

    fn copy_from(&self, remote_path: &str, local: &Path) -> VaultResult<()> {
        self.transfer(remote_path, &local.to_string_lossy())
    }

    fn list(&self, location: &str) -> VaultResult<Vec<RemoteEntry>> {
        let output = run_checked(
            TOOL,
            self.command().arg("lsjson").arg("--files-only").arg(location),
        )?;
        parse_lsjson(&output.stdout)
    }

    fn md5sum(&self, remote_path: &str) -> VaultResult<Option<String>> {
        let output = run_tool(TOOL, self.command().arg("md5sum").arg(remote_path))?;
        if !output.success() {
            return Err(VaultError::ToolFailed {
                tool: TOOL,
                message: output.describe(),
            });
        }
        Ok(parse_md5sum(&output.stdout))
    }

    fn delete_older_than(&self, location: &str, days: u32) -> VaultResult<()> {
        run_checked(TOOL, self.command().args(delete_args(location, days)))?;
        Ok(())
    }
}

/// Arguments for an age sweep of `location`
///
/// Only archives directly inside `location` are candidates; other files and
/// subfolders that share the remote are left alone.
fn delete_args(location: &str, days: u32) -> Vec<String> {
    vec![
        "delete".to_string(),
        location.to_string(),
        "--min-age".to_string(),
        format!("{}d", days),
        "--include".to_string(),
        format!("*{}", ARCHIVE_SUFFIX),
        "--max-depth".to_string(),
        "1".to_string(),
    ]
}

fn parse_lsjson(stdout: &str) -> VaultResult<Vec<RemoteEntry>> {
    let entries: Vec<LsJsonEntry> = serde_json::from_str(stdout)?;
    Ok(entries
        .into_iter()
        .filter(|e| !e.is_dir)
        .map(|e| RemoteEntry {
            name: e.name,
            // lsjson reports -1 when the backend doesn't know the size
            size: e.size.max(0) as u64,
            modified: e.mod_time,
        })
        .collect())
}

/// Parse `rclone md5sum` output: `<hash>  <name>` per object
///
/// Backends without MD5 support print a blank hash column.
fn parse_md5sum(stdout: &str) -> Option<String> {
    let line = stdout.lines().find(|l| !l.trim().is_empty())?;
    let hash = line.split_whitespace().next()?;
    let is_md5 = hash.len() == 32 && hash.chars().all(|c| c.is_ascii_hexdigit());
    is_md5.then(|| hash.to_ascii_lowercase())
}
