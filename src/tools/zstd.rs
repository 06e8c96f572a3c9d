//! `zstd` adapter

use std::path::Path;
use std::process::Command;

use crate::error::VaultResult;

use super::process::run_checked;
use super::Codec;

const TOOL: &str = "zstd";

/// [`Codec`] backed by the `zstd` command line
pub struct ZstdCli {
    program: String,
}

impl ZstdCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, remove_input: bool) -> Command {
        let mut command = Command::new(&self.program);
        // -q: no progress meter on stderr, -f: overwrite stale outputs
        command.args(["-q", "-f"]);
        if remove_input {
            command.arg("--rm");
        }
        command
    }
}

impl Codec for ZstdCli {
    fn compress(
        &self,
        input: &Path,
        output: &Path,
        level: u32,
        remove_input: bool,
    ) -> VaultResult<()> {
        let mut command = self.command(remove_input);
        command
            .arg(format!("-{}", level))
            .arg("-T0")
            .arg(input)
            .arg("-o")
            .arg(output);
        run_checked(TOOL, &mut command)?;
        Ok(())
    }

    fn decompress(&self, input: &Path, output: &Path, remove_input: bool) -> VaultResult<()> {
        let mut command = self.command(remove_input);
        command.arg("-d").arg(input).arg("-o").arg(output);
        run_checked(TOOL, &mut command)?;
        Ok(())
    }
}
