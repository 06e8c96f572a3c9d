//! `wsl.exe` adapter

use std::path::Path;
use std::process::Command;

use crate::error::VaultResult;

use super::process::{run_checked, ChildProcess};
use super::{ProcessHandle, Virtualizer};

const TOOL: &str = "wsl";

/// [`Virtualizer`] backed by the `wsl.exe` command line
pub struct WslCli {
    program: String,
}

impl WslCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self) -> Command {
        Command::new(&self.program)
    }
}

impl Virtualizer for WslCli {
    fn start_export(
        &self,
        distro: &str,
        destination: &Path,
    ) -> VaultResult<Box<dyn ProcessHandle>> {
        let mut command = self.command();
        command.arg("--export").arg(distro).arg(destination);
        Ok(Box::new(ChildProcess::spawn(TOOL, command)?))
    }

    fn import(&self, name: &str, install_dir: &Path, image: &Path) -> VaultResult<()> {
        run_checked(
            TOOL,
            self.command()
                .arg("--import")
                .arg(name)
                .arg(install_dir)
                .arg(image),
        )?;
        Ok(())
    }

    fn unregister(&self, name: &str) -> VaultResult<()> {
        run_checked(TOOL, self.command().arg("--unregister").arg(name))?;
        Ok(())
    }

    fn list_distributions(&self) -> VaultResult<Vec<String>> {
        let output = run_checked(TOOL, self.command().args(["--list", "--quiet"]))?;
        Ok(parse_quiet_list(&output.stdout))
    }

    fn default_distribution(&self) -> VaultResult<Option<String>> {
        let output = run_checked(TOOL, self.command().args(["--list", "--verbose"]))?;
        Ok(parse_default_from_verbose(&output.stdout))
    }
}

/// Parse `wsl --list --quiet`: one name per line
fn parse_quiet_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(|line| line.trim_matches(|c: char| c.is_whitespace() || c == '\0'))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `wsl --list --verbose`: the default distribution is marked with `*`
///
/// ```text
///   NAME      STATE           VERSION
/// * Ubuntu    Running         2
///   Debian    Stopped         2
/// ```
fn parse_default_from_verbose(stdout: &str) -> Option<String> {
    stdout.lines().find_map(|line| {
        let line = line.trim_matches(|c: char| c.is_whitespace() || c == '\0');
        let rest = line.strip_prefix('*')?;
        rest.split_whitespace().next().map(str::to_string)
    })
}
