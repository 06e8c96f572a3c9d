//! Subprocess plumbing shared by the tool adapters
//!
//! Short-lived commands go through [`run_tool`]; the long-running export is
//! wrapped in a [`ChildProcess`] that can be polled without blocking.

use std::io::{ErrorKind, Read};
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;

use tracing::debug;

use crate::error::{VaultError, VaultResult};

/// How a finished process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Exit code, `None` if the process was killed by a signal
    pub code: Option<i32>,
    /// Everything the process wrote to stderr
    pub stderr: String,
}

impl ExitOutcome {
    /// Whether the process reported success
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// One-line description for error messages
    pub fn describe(&self) -> String {
        let code = match self.code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            code
        } else {
            format!("{}: {}", code, stderr)
        }
    }
}

/// A running external operation
pub trait ProcessHandle {
    /// Non-blocking status query: `None` while still running
    fn try_wait(&mut self) -> VaultResult<Option<ExitOutcome>>;

    /// Stop the operation
    fn kill(&mut self) -> VaultResult<()>;
}

/// [`ProcessHandle`] over a spawned OS process
///
/// Stderr is drained on a helper thread so a chatty child can't block on a
/// full pipe while we poll.
pub struct ChildProcess {
    child: Child,
    stderr: Option<JoinHandle<String>>,
}

impl ChildProcess {
    /// Spawn `command` with stdout discarded and stderr captured
    pub fn spawn(tool: &'static str, mut command: Command) -> VaultResult<Self> {
        debug!(tool, command = ?command, "spawning background process");

        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| spawn_error(tool, e))?;

        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                decode_console_output(&buf)
            })
        });

        Ok(Self { child, stderr })
    }
}

impl ProcessHandle for ChildProcess {
    fn try_wait(&mut self) -> VaultResult<Option<ExitOutcome>> {
        let Some(status) = self.child.try_wait()? else {
            return Ok(None);
        };

        let stderr = match self.stderr.take() {
            Some(handle) => handle.join().unwrap_or_default(),
            None => String::new(),
        };

        Ok(Some(ExitOutcome {
            code: status.code(),
            stderr,
        }))
    }

    fn kill(&mut self) -> VaultResult<()> {
        match self.child.kill() {
            Ok(()) => {}
            // Already exited
            Err(e) if e.kind() == ErrorKind::InvalidInput => {}
            Err(e) => return Err(e.into()),
        }
        self.child.wait()?;
        Ok(())
    }
}

/// Captured result of a short-lived command
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Exit description in the same shape as [`ExitOutcome::describe`]
    pub fn describe(&self) -> String {
        ExitOutcome {
            code: self.code,
            stderr: self.stderr.clone(),
        }
        .describe()
    }
}

/// Run a command to completion, capturing its output
///
/// Only a failure to start the program is an error here; a non-zero exit is
/// returned in [`ToolOutput`] for the adapter to interpret.
pub fn run_tool(tool: &'static str, command: &mut Command) -> VaultResult<ToolOutput> {
    debug!(tool, command = ?command, "running");

    let output = command
        .stdin(Stdio::null())
        .output()
        .map_err(|e| spawn_error(tool, e))?;

    let result = ToolOutput {
        code: output.status.code(),
        stdout: decode_console_output(&output.stdout),
        stderr: decode_console_output(&output.stderr),
    };

    debug!(tool, code = ?result.code, "finished");
    Ok(result)
}

/// Run a command and fail with [`VaultError::ToolFailed`] on a non-zero exit
pub fn run_checked(tool: &'static str, command: &mut Command) -> VaultResult<ToolOutput> {
    let output = run_tool(tool, command)?;
    if output.success() {
        Ok(output)
    } else {
        Err(VaultError::ToolFailed {
            tool,
            message: output.describe(),
        })
    }
}

fn spawn_error(tool: &'static str, err: std::io::Error) -> VaultError {
    VaultError::ToolUnavailable {
        tool,
        reason: err.to_string(),
    }
}

/// Decode console output that may be UTF-16LE
///
/// `wsl.exe` writes its listings as UTF-16LE; everything else is UTF-8.
pub fn decode_console_output(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xFF, 0xFE]).unwrap_or(bytes);

    let looks_utf16 = bytes.len() >= 2
        && bytes.len() % 2 == 0
        && bytes.iter().skip(1).step_by(2).filter(|b| **b == 0).count() * 2 >= bytes.len() / 2;

    if looks_utf16 {
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}
