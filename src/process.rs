//! External command execution.
//!
//! Every provisioning tool is invoked through [`Cmd`]: a program name plus a
//! discrete argument vector. Nothing here goes through `sh -c`, so device
//! paths and size specifiers are never word-split or re-quoted.

use std::fmt;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use tracing::debug;

use crate::error::{InstallError, Result};

/// Result of a captured command execution.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit status of the command.
    pub status: ExitStatus,
    /// Captured stdout as a string.
    pub stdout: String,
    /// Captured stderr as a string.
    pub stderr: String,
}

impl CommandResult {
    /// Returns true if the command exited successfully.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Get the exit code, or -1 if terminated by signal.
    pub fn code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }

    /// Get stdout, trimmed of whitespace.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// Get stderr, trimmed of whitespace.
    pub fn stderr_trimmed(&self) -> &str {
        self.stderr.trim()
    }
}

/// One external tool invocation.
///
/// Built as a plain value so step functions can be pure and tests can
/// compare the exact argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new(program: impl AsRef<str>) -> Self {
        Self {
            program: program.as_ref().to_string(),
            args: Vec::new(),
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string());
        }
        self
    }

    /// Add a path as an argument.
    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    fn launch_error(&self, e: std::io::Error) -> InstallError {
        InstallError::tool(
            &self.program,
            format!("failed to execute ({}). Is it installed?", e),
        )
    }

    /// Run the command and capture output. Non-zero exit is an error
    /// carrying the trimmed stderr.
    pub fn run(&self) -> Result<CommandResult> {
        debug!(command = %self, "capture");
        let output = self
            .command()
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.launch_error(e))?;

        let result = CommandResult {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.success() {
            let stderr = result.stderr_trimmed();
            let detail = if stderr.is_empty() {
                format!("exit code {}", result.code())
            } else {
                format!("exit code {}: {}", result.code(), stderr)
            };
            return Err(InstallError::tool(&self.program, detail));
        }

        Ok(result)
    }

    /// Run the command with inherited stdio so the operator sees progress
    /// live. The tool's own stderr is already on the terminal, so the
    /// error only carries the exit code.
    pub fn run_interactive(&self) -> Result<()> {
        debug!(command = %self, "stream");
        let status = self
            .command()
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| self.launch_error(e))?;

        if !status.success() {
            return Err(InstallError::tool(
                &self.program,
                format!("exit code {}", status.code().unwrap_or(-1)),
            ));
        }

        Ok(())
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Check if a program exists in PATH.
///
/// Returns the full path if found, None otherwise.
pub fn which(program: &str) -> Option<String> {
    which::which(program)
        .ok()
        .map(|path| path.to_string_lossy().into_owned())
}
