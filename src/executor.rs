//! Command execution through the detected shell.
//!
//! This module handles:
//! - Short-lived probe subprocesses (syntax checks, command lookups)
//! - Captured execution, where stdout and stderr are buffered separately
//! - Interactive execution, where the child inherits the terminal
//! - Working-directory changes, which must happen in this process
//!
//! Command text is never tokenized here; the target shell parses it.

use crate::shell::ShellProfile;
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};
use tracing::{error, info};

// =============================================================================
// Traits for Dependency Injection
// =============================================================================

/// Trait for running probe processes.
///
/// This abstraction enables testing without spawning real processes.
pub trait ProcessRunner: Send + Sync {
    /// Executes a program and returns its output.
    fn run(&self, program: &str, args: &[&str]) -> Result<Output>;

    /// Checks if a program exists in PATH.
    fn program_exists(&self, program: &str) -> bool;
}

/// Trait for running user commands and managing the working directory.
pub trait CommandRunner: Send + Sync {
    /// Runs `command` with stdout and stderr captured.
    fn execute(&self, command: &str) -> ExecOutput;

    /// Runs `command` with the caller's standard streams inherited.
    fn execute_interactive(&self, command: &str) -> Result<()>;

    /// Changes the working directory; an empty path means the home directory.
    fn change_directory(&self, path: &str) -> Result<()>;

    /// The current working directory.
    fn current_dir(&self) -> PathBuf;
}

/// Output of a captured execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    /// Spawn failure or nonzero exit, if any.
    pub error: Option<String>,
}

// =============================================================================
// Default Implementations
// =============================================================================

/// Default process runner using std::process::Command.
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        let mut cmd = Command::new(program);
        cmd.args(args).stdin(Stdio::null());
        Ok(cmd.output()?)
    }

    fn program_exists(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

// =============================================================================
// ShellExecutor Implementation
// =============================================================================

/// Runs user commands through a [`ShellProfile`].
///
/// # Example
///
/// ```no_run
/// use nlshell::executor::{CommandRunner, ShellExecutor};
/// use nlshell::shell::{ShellKind, ShellProfile};
///
/// let executor = ShellExecutor::new(ShellProfile::new(ShellKind::Bash));
/// let output = executor.execute("echo hello");
/// assert_eq!(output.stdout, "hello\n");
/// ```
pub struct ShellExecutor {
    profile: ShellProfile,
}

impl ShellExecutor {
    pub fn new(profile: ShellProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &ShellProfile {
        &self.profile
    }

    /// Converts a finished process into an [`ExecOutput`].
    fn collect_output(output: &Output) -> ExecOutput {
        ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            error: Self::status_error(&output.status),
        }
    }

    fn status_error(status: &ExitStatus) -> Option<String> {
        if status.success() {
            None
        } else {
            error!("Command failed with status: {}", status);
            Some(status.to_string())
        }
    }
}

impl CommandRunner for ShellExecutor {
    fn execute(&self, command: &str) -> ExecOutput {
        info!("Executing (captured): {}", command);
        let mut cmd = self.profile.command(command);
        cmd.stdin(Stdio::inherit());
        match cmd.output() {
            Ok(output) => Self::collect_output(&output),
            Err(e) => ExecOutput {
                error: Some(format!("failed to start {}: {}", self.profile.binary(), e)),
                ..ExecOutput::default()
            },
        }
    }

    fn execute_interactive(&self, command: &str) -> Result<()> {
        info!("Executing (interactive): {}", command);
        let status = self
            .profile
            .command(command)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| anyhow!("failed to start {}: {}", self.profile.binary(), e))?;

        match Self::status_error(&status) {
            None => Ok(()),
            Some(message) => Err(anyhow!(message)),
        }
    }

    fn change_directory(&self, path: &str) -> Result<()> {
        change_directory(path)
    }

    fn current_dir(&self) -> PathBuf {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }
}

/// Resolves the target of a directory change.
///
/// An empty (or whitespace) path resolves to the user's home directory, and
/// a leading `~` is expanded.
pub fn resolve_directory(path: &str) -> Result<PathBuf> {
    let path = path.trim();
    let home = || dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"));
    if path.is_empty() || path == "~" {
        return home();
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return Ok(home()?.join(rest));
    }
    Ok(PathBuf::from(path))
}

/// Changes this process's working directory.
pub fn change_directory(path: &str) -> Result<()> {
    let target = resolve_directory(path)?;
    std::env::set_current_dir(&target)
        .map_err(|e| anyhow!("cd: {}: {}", display_path(&target), e))?;
    info!("Changed directory to {}", display_path(&target));
    Ok(())
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}
