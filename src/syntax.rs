//! Literal-command detection.
//!
//! Deciding whether user input is already a command delegates to the target
//! shell itself: its dry-run mode for syntax, and its own introspection to
//! see whether the first word names something runnable. Any probe failure,
//! including a missing shell binary, counts as "not a command".

use crate::executor::{ProcessRunner, SystemProcessRunner};
use crate::shell::{ShellKind, ShellProfile};
use tracing::debug;

/// Built-in verbs accepted as literal commands under Command Prompt.
const CMD_BUILTINS: &[&str] = &[
    "dir", "cd", "copy", "move", "del", "mkdir", "rmdir", "type", "echo", "set", "cls", "exit",
    "call", "start", "ren", "rename", "attrib", "find", "findstr", "more", "sort", "xcopy",
    "robocopy", "tasklist", "taskkill",
];

/// Characters that mark a POSIX-shell compound expression.
const POSIX_METACHARS: &[char] = &[';', '|', '&', '{', '}', '$', '='];

/// Characters that mark a PowerShell compound expression.
const POWERSHELL_METACHARS: &[char] = &[';', '|', '{', '}', '$', '='];

/// Capability for deciding whether text is a syntactically valid command.
pub trait SyntaxChecker: Send + Sync {
    fn is_valid_syntax(&self, kind: ShellKind, text: &str) -> bool;
}

/// Syntax checker that probes the real shell binaries.
pub struct ShellSyntaxChecker<P: ProcessRunner = SystemProcessRunner> {
    runner: P,
    windows: bool,
}

impl ShellSyntaxChecker {
    pub fn new() -> Self {
        Self::with_runner(SystemProcessRunner, cfg!(windows))
    }
}

impl Default for ShellSyntaxChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ProcessRunner> ShellSyntaxChecker<P> {
    /// Creates a checker with a custom process runner (for testing).
    pub fn with_runner(runner: P, windows: bool) -> Self {
        Self { runner, windows }
    }

    fn probe(&self, program: &str, args: &[&str]) -> bool {
        if !self.runner.program_exists(program) {
            debug!("Probe skipped, {} not found", program);
            return false;
        }
        match self.runner.run(program, args) {
            Ok(output) => output.status.success(),
            Err(e) => {
                debug!("Probe {} failed to run: {}", program, e);
                false
            }
        }
    }

    /// POSIX shells: dry-run, then the compound heuristic, then a lookup of
    /// the first word. `lookup` receives the word as `$1` so it is never
    /// re-parsed as shell code.
    fn check_posix(&self, kind: ShellKind, text: &str, lookup: &str) -> bool {
        let binary = ShellProfile::for_platform(kind, self.windows).binary();
        if !self.probe(binary, &["-n", "-c", text]) {
            return false;
        }
        if text.contains(POSIX_METACHARS) {
            return true;
        }
        match first_token(text) {
            Some(word) => self.probe(binary, &["-c", lookup, binary, word]),
            None => false,
        }
    }

    fn check_powershell(&self, text: &str) -> bool {
        let binary = ShellProfile::for_platform(ShellKind::PowerShell, self.windows).binary();
        let parse = format!(
            "try {{ [ScriptBlock]::Create('{}') | Out-Null }} catch {{ exit 1 }}",
            text.replace('\'', "''")
        );
        if !self.probe(binary, &["-NoProfile", "-NoLogo", "-Command", &parse]) {
            return false;
        }
        if text.contains(POWERSHELL_METACHARS) {
            return true;
        }
        let Some(word) = first_token(text) else {
            return false;
        };
        let lookup = format!(
            "if (Get-Command -Name '{}' -ErrorAction SilentlyContinue) {{ exit 0 }} else {{ exit 1 }}",
            word.replace('\'', "''")
        );
        self.probe(binary, &["-NoProfile", "-NoLogo", "-Command", &lookup])
    }

    fn check_fish(&self, text: &str) -> bool {
        let binary = ShellProfile::for_platform(ShellKind::Fish, self.windows).binary();
        self.probe(binary, &["-n", "-c", text])
    }
}

impl<P: ProcessRunner> SyntaxChecker for ShellSyntaxChecker<P> {
    fn is_valid_syntax(&self, kind: ShellKind, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }

        let valid = match kind {
            ShellKind::Bash => self.check_posix(kind, text, "type -t -- \"$1\" >/dev/null 2>&1"),
            ShellKind::Zsh => self.check_posix(kind, text, "whence -w -- \"$1\" >/dev/null 2>&1"),
            ShellKind::Fish => self.check_fish(text),
            ShellKind::PowerShell => self.check_powershell(text),
            ShellKind::Cmd => is_cmd_builtin(text),
        };
        debug!("Syntax check ({}) for {:?}: {}", kind, text, valid);
        valid
    }
}

/// Whether the first word of `text` is a Command Prompt built-in verb.
pub fn is_cmd_builtin(text: &str) -> bool {
    first_token(text)
        .map(|word| word.to_lowercase())
        .is_some_and(|word| CMD_BUILTINS.contains(&word.as_str()))
}

fn first_token(text: &str) -> Option<&str> {
    text.split_whitespace().next()
}
