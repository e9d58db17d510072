//! Shell family detection and invocation.
//!
//! A [`ShellProfile`] knows which binary to spawn for the detected shell and
//! with which fixed flags. Command text is always handed to the shell as a
//! single argument so the shell's own parser owns it.

use std::fmt;
use std::process::Command;

use tracing::debug;

/// Shell families the assistant can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellKind {
    PowerShell,
    Bash,
    Zsh,
    Cmd,
    Fish,
}

impl ShellKind {
    /// Detects the active shell from the process environment.
    pub fn detect() -> Self {
        Self::detect_from(|name| std::env::var(name).ok(), cfg!(windows))
    }

    /// Detects the shell from an arbitrary environment lookup.
    ///
    /// Signals are checked in priority order: `SHELL` (substring match for
    /// zsh, bash, fish), then `PSModulePath`, then the platform default.
    pub fn detect_from<F>(env: F, is_windows: bool) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |name: &str| env(name).is_some_and(|v| !v.is_empty());

        if let Some(shell) = env("SHELL") {
            if shell.contains("zsh") {
                return ShellKind::Zsh;
            }
            if shell.contains("bash") {
                return ShellKind::Bash;
            }
            if shell.contains("fish") {
                return ShellKind::Fish;
            }
        }

        if present("PSModulePath") {
            return ShellKind::PowerShell;
        }

        if is_windows {
            if present("PROMPT") {
                return ShellKind::Cmd;
            }
            return ShellKind::PowerShell;
        }

        ShellKind::Bash
    }

    /// Human-readable shell name, also used in translation prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            ShellKind::PowerShell => "PowerShell",
            ShellKind::Bash => "Bash",
            ShellKind::Zsh => "Zsh",
            ShellKind::Cmd => "Command Prompt",
            ShellKind::Fish => "Fish",
        }
    }
}

impl fmt::Display for ShellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// How to invoke a given shell family on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellProfile {
    kind: ShellKind,
    binary: &'static str,
    flags: &'static [&'static str],
    windows: bool,
}

impl ShellProfile {
    /// Builds the profile for `kind` on the current platform.
    pub fn new(kind: ShellKind) -> Self {
        Self::for_platform(kind, cfg!(windows))
    }

    /// Builds the profile for `kind` as it would be on the given platform.
    pub fn for_platform(kind: ShellKind, windows: bool) -> Self {
        let (binary, flags): (&'static str, &'static [&'static str]) = match kind {
            ShellKind::PowerShell if windows => ("powershell.exe", &["-NoProfile", "-NoLogo", "-Command"]),
            ShellKind::PowerShell => ("pwsh", &["-NoProfile", "-NoLogo", "-Command"]),
            ShellKind::Bash => ("bash", &["-c"]),
            ShellKind::Zsh => ("zsh", &["-c"]),
            ShellKind::Fish => ("fish", &["-c"]),
            ShellKind::Cmd => ("cmd.exe", &["/C"]),
        };
        Self { kind, binary, flags, windows }
    }

    pub fn kind(&self) -> ShellKind {
        self.kind
    }

    pub fn binary(&self) -> &'static str {
        self.binary
    }

    pub fn flags(&self) -> &'static [&'static str] {
        self.flags
    }

    /// Full argument list for running `text`: fixed flags then the text.
    pub fn args<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut args: Vec<&'a str> = self.flags.to_vec();
        args.push(text);
        args
    }

    /// Extra environment the spawned shell receives.
    pub fn env_overrides(&self) -> Vec<(&'static str, &'static str)> {
        let mut env = vec![("NLSHELL_INSIDE", "1")];
        if self.kind == ShellKind::Bash && self.windows {
            env.push(("MSYS_NO_PATHCONV", "1"));
        }
        env
    }

    /// Prepares a `Command` that runs `text` through this shell.
    pub fn command(&self, text: &str) -> Command {
        let mut cmd = Command::new(self.binary);
        cmd.args(self.args(text));
        for (key, value) in self.env_overrides() {
            cmd.env(key, value);
        }
        debug!("Prepared {} invocation: {} {:?}", self.kind, self.binary, self.flags);
        cmd
    }

    /// Whether the shell binary can be found in PATH.
    pub fn is_available(&self) -> bool {
        which::which(self.binary).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_detect_prefers_shell_variable() {
        let env = env_of(&[("SHELL", "/usr/bin/zsh"), ("PSModulePath", "C:\\modules")]);
        assert_eq!(ShellKind::detect_from(env, true), ShellKind::Zsh);

        let env = env_of(&[("SHELL", "/bin/bash")]);
        assert_eq!(ShellKind::detect_from(env, false), ShellKind::Bash);

        let env = env_of(&[("SHELL", "/usr/local/bin/fish")]);
        assert_eq!(ShellKind::detect_from(env, false), ShellKind::Fish);
    }

    #[test]
    fn test_detect_powershell_module_marker() {
        let env = env_of(&[("SHELL", "/bin/sh"), ("PSModulePath", "/opt/microsoft/powershell")]);
        assert_eq!(ShellKind::detect_from(env, false), ShellKind::PowerShell);
    }

    #[test]
    fn test_detect_windows_defaults() {
        let env = env_of(&[("PROMPT", "$P$G")]);
        assert_eq!(ShellKind::detect_from(env, true), ShellKind::Cmd);

        let env = env_of(&[]);
        assert_eq!(ShellKind::detect_from(env, true), ShellKind::PowerShell);
    }

    #[test]
    fn test_detect_falls_back_to_bash() {
        assert_eq!(ShellKind::detect_from(env_of(&[]), false), ShellKind::Bash);
        let env = env_of(&[("SHELL", "/bin/dash")]);
        assert_eq!(ShellKind::detect_from(env, false), ShellKind::Bash);
    }

    #[test]
    fn test_profile_invocation() {
        let bash = ShellProfile::for_platform(ShellKind::Bash, false);
        assert_eq!(bash.binary(), "bash");
        assert_eq!(bash.args("ls -la | wc -l"), vec!["-c", "ls -la | wc -l"]);

        let pwsh = ShellProfile::for_platform(ShellKind::PowerShell, false);
        assert_eq!(pwsh.binary(), "pwsh");
        let win_ps = ShellProfile::for_platform(ShellKind::PowerShell, true);
        assert_eq!(win_ps.binary(), "powershell.exe");
        assert_eq!(win_ps.args("Get-ChildItem"), vec!["-NoProfile", "-NoLogo", "-Command", "Get-ChildItem"]);

        let cmd = ShellProfile::for_platform(ShellKind::Cmd, true);
        assert_eq!(cmd.args("dir"), vec!["/C", "dir"]);
    }

    #[test]
    fn test_bash_on_windows_disables_path_conversion() {
        let bash = ShellProfile::for_platform(ShellKind::Bash, true);
        assert!(bash.env_overrides().contains(&("MSYS_NO_PATHCONV", "1")));

        let bash = ShellProfile::for_platform(ShellKind::Bash, false);
        assert!(!bash.env_overrides().contains(&("MSYS_NO_PATHCONV", "1")));
    }

    #[test]
    fn test_display_names() {
        assert_eq!(ShellKind::Cmd.to_string(), "Command Prompt");
        assert_eq!(ShellKind::PowerShell.display_name(), "PowerShell");
    }
}
