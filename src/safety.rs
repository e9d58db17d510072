//! Confirmation policy for translated commands.
//!
//! The classifier is a lexical heuristic over the command text. It favors
//! over-confirming: a false positive costs a keystroke, a false negative on a
//! destructive command costs data.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// How often the user is asked before a translated command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum SafetyLevel {
    /// Never confirm.
    #[default]
    Instant = 1,
    /// Confirm only clearly destructive commands.
    Lax = 2,
    /// Confirm anything that writes, installs, redirects or pipes.
    Cautious = 3,
    /// Confirm everything.
    Strict = 4,
}

/// Base commands that remove data or take the machine down.
const DESTRUCTIVE: &[&str] = &[
    "rm", "del", "rd", "rmdir", "format", "mkfs", "fdisk", "shred", "reset", "reboot", "shutdown",
];

/// Substrings that indicate a write or system mutation.
const WRITE_VOCABULARY: &[&str] = &[
    "mkdir", "touch", "cp", "mv", "ln", "git push", "dd", "wget", "curl", "pip install",
    "npm install", "apt", "yum", "dnf", "brew", "pacman", "chmod", "chown",
];

impl SafetyLevel {
    pub const ALL: [SafetyLevel; 4] = [
        SafetyLevel::Instant,
        SafetyLevel::Lax,
        SafetyLevel::Cautious,
        SafetyLevel::Strict,
    ];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            SafetyLevel::Instant => "Instant",
            SafetyLevel::Lax => "Lax",
            SafetyLevel::Cautious => "Cautious",
            SafetyLevel::Strict => "Strict",
        }
    }

    /// One-line explanation shown in the level picker.
    pub fn description(self) -> &'static str {
        match self {
            SafetyLevel::Instant => "No confirmation for any command",
            SafetyLevel::Lax => "Confirm only for very destructive commands",
            SafetyLevel::Cautious => "Confirm for any command that modifies files/system",
            SafetyLevel::Strict => "Confirm for every translated command",
        }
    }

    /// Menu label, e.g. `"Lax      (Confirm only for very destructive commands)"`.
    pub fn menu_label(self) -> String {
        format!("{:<8} ({})", self.name(), self.description())
    }

    /// Parses a menu label back into a level by its leading name.
    pub fn from_menu_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| label.starts_with(level.name()))
    }
}

impl TryFrom<u8> for SafetyLevel {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(SafetyLevel::Instant),
            2 => Ok(SafetyLevel::Lax),
            3 => Ok(SafetyLevel::Cautious),
            4 => Ok(SafetyLevel::Strict),
            other => Err(anyhow!("Safety level must be between 1 and 4, got {}", other)),
        }
    }
}

impl FromStr for SafetyLevel {
    type Err = anyhow::Error;

    /// Accepts a level name (any case) or its number.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(number) = s.parse::<u8>() {
            return Self::try_from(number);
        }
        Self::ALL
            .into_iter()
            .find(|level| level.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow!("Unknown safety level: {} (expected instant, lax, cautious or strict)", s))
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for SafetyLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for SafetyLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u8),
            Name(String),
        }

        let level = match Raw::deserialize(deserializer)? {
            Raw::Number(n) => SafetyLevel::try_from(n),
            Raw::Name(name) => name.parse(),
        };
        level.map_err(serde::de::Error::custom)
    }
}

/// Whether `command` must be confirmed before running at `level`.
pub fn requires_confirmation(command: &str, level: SafetyLevel) -> bool {
    let confirm = classify(command, level);
    debug!("Safety check at {}: {:?} -> confirm={}", level, command, confirm);
    confirm
}

fn classify(command: &str, level: SafetyLevel) -> bool {
    match level {
        SafetyLevel::Instant => return false,
        SafetyLevel::Strict => return true,
        _ => {}
    }

    let command = command.trim().to_lowercase();
    let Some(base) = command.split_whitespace().next() else {
        return false;
    };

    if DESTRUCTIVE.contains(&base) {
        if base == "rm" && (command.contains("-r") || command.contains("-f")) {
            return true;
        }
        if level >= SafetyLevel::Lax {
            return true;
        }
    }

    match level {
        SafetyLevel::Lax => base == "rm" && (command.contains("-rf") || command.contains("/*")),
        SafetyLevel::Cautious => {
            WRITE_VOCABULARY.iter().any(|word| command.contains(word))
                || command.contains('>')
                || command.contains('|')
        }
        _ => false,
    }
}
