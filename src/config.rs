//! Persisted settings: API key, model and safety level.

use crate::safety::SafetyLevel;
use anyhow::{anyhow, Result};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const API_KEY_ENV: &str = "NLSHELL_API_KEY";
pub const MODEL_ENV: &str = "NLSHELL_MODEL";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub safety_level: SafetyLevel,
}

impl Config {
    /// Whether an API key is present.
    pub fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }

    /// Get the API key, ignoring blank values
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref().map(str::trim).filter(|m| !m.is_empty())
    }

    /// Environment variables override the stored key and model
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_overrides(|name| std::env::var(name).ok());
        self
    }

    fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, env: F) {
        if let Some(api_key) = env(API_KEY_ENV).filter(|v| !v.trim().is_empty()) {
            info!("Using API key from {}", API_KEY_ENV);
            self.api_key = Some(api_key);
        }
        if let Some(model) = env(MODEL_ENV).filter(|v| !v.trim().is_empty()) {
            self.model = Some(model);
        }
    }

    pub fn get_config_dir() -> Result<PathBuf> {
        let home = home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(home.join(".nlshell"))
    }

    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("config.toml"))
    }

    pub fn show_config_info(store: &FileConfigStore) -> Result<()> {
        println!("Configuration file: {}", store.path().display());

        match store.load() {
            Some(config) => {
                println!("Status: Found");
                println!("API Key: {}", if config.is_configured() { "Set" } else { "Not set" });
                println!("Model: {}", config.model().unwrap_or("(provider default)"));
                println!("Safety level: {}", config.safety_level);
            }
            None => println!("Status: Not found (using defaults)"),
        }

        println!("\nTo set API key:");
        println!("  nlsh --set-api-key <your-key>");
        println!("\nOr set environment variable:");
        println!("  export {}=<your-key>", API_KEY_ENV);

        Ok(())
    }
}

/// Load/save interface for the persisted settings.
pub trait ConfigStore: Send + Sync {
    /// Returns `None` when no usable configuration exists.
    fn load(&self) -> Option<Config>;

    /// Persists all settings in one write.
    fn save(&self, config: &Config) -> Result<()>;
}

/// TOML file store, by default at `~/.nlshell/config.toml`.
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> Result<Self> {
        Ok(Self::new(Config::get_config_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_file(&self) -> Result<Config> {
        let content = fs::read_to_string(&self.path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded config from: {}", self.path.display());
        Ok(config)
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Option<Config> {
        if !self.path.exists() {
            info!("No config file found at {}", self.path.display());
            return None;
        }
        match self.load_from_file() {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Ignoring unreadable config {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn save(&self, config: &Config) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
            restrict_permissions(parent, 0o700)?;
        }

        let content = toml::to_string_pretty(config)?;
        let staging = self.path.with_extension("toml.tmp");
        fs::write(&staging, content)?;
        restrict_permissions(&staging, 0o600)?;
        fs::rename(&staging, &self.path)?;

        info!("Saved config to: {}", self.path.display());
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
