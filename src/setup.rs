//! First-run setup and provider reconfiguration.

use crate::config::{Config, ConfigStore};
use crate::http_client::HttpClient;
use crate::llm_provider::{available_models, detect_provider, ProviderKind, ProviderSelection};
use crate::menu::Menu;
use anyhow::Result;
use owo_colors::OwoColorize;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::info;

pub const API_KEY_PROMPT: &str = "\nEnter your API key:\n> ";

/// Outcome of configuring a key: who serves it and with which model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSetup {
    pub selection: ProviderSelection,
    pub model: String,
}

/// Detects the provider for `api_key` and lets the user choose a model.
///
/// Returns `None` (after explaining why) when no provider accepts the key.
pub async fn resolve_key<W: Write>(
    api_key: &str,
    http: &dyn HttpClient,
    menu: &dyn Menu,
    out: &mut W,
) -> Result<Option<ProviderSetup>> {
    let selection = detect_provider(api_key, http).await;
    let Some(kind) = selection.primary else {
        write_unsupported_key(out)?;
        return Ok(None);
    };

    let model = select_model(kind, api_key, http, menu, out).await?;
    Ok(Some(ProviderSetup { selection, model }))
}

/// Lists the vendor's models and asks the user to pick one.
pub async fn select_model<W: Write>(
    kind: ProviderKind,
    api_key: &str,
    http: &dyn HttpClient,
    menu: &dyn Menu,
    out: &mut W,
) -> Result<String> {
    writeln!(out, "{}", format!("Detected provider: {}", kind).green())?;
    writeln!(out, "Fetching available models...")?;
    out.flush()?;

    let models = available_models(kind, api_key, http).await;
    let model = menu
        .choose(&models, &format!("{} models", kind))
        .unwrap_or_else(|| kind.default_model().to_string());
    info!("Selected model {} for {}", model, kind);
    Ok(model)
}

fn write_unsupported_key<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "{}", "Invalid API key format.".red())?;
    writeln!(out, "Supported providers:")?;
    for kind in ProviderKind::ALL {
        writeln!(out, "  {}", kind)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Prompts for an API key until one is accepted, then saves the settings.
///
/// `base` supplies the safety level to keep. Returns `None` if input ends
/// before a usable key is entered.
pub async fn first_run<R, W>(
    input: &mut R,
    out: &mut W,
    http: &dyn HttpClient,
    menu: &dyn Menu,
    store: &dyn ConfigStore,
    base: &Config,
) -> Result<Option<(Config, ProviderSelection)>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        write!(out, "{}", API_KEY_PROMPT)?;
        out.flush()?;

        let mut line = Vec::new();
        if input.read_until(b'\n', &mut line).await? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&line);
        let key = line.trim();
        if key.is_empty() {
            writeln!(out, "{}", "API key cannot be empty.".red())?;
            continue;
        }

        if let Some(setup) = resolve_key(key, http, menu, out).await? {
            let config = Config {
                api_key: Some(key.to_string()),
                model: Some(setup.model),
                safety_level: base.safety_level,
            };
            store.save(&config)?;
            return Ok(Some((config, setup.selection)));
        }
    }
}
