use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, Command};
use nlshell::config::{Config, ConfigStore, FileConfigStore};
use nlshell::executor::ShellExecutor;
use nlshell::http_client::{HttpClient, ReqwestHttpClient};
use nlshell::llm_provider::{detect_provider, ProviderSelection};
use nlshell::menu::TerminalMenu;
use nlshell::provider_chain::MultiClient;
use nlshell::safety::SafetyLevel;
use nlshell::session::{ExecutionMode, Session, SessionDeps};
use nlshell::setup::first_run;
use nlshell::shell::{ShellKind, ShellProfile};
use nlshell::syntax::ShellSyntaxChecker;
use nlshell::translation::TranslationPipeline;
use std::io;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("nlsh")
        .about("Natural language shell - type what you want, run the command")
        .long_about(
            "nlsh runs shell commands as typed and translates everything else into a \
             command for the current shell using an LLM provider",
        )
        .arg(Arg::new("request")
            .help("Run a single request and exit")
            .num_args(1..))
        .arg(Arg::new("set-api-key")
            .long("set-api-key")
            .help("Save the API key (OpenAI, Anthropic, Google or Groq)")
            .value_name("API_KEY")
            .num_args(1))
        .arg(Arg::new("safety")
            .long("safety")
            .help("Save the safety level: instant, lax, cautious, strict (or 1-4)")
            .value_name("LEVEL")
            .num_args(1))
        .arg(Arg::new("config")
            .long("config")
            .help("Show configuration information")
            .action(ArgAction::SetTrue))
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let matches = cli().get_matches();
    let store = FileConfigStore::default_location()?;

    // Handle configuration commands
    if let Some(api_key) = matches.get_one::<String>("set-api-key") {
        let config = Config {
            api_key: Some(api_key.trim().to_string()),
            ..store.load().unwrap_or_default()
        };
        store.save(&config)?;
        println!("API key saved successfully");
        return Ok(());
    }

    if let Some(level) = matches.get_one::<String>("safety") {
        let level: SafetyLevel = level.parse()?;
        let config = Config {
            safety_level: level,
            ..store.load().unwrap_or_default()
        };
        store.save(&config)?;
        println!("Safety level set to: {}", level);
        return Ok(());
    }

    if matches.get_flag("config") {
        Config::show_config_info(&store)?;
        return Ok(());
    }

    let request: Vec<String> = matches
        .get_many::<String>("request")
        .unwrap_or_default()
        .map(|s| s.to_string())
        .collect();

    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    let menu = TerminalMenu::new();
    let mut input = BufReader::new(tokio::io::stdin());

    let config = store.load().unwrap_or_default().with_env_overrides();
    let selection = match config.api_key() {
        Some(key) => detect_provider(key, http.as_ref()).await,
        None => ProviderSelection::default(),
    };

    let (config, selection) = if selection.primary.is_some() {
        (config, selection)
    } else {
        if config.is_configured() {
            eprintln!("Saved API key was not recognized by any provider.");
        } else {
            println!("Welcome to nlsh! No API key is configured yet.");
        }
        let mut stdout = io::stdout();
        match first_run(&mut input, &mut stdout, http.as_ref(), &menu, &store, &config).await? {
            Some(configured) => configured,
            None => return Ok(()),
        }
    };

    let api_key = config.api_key().ok_or_else(|| anyhow!("No API key configured"))?;
    let client = MultiClient::from_selection(&selection, api_key, config.model(), http.clone())
        .ok_or_else(|| anyhow!("No provider available for the configured API key"))?;
    info!(
        "Using {} ({}), fallbacks: {:?}",
        client.primary_name(),
        client.primary_model(),
        client.fallback_names()
    );

    let shell = ShellKind::detect();
    let profile = ShellProfile::new(shell);
    if !profile.is_available() {
        warn!("Shell binary {} not found on PATH", profile.binary());
        eprintln!("Warning: {} was not found on PATH; commands may fail.", profile.binary());
    }

    let (interrupt_tx, interrupt_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if interrupt_tx.send(()).is_err() {
                break;
            }
        }
    });

    let deps = SessionDeps {
        syntax: Box::new(ShellSyntaxChecker::new()),
        runner: Box::new(ShellExecutor::new(profile)),
        store: Box::new(store),
        menu: Box::new(menu),
        http,
    };
    let session = Session::new(shell, config, TranslationPipeline::new(client), deps, input, io::stdout())
        .with_interrupts(interrupt_rx);

    if request.is_empty() {
        let mut session = session;
        session.run().await?;
    } else {
        info!("One-shot request: {:?}", request);
        let mut session = session.with_mode(ExecutionMode::Captured);
        session.process_line(&request.join(" ")).await?;
    }

    Ok(())
}
