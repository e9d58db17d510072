//! Interactive session: one turn at a time from input to history.
//!
//! Each line goes through:
//!
//! ```text
//! AwaitInput -> Dispatch -> directive            -> AwaitInput
//!                        -> cd                   -> AwaitInput
//!                        -> literal command      -> Execute -> AwaitInput
//!                        -> Translate -> Sanitize -> SafetyGate -> Execute -> AwaitInput
//! ```
//!
//! Literal commands typed by the user are never gated. Translated commands
//! pass through [`requires_confirmation`] first.

use crate::config::{Config, ConfigStore};
use crate::executor::CommandRunner;
use crate::history::History;
use crate::http_client::HttpClient;
use crate::llm_provider::{detect_provider, TranslationRequest};
use crate::menu::Menu;
use crate::provider_chain::MultiClient;
use crate::safety::{requires_confirmation, SafetyLevel};
use crate::setup::{resolve_key, select_model, ProviderSetup, API_KEY_PROMPT};
use crate::shell::ShellKind;
use crate::syntax::SyntaxChecker;
use crate::translation::{InputRoute, TranslationOutcome, TranslationPipeline};
use anyhow::Result;
use owo_colors::OwoColorize;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

/// Administrative commands handled by the session itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Help,
    Api,
    Model,
    Safety,
    History,
    Exit,
}

impl Directive {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            ".help" => Some(Directive::Help),
            ".api" => Some(Directive::Api),
            ".model" => Some(Directive::Model),
            ".safety" => Some(Directive::Safety),
            ".history" => Some(Directive::History),
            ".exit" => Some(Directive::Exit),
            _ => None,
        }
    }
}

/// Whether the loop keeps going after a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Continue,
    Exit,
}

/// How commands are run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Child inherits the terminal.
    #[default]
    Interactive,
    /// Output is captured and printed after the child exits.
    Captured,
}

#[derive(Debug)]
enum LineEvent {
    Line(String),
    Interrupted,
    Closed,
}

/// External collaborators a session talks to.
pub struct SessionDeps {
    pub syntax: Box<dyn SyntaxChecker>,
    pub runner: Box<dyn CommandRunner>,
    pub store: Box<dyn ConfigStore>,
    pub menu: Box<dyn Menu>,
    pub http: Arc<dyn HttpClient>,
}

/// A running assistant session.
///
/// Shell kind and safety level are fixed per session unless changed through
/// a directive, which also persists the change.
pub struct Session<R, W> {
    shell: ShellKind,
    safety: SafetyLevel,
    config: Config,
    pipeline: TranslationPipeline,
    history: History,
    deps: SessionDeps,
    input: R,
    output: W,
    interrupts: Option<UnboundedReceiver<()>>,
    mode: ExecutionMode,
}

impl<R, W> Session<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(
        shell: ShellKind,
        config: Config,
        pipeline: TranslationPipeline,
        deps: SessionDeps,
        input: R,
        output: W,
    ) -> Self {
        Self {
            shell,
            safety: config.safety_level,
            config,
            pipeline,
            history: History::new(),
            deps,
            input,
            output,
            interrupts: None,
            mode: ExecutionMode::default(),
        }
    }

    /// Attaches the channel fed by the Ctrl+C listener.
    pub fn with_interrupts(mut self, interrupts: UnboundedReceiver<()>) -> Self {
        self.interrupts = Some(interrupts);
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn shell(&self) -> ShellKind {
        self.shell
    }

    pub fn safety(&self) -> SafetyLevel {
        self.safety
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn pipeline(&self) -> &TranslationPipeline {
        &self.pipeline
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    /// Runs turns until `.exit` or end of input.
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner()?;

        loop {
            self.drain_interrupts();
            self.print_prompt()?;

            match self.next_line().await? {
                LineEvent::Closed => {
                    writeln!(self.output)?;
                    break;
                }
                LineEvent::Interrupted => {
                    writeln!(self.output)?;
                }
                LineEvent::Line(line) => {
                    if self.process_line(&line).await? == TurnOutcome::Exit {
                        break;
                    }
                }
            }
        }

        info!("Session ended");
        Ok(())
    }

    /// Dispatches a single line of input.
    pub async fn process_line(&mut self, line: &str) -> Result<TurnOutcome> {
        let input = line.trim();
        if input.is_empty() {
            return Ok(TurnOutcome::Continue);
        }

        if let Some(directive) = Directive::parse(input) {
            return self.handle_directive(directive).await;
        }

        if let Some(path) = cd_target(input) {
            self.change_directory(input, path)?;
            return Ok(TurnOutcome::Continue);
        }

        match self.pipeline.route(self.deps.syntax.as_ref(), self.shell, input) {
            InputRoute::Literal => self.run_command(input)?,
            InputRoute::NaturalLanguage => self.translate_and_run(input).await?,
        }
        Ok(TurnOutcome::Continue)
    }

    async fn translate_and_run(&mut self, input: &str) -> Result<()> {
        let cwd = self.deps.runner.current_dir();
        let request = TranslationRequest {
            input,
            cwd: &cwd,
            shell: self.shell,
            history: &self.history,
        };

        let command = match self.pipeline.translate(&request).await {
            Ok(TranslationOutcome::Command(command)) => command,
            Ok(TranslationOutcome::Untranslatable) => {
                writeln!(self.output, "{}", "Error: Could not translate to a command.".red())?;
                return Ok(());
            }
            Err(e) => {
                warn!("Translation failed: {}", e);
                writeln!(self.output, "{}", format!("Error: {}", e).red())?;
                return Ok(());
            }
        };

        writeln!(self.output, "  {}", command.yellow())?;

        if requires_confirmation(&command, self.safety) && !self.confirm().await? {
            writeln!(self.output, "Cancelled.")?;
            return Ok(());
        }

        self.run_command(&command)
    }

    /// Blocks for the safety-gate acknowledgement.
    async fn confirm(&mut self) -> Result<bool> {
        write!(
            self.output,
            "{} ",
            "Execute this command? [Enter to run / Ctrl+C to cancel]".cyan()
        )?;
        self.output.flush()?;

        match self.next_line().await? {
            LineEvent::Line(answer) => {
                let approved = is_acknowledgement(&answer);
                debug!("Confirmation answer {:?} -> {}", answer.trim(), approved);
                Ok(approved)
            }
            LineEvent::Interrupted | LineEvent::Closed => {
                writeln!(self.output)?;
                Ok(false)
            }
        }
    }

    fn run_command(&mut self, command: &str) -> Result<()> {
        if let Some(path) = cd_target(command) {
            return self.change_directory(command, path);
        }

        let error = match self.mode {
            ExecutionMode::Interactive => self
                .deps
                .runner
                .execute_interactive(command)
                .err()
                .map(|e| e.to_string()),
            ExecutionMode::Captured => {
                let output = self.deps.runner.execute(command);
                write!(self.output, "{}", output.stdout)?;
                if !output.stderr.is_empty() {
                    eprint!("{}", output.stderr);
                }
                output.error
            }
        };

        if let Some(e) = &error {
            debug!("{} failed: {}", command, e);
        }
        self.history.append(command, error.unwrap_or_default());
        Ok(())
    }

    fn change_directory(&mut self, command: &str, path: &str) -> Result<()> {
        if let Err(e) = self.deps.runner.change_directory(path) {
            writeln!(self.output, "{}", e.to_string().red())?;
        }
        self.history.append(command, "");
        Ok(())
    }

    async fn handle_directive(&mut self, directive: Directive) -> Result<TurnOutcome> {
        info!("Directive: {:?}", directive);
        match directive {
            Directive::Help => self.print_help()?,
            Directive::Api => self.change_api().await?,
            Directive::Model => self.change_model().await?,
            Directive::Safety => self.change_safety()?,
            Directive::History => writeln!(self.output, "{}", self.history.render())?,
            Directive::Exit => return Ok(TurnOutcome::Exit),
        }
        Ok(TurnOutcome::Continue)
    }

    async fn change_api(&mut self) -> Result<()> {
        write!(self.output, "{}", API_KEY_PROMPT)?;
        self.output.flush()?;

        let key = match self.next_line().await? {
            LineEvent::Line(line) => line.trim().to_string(),
            LineEvent::Interrupted | LineEvent::Closed => {
                writeln!(self.output)?;
                return Ok(());
            }
        };
        if key.is_empty() {
            writeln!(self.output, "{}", "Error: empty API key".red())?;
            return Ok(());
        }

        let setup = resolve_key(&key, self.deps.http.as_ref(), self.deps.menu.as_ref(), &mut self.output).await?;
        if let Some(setup) = setup {
            self.switch_provider(key, setup)?;
        }
        Ok(())
    }

    async fn change_model(&mut self) -> Result<()> {
        let Some(key) = self.config.api_key().map(str::to_string) else {
            writeln!(self.output, "{}", "Error: No API key found. Please use .api first.".red())?;
            return Ok(());
        };

        let selection = detect_provider(&key, self.deps.http.as_ref()).await;
        let Some(kind) = selection.primary else {
            writeln!(self.output, "{}", "Error: API key is not recognized. Please use .api.".red())?;
            return Ok(());
        };

        let model = select_model(kind, &key, self.deps.http.as_ref(), self.deps.menu.as_ref(), &mut self.output).await?;
        self.switch_provider(key, ProviderSetup { selection, model })
    }

    /// Persists the new key/model and rebuilds the provider chain.
    fn switch_provider(&mut self, key: String, setup: ProviderSetup) -> Result<()> {
        let Some(client) = MultiClient::from_selection(
            &setup.selection,
            &key,
            Some(&setup.model),
            self.deps.http.clone(),
        ) else {
            return Ok(());
        };

        let config = Config {
            api_key: Some(key),
            model: Some(setup.model),
            safety_level: self.safety,
        };
        if let Err(e) = self.deps.store.save(&config) {
            writeln!(self.output, "{}", format!("Error saving config: {}", e).red())?;
            return Ok(());
        }

        self.config = config;
        self.pipeline = TranslationPipeline::new(client);
        writeln!(
            self.output,
            "Switched to {} ({})",
            self.pipeline.client().primary_name(),
            self.pipeline.client().primary_model()
        )?;
        Ok(())
    }

    fn change_safety(&mut self) -> Result<()> {
        let options: Vec<String> = SafetyLevel::ALL.iter().map(|level| level.menu_label()).collect();
        let Some(level) = self
            .deps
            .menu
            .choose(&options, "Safety Levels")
            .and_then(|choice| SafetyLevel::from_menu_label(&choice))
        else {
            return Ok(());
        };

        let config = Config {
            safety_level: level,
            ..self.config.clone()
        };
        if let Err(e) = self.deps.store.save(&config) {
            writeln!(self.output, "{}", format!("Error saving config: {}", e).red())?;
            return Ok(());
        }

        self.config = config;
        self.safety = level;
        writeln!(self.output, "Safety level set to: {}", level.yellow())?;
        Ok(())
    }

    async fn next_line(&mut self) -> Result<LineEvent> {
        let mut line = Vec::new();
        let Self { input, interrupts, .. } = self;
        let read = input.read_until(b'\n', &mut line);

        let bytes = match interrupts {
            Some(rx) => tokio::select! {
                result = read => result?,
                Some(()) = rx.recv() => return Ok(LineEvent::Interrupted),
            },
            None => read.await?,
        };

        if bytes == 0 {
            return Ok(LineEvent::Closed);
        }
        Ok(LineEvent::Line(String::from_utf8_lossy(&line).into_owned()))
    }

    /// Discards interrupts that arrived while a command was running.
    fn drain_interrupts(&mut self) {
        if let Some(rx) = &mut self.interrupts {
            while rx.try_recv().is_ok() {}
        }
    }

    fn print_prompt(&mut self) -> Result<()> {
        let cwd = self.deps.runner.current_dir();
        write!(self.output, "{} ", format!("{}>", cwd.display()).purple())?;
        self.output.flush()?;
        Ok(())
    }

    fn print_status(&mut self) -> Result<()> {
        let client = self.pipeline.client();
        writeln!(self.output, "Shell:    {}", self.shell.display_name().yellow())?;
        writeln!(self.output, "Provider: {}", client.primary_name().yellow())?;
        writeln!(self.output, "Model:    {}", client.primary_model().yellow())?;
        Ok(())
    }

    fn print_banner(&mut self) -> Result<()> {
        self.print_status()?;
        writeln!(self.output)?;
        Ok(())
    }

    fn print_help(&mut self) -> Result<()> {
        writeln!(self.output, "\n{}\n", "nlsh - Natural Language Shell".cyan().bold())?;
        self.print_status()?;
        writeln!(self.output, "Safety:   {}\n", self.safety.yellow())?;
        writeln!(self.output, "Usage:")?;
        writeln!(self.output, "  Type naturally   Translated to a shell command")?;
        writeln!(self.output, "  Type command     Runs directly (syntax validated)")?;
        writeln!(self.output, "  cd <path>        Change directory")?;
        writeln!(self.output)?;
        writeln!(self.output, "Special commands:")?;
        writeln!(self.output, "  .help            Show this help")?;
        writeln!(self.output, "  .api             Change API key and model")?;
        writeln!(self.output, "  .model           Change model only")?;
        writeln!(self.output, "  .safety          Change safety level (Instant, Lax, Cautious, Strict)")?;
        writeln!(self.output, "  .history         Show the context sent with translations")?;
        writeln!(self.output, "  .exit            Exit nlsh")?;
        writeln!(self.output)?;
        Ok(())
    }
}

/// Target of a `cd` form, if `input` is one. Bare `cd` yields `""`.
pub fn cd_target(input: &str) -> Option<&str> {
    let input = input.trim();
    if input == "cd" {
        return Some("");
    }
    input.strip_prefix("cd ").map(str::trim)
}

/// Empty, `y` and `yes` approve a gated command.
fn is_acknowledgement(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "" | "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_parsing() {
        assert_eq!(Directive::parse(".help"), Some(Directive::Help));
        assert_eq!(Directive::parse(" .EXIT "), Some(Directive::Exit));
        assert_eq!(Directive::parse(".Safety"), Some(Directive::Safety));
        assert_eq!(Directive::parse("help"), None);
        assert_eq!(Directive::parse(".uninstall"), None);
    }

    #[test]
    fn test_cd_target() {
        assert_eq!(cd_target("cd"), Some(""));
        assert_eq!(cd_target("cd /tmp"), Some("/tmp"));
        assert_eq!(cd_target("cd   ../x  "), Some("../x"));
        assert_eq!(cd_target("cdrecord"), None);
        assert_eq!(cd_target("echo cd"), None);
    }

    #[test]
    fn test_acknowledgement() {
        assert!(is_acknowledgement("\n"));
        assert!(is_acknowledgement("y\n"));
        assert!(is_acknowledgement("YES"));
        assert!(!is_acknowledgement("n"));
        assert!(!is_acknowledgement("no thanks"));
    }
}
