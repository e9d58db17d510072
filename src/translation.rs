//! Turning user input into an executable command.
//!
//! Input that the shell already accepts runs as typed. Everything else goes
//! through the provider chain, and the model's reply is normalized into a
//! bare command string.

use crate::llm_provider::{ProviderError, TranslationRequest};
use crate::provider_chain::MultiClient;
use crate::shell::ShellKind;
use crate::syntax::SyntaxChecker;
use tracing::{debug, info};

/// Labels some models prepend to the command.
const SHELL_LABELS: &[&str] = &["powershell", "pwsh", "bash", "zsh", "fish", "cmd"];

/// How a line of input will be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRoute {
    /// Already a valid command for the shell; run it directly.
    Literal,
    /// Needs translation.
    NaturalLanguage,
}

/// Result of a translation that reached a provider successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationOutcome {
    Command(String),
    /// The reply sanitized down to nothing.
    Untranslatable,
}

/// Routes input and translates natural language through a [`MultiClient`].
pub struct TranslationPipeline {
    client: MultiClient,
}

impl TranslationPipeline {
    pub fn new(client: MultiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &MultiClient {
        &self.client
    }

    /// Decides whether `input` is a literal command or a request.
    pub fn route(&self, checker: &dyn SyntaxChecker, shell: ShellKind, input: &str) -> InputRoute {
        let route = if checker.is_valid_syntax(shell, input) {
            InputRoute::Literal
        } else {
            InputRoute::NaturalLanguage
        };
        info!("Routing {:?} as {:?}", input, route);
        route
    }

    /// Translates a request and sanitizes the reply.
    ///
    /// # Errors
    ///
    /// Returns the last provider failure once the whole chain is exhausted.
    pub async fn translate(&self, request: &TranslationRequest<'_>) -> Result<TranslationOutcome, ProviderError> {
        let raw = self.client.translate(request).await?;
        let command = sanitize(&raw);
        debug!("Sanitized {:?} into {:?}", raw, command);
        if command.is_empty() {
            Ok(TranslationOutcome::Untranslatable)
        } else {
            Ok(TranslationOutcome::Command(command))
        }
    }
}

/// Normalizes a model reply into a bare command.
///
/// Strips a surrounding code fence (including its language tag line), stray
/// backticks, and a single leading shell-name label.
pub fn sanitize(raw: &str) -> String {
    let mut command = raw.trim().to_string();

    if command.starts_with("```") {
        let lines: Vec<&str> = command.lines().collect();
        if lines.len() > 2 {
            command = lines[1..lines.len() - 1].join("\n");
        }
    }

    let command = command.trim_matches('`').trim();
    strip_shell_label(command).trim().to_string()
}

fn strip_shell_label(command: &str) -> &str {
    for label in SHELL_LABELS {
        let head = command.get(..label.len());
        let separator = command.get(label.len()..label.len() + 1);
        if head.is_some_and(|h| h.eq_ignore_ascii_case(label)) && separator == Some(" ") {
            return &command[label.len() + 1..];
        }
    }
    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::History;
    use crate::provider_chain::tests::FakeProvider;
    use std::path::Path;

    struct FixedChecker(bool);

    impl SyntaxChecker for FixedChecker {
        fn is_valid_syntax(&self, _kind: ShellKind, _text: &str) -> bool {
            self.0
        }
    }

    fn pipeline_replying(reply: &str) -> TranslationPipeline {
        TranslationPipeline::new(MultiClient::new(Box::new(FakeProvider::ok("A", reply)), vec![]))
    }

    #[test]
    fn test_sanitize_fenced_block() {
        assert_eq!(sanitize("```bash\nls -la\n```"), "ls -la");
        assert_eq!(sanitize("```\nfind . -name '*.rs'\n```"), "find . -name '*.rs'");
    }

    #[test]
    fn test_sanitize_keeps_multiline_interior() {
        assert_eq!(sanitize("```sh\ncd /tmp\nls\n```"), "cd /tmp\nls");
    }

    #[test]
    fn test_sanitize_inline_backticks() {
        assert_eq!(sanitize("`git status`"), "git status");
        assert_eq!(sanitize("  ``pwd``  \n"), "pwd");
    }

    #[test]
    fn test_sanitize_strips_shell_label() {
        assert_eq!(sanitize("powershell Get-ChildItem"), "Get-ChildItem");
        assert_eq!(sanitize("Bash ls -la"), "ls -la");
        assert_eq!(sanitize("```\nzsh   echo hi\n```"), "echo hi");
    }

    #[test]
    fn test_sanitize_strips_only_one_label() {
        assert_eq!(sanitize("bash bash script.sh"), "bash script.sh");
    }

    #[test]
    fn test_sanitize_label_needs_following_space() {
        assert_eq!(sanitize("bashtop"), "bashtop");
        assert_eq!(sanitize("fishing"), "fishing");
        assert_eq!(sanitize("pwsh"), "pwsh");
    }

    #[test]
    fn test_sanitize_empty_results() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("```\n\n```"), "");
        assert_eq!(sanitize("``` ```"), "");
        assert_eq!(sanitize("bash "), "bash");
    }

    #[test]
    fn test_sanitize_short_fence_is_trimmed_of_backticks() {
        assert_eq!(sanitize("```ls```"), "ls");
    }

    #[test]
    fn test_sanitize_non_ascii_prefix_does_not_panic() {
        assert_eq!(sanitize("éééé ls"), "éééé ls");
        assert_eq!(sanitize("ü"), "ü");
    }

    #[test]
    fn test_route_uses_checker() {
        let pipeline = pipeline_replying("ls");
        assert_eq!(
            pipeline.route(&FixedChecker(true), ShellKind::Bash, "ls"),
            InputRoute::Literal
        );
        assert_eq!(
            pipeline.route(&FixedChecker(false), ShellKind::Bash, "list files"),
            InputRoute::NaturalLanguage
        );
    }

    #[tokio::test]
    async fn test_translate_sanitizes_reply() {
        let pipeline = pipeline_replying("```bash\nls -la\n```");
        let history = History::new();
        let request = TranslationRequest {
            input: "list files",
            cwd: Path::new("/"),
            shell: ShellKind::Bash,
            history: &history,
        };
        assert_eq!(
            pipeline.translate(&request).await.unwrap(),
            TranslationOutcome::Command("ls -la".to_string())
        );
    }

    #[tokio::test]
    async fn test_translate_empty_after_sanitizing() {
        let pipeline = pipeline_replying("```\n```\n```");
        let history = History::new();
        let request = TranslationRequest {
            input: "do the impossible",
            cwd: Path::new("/"),
            shell: ShellKind::Bash,
            history: &history,
        };
        assert_eq!(pipeline.translate(&request).await.unwrap(), TranslationOutcome::Untranslatable);
    }
}
