//! Language-model backends that translate requests into shell commands.
//!
//! Every vendor shares one contract ([`Provider::translate`]) and one prompt;
//! they differ only in endpoint, authentication and JSON envelope. Those
//! differences are dispatched on [`ProviderKind`] inside [`ApiProvider`].

use crate::history::History;
use crate::http_client::{HttpClient, HttpResponse};
use crate::shell::ShellKind;
use anyhow::anyhow;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const GOOGLE_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Supported vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Google,
    Groq,
}

impl ProviderKind {
    /// Order used by the key verification probe.
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Google,
        ProviderKind::Groq,
    ];

    /// Stable identifier, e.g. `"openai"`.
    pub fn id(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Google => "google",
            ProviderKind::Groq => "groq",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::Google => "Google",
            ProviderKind::Groq => "Groq",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::Anthropic => "claude-3-haiku-20240307",
            ProviderKind::Google => "gemini-2.5-flash",
            ProviderKind::Groq => "llama-3.3-70b-versatile",
        }
    }

    /// Models offered when the vendor's listing endpoint is unavailable.
    pub fn known_models(self) -> &'static [&'static str] {
        match self {
            ProviderKind::OpenAi => &["gpt-4o", "gpt-4o-mini", "gpt-4-turbo", "gpt-3.5-turbo"],
            ProviderKind::Anthropic => &[
                "claude-sonnet-4-20250514",
                "claude-3-5-haiku-20241022",
                "claude-3-haiku-20240307",
            ],
            ProviderKind::Google => &[
                "gemini-2.5-flash",
                "gemini-2.0-flash",
                "gemini-1.5-flash",
                "gemini-1.5-pro",
            ],
            ProviderKind::Groq => &[
                "llama-3.3-70b-versatile",
                "llama-3.1-8b-instant",
                "mixtral-8x7b-32768",
                "gemma2-9b-it",
            ],
        }
    }

    fn max_tokens(self) -> u32 {
        match self {
            ProviderKind::Groq => 150,
            _ => 100,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow!("Unknown provider: {}", s))
    }
}

/// Why a single provider failed to produce a command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{provider} request failed: {message}")]
    Transport { provider: String, message: String },

    #[error("{provider} API error (HTTP {status}): {message}")]
    Status {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider} returned an unexpected response: {message}")]
    Malformed { provider: String, message: String },

    #[error("{provider} returned no command")]
    Empty { provider: String },
}

/// Everything a provider needs to translate one request.
#[derive(Debug, Clone, Copy)]
pub struct TranslationRequest<'a> {
    pub input: &'a str,
    pub cwd: &'a Path,
    pub shell: ShellKind,
    pub history: &'a History,
}

/// Builds the translation prompt shared by every vendor.
pub fn build_prompt(request: &TranslationRequest<'_>) -> String {
    format!(
        "You are a command line expert and translation assistant.
Target Shell: {shell}
OS: {os}
Current Directory: {cwd}

Previous commands for context:
{history}

User Request: {input}

Instructions:
1. Output ONLY the raw shell command to execute.
2. Do NOT use markdown formatting (no backticks).
3. Do NOT provide explanations or warnings.
4. If a file size is specified (e.g., \"10mb\"), translate it to the appropriate shell constraint (e.g., in PowerShell use '-lt 10MB').
5. Do NOT recurse through subdirectories (e.g., no '-Recurse' in PowerShell or '-R' in ls) unless the user explicitly asks for it (e.g., uses words like \"recursively\", \"everywhere\", \"globally\", \"in all subfolders\"). \"All files\" means all files in the CURRENT directory only.
6. If the request is ambiguous, provide the most likely intended command.
7. If you cannot find a valid command, output an empty string.",
        shell = request.shell.display_name(),
        os = std::env::consts::OS,
        cwd = request.cwd.display(),
        history = request.history.render(),
        input = request.input,
    )
}

/// A backend able to turn natural language into a shell command.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Display name, e.g. `"OpenAI"`.
    fn name(&self) -> &str;

    /// Model identifier used for requests.
    fn model(&self) -> &str;

    /// Translates the request into raw command text (not yet sanitized).
    async fn translate(&self, request: &TranslationRequest<'_>) -> Result<String, ProviderError>;
}

/// URL plus headers for one vendor call.
struct Endpoint {
    url: String,
    headers: Vec<(&'static str, String)>,
}

impl Endpoint {
    fn header_refs(&self) -> Vec<(&str, &str)> {
        self.headers.iter().map(|(k, v)| (*k, v.as_str())).collect()
    }
}

// Response envelopes. Fields are optional so a structurally valid but empty
// reply is reported as `Empty` rather than `Malformed`.

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicMessage {
    #[serde(default)]
    content: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct TextPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContent {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelId>,
}

#[derive(Debug, Deserialize)]
struct ModelId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GoogleModelList {
    #[serde(default)]
    models: Vec<GoogleModel>,
}

#[derive(Debug, Deserialize)]
struct GoogleModel {
    name: String,
}

/// HTTP-backed provider for any [`ProviderKind`].
pub struct ApiProvider {
    kind: ProviderKind,
    api_key: String,
    model: String,
    http: Arc<dyn HttpClient>,
}

impl ApiProvider {
    /// Creates a provider; an empty `model` selects the vendor default.
    pub fn new(kind: ProviderKind, api_key: &str, model: Option<&str>, http: Arc<dyn HttpClient>) -> Self {
        let model = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(kind.default_model())
            .to_string();
        Self {
            kind,
            api_key: api_key.to_string(),
            model,
            http,
        }
    }

    fn completion_endpoint(&self) -> Endpoint {
        let key = self.api_key.clone();
        match self.kind {
            ProviderKind::OpenAi => Endpoint {
                url: "https://api.openai.com/v1/chat/completions".to_string(),
                headers: vec![
                    ("Authorization", format!("Bearer {}", key)),
                    ("Content-Type", "application/json".to_string()),
                ],
            },
            ProviderKind::Anthropic => Endpoint {
                url: "https://api.anthropic.com/v1/messages".to_string(),
                headers: vec![
                    ("x-api-key", key),
                    ("anthropic-version", ANTHROPIC_VERSION.to_string()),
                    ("Content-Type", "application/json".to_string()),
                ],
            },
            ProviderKind::Google => Endpoint {
                url: format!("{}/{}:generateContent?key={}", GOOGLE_BASE, self.model, key),
                headers: vec![("Content-Type", "application/json".to_string())],
            },
            ProviderKind::Groq => Endpoint {
                url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
                headers: vec![
                    ("Authorization", format!("Bearer {}", key)),
                    ("Content-Type", "application/json".to_string()),
                ],
            },
        }
    }

    fn completion_body(&self, prompt: &str) -> serde_json::Value {
        match self.kind {
            ProviderKind::Google => json!({
                "contents": [
                    { "parts": [ { "text": prompt } ] }
                ]
            }),
            _ => json!({
                "model": self.model,
                "messages": [
                    { "role": "user", "content": prompt }
                ],
                "max_tokens": self.kind.max_tokens(),
            }),
        }
    }

    /// Pulls the command text out of a successful response body.
    fn extract_text(&self, body: &str) -> Result<String, ProviderError> {
        let malformed = |e: serde_json::Error| ProviderError::Malformed {
            provider: self.kind.display_name().to_string(),
            message: e.to_string(),
        };

        let text = match self.kind {
            ProviderKind::OpenAi | ProviderKind::Groq => serde_json::from_str::<ChatCompletion>(body)
                .map_err(malformed)?
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message)
                .and_then(|message| message.content),
            ProviderKind::Anthropic => serde_json::from_str::<AnthropicMessage>(body)
                .map_err(malformed)?
                .content
                .into_iter()
                .next()
                .and_then(|part| part.text),
            ProviderKind::Google => serde_json::from_str::<GenerateContent>(body)
                .map_err(malformed)?
                .candidates
                .into_iter()
                .next()
                .and_then(|candidate| candidate.content)
                .and_then(|content| content.parts.into_iter().next())
                .and_then(|part| part.text),
        };

        match text.map(|t| t.trim().to_string()) {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(ProviderError::Empty {
                provider: self.kind.display_name().to_string(),
            }),
        }
    }
}

#[async_trait]
impl Provider for ApiProvider {
    fn name(&self) -> &str {
        self.kind.display_name()
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn translate(&self, request: &TranslationRequest<'_>) -> Result<String, ProviderError> {
        let prompt = build_prompt(request);
        let endpoint = self.completion_endpoint();
        let body = self.completion_body(&prompt);

        info!("Requesting translation from {} ({})", self.kind, self.model);
        let response = self
            .http
            .post_json(&endpoint.url, &endpoint.header_refs(), &body)
            .await
            .map_err(|e| transport_error(self.kind, e))?;
        check_status(self.kind, &response)?;

        let text = self.extract_text(&response.body)?;
        debug!("{} replied: {}", self.kind, text);
        Ok(text)
    }
}

fn transport_error(kind: ProviderKind, e: anyhow::Error) -> ProviderError {
    ProviderError::Transport {
        provider: kind.display_name().to_string(),
        message: e.to_string(),
    }
}

/// Maps a non-2xx response to [`ProviderError::Status`].
fn check_status(kind: ProviderKind, response: &HttpResponse) -> Result<(), ProviderError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ProviderError::Status {
        provider: kind.display_name().to_string(),
        status: response.status,
        message: error_message(&response.body),
    })
}

/// Best-effort extraction of a vendor error message.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let error = &value["error"];
        if let Some(message) = error["message"].as_str().or_else(|| error.as_str()) {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.chars().count() > 200 {
        format!("{}...", trimmed.chars().take(200).collect::<String>())
    } else {
        trimmed.to_string()
    }
}

fn models_endpoint(kind: ProviderKind, api_key: &str) -> Endpoint {
    match kind {
        ProviderKind::OpenAi => Endpoint {
            url: "https://api.openai.com/v1/models".to_string(),
            headers: vec![("Authorization", format!("Bearer {}", api_key))],
        },
        ProviderKind::Anthropic => Endpoint {
            url: "https://api.anthropic.com/v1/models".to_string(),
            headers: vec![
                ("x-api-key", api_key.to_string()),
                ("anthropic-version", ANTHROPIC_VERSION.to_string()),
            ],
        },
        ProviderKind::Google => Endpoint {
            url: format!("{}?key={}", GOOGLE_BASE, api_key),
            headers: vec![],
        },
        ProviderKind::Groq => Endpoint {
            url: "https://api.groq.com/openai/v1/models".to_string(),
            headers: vec![("Authorization", format!("Bearer {}", api_key))],
        },
    }
}

/// Lists the models the vendor exposes for `api_key`.
///
/// OpenAI and Groq listings are sorted; Google names lose their `models/`
/// prefix. A non-2xx response is an error.
pub async fn fetch_models(
    kind: ProviderKind,
    api_key: &str,
    http: &dyn HttpClient,
) -> Result<Vec<String>, ProviderError> {
    let endpoint = models_endpoint(kind, api_key);
    let response = http
        .get(&endpoint.url, &endpoint.header_refs())
        .await
        .map_err(|e| transport_error(kind, e))?;
    check_status(kind, &response)?;

    let malformed = |e: serde_json::Error| ProviderError::Malformed {
        provider: kind.display_name().to_string(),
        message: e.to_string(),
    };

    let models = match kind {
        ProviderKind::Google => serde_json::from_str::<GoogleModelList>(&response.body)
            .map_err(malformed)?
            .models
            .into_iter()
            .map(|m| m.name.strip_prefix("models/").unwrap_or(&m.name).to_string())
            .collect(),
        ProviderKind::OpenAi | ProviderKind::Groq => {
            let mut ids: Vec<String> = serde_json::from_str::<ModelList>(&response.body)
                .map_err(malformed)?
                .data
                .into_iter()
                .map(|m| m.id)
                .collect();
            ids.sort();
            ids
        }
        ProviderKind::Anthropic => serde_json::from_str::<ModelList>(&response.body)
            .map_err(malformed)?
            .data
            .into_iter()
            .map(|m| m.id)
            .collect(),
    };
    Ok(models)
}

/// Live model listing, or the built-in list when that fails or is empty.
pub async fn available_models(kind: ProviderKind, api_key: &str, http: &dyn HttpClient) -> Vec<String> {
    match fetch_models(kind, api_key, http).await {
        Ok(models) if !models.is_empty() => models,
        Ok(_) => kind.known_models().iter().map(|m| m.to_string()).collect(),
        Err(e) => {
            warn!("Could not list {} models: {}", kind, e);
            kind.known_models().iter().map(|m| m.to_string()).collect()
        }
    }
}

/// Primary provider and ordered fallbacks inferred from an API key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSelection {
    pub primary: Option<ProviderKind>,
    pub fallbacks: Vec<ProviderKind>,
}

impl ProviderSelection {
    pub fn single(kind: ProviderKind) -> Self {
        Self {
            primary: Some(kind),
            fallbacks: Vec::new(),
        }
    }
}

/// Infers the provider from the key's prefix without any network call.
pub fn provider_for_prefix(api_key: &str) -> Option<ProviderSelection> {
    let key = api_key.trim();
    if key.starts_with("sk-proj-") {
        Some(ProviderSelection::single(ProviderKind::OpenAi))
    } else if key.starts_with("sk-ant-") {
        Some(ProviderSelection::single(ProviderKind::Anthropic))
    } else if key.starts_with("sk-") {
        Some(ProviderSelection {
            primary: Some(ProviderKind::OpenAi),
            fallbacks: vec![ProviderKind::Anthropic],
        })
    } else if key.starts_with("AIza") {
        Some(ProviderSelection::single(ProviderKind::Google))
    } else if key.starts_with("gsk_") {
        Some(ProviderSelection::single(ProviderKind::Groq))
    } else {
        None
    }
}

/// Identifies the provider for `api_key`.
///
/// Known prefixes are resolved locally. Anything else is probed against each
/// vendor's model listing in [`ProviderKind::ALL`] order; the first 2xx wins.
/// No match yields an empty selection.
pub async fn detect_provider(api_key: &str, http: &dyn HttpClient) -> ProviderSelection {
    if let Some(selection) = provider_for_prefix(api_key) {
        return selection;
    }

    match verify_key(api_key.trim(), http).await {
        Some(kind) => ProviderSelection::single(kind),
        None => ProviderSelection::default(),
    }
}

/// Probes each vendor with a lightweight authenticated call.
pub async fn verify_key(api_key: &str, http: &dyn HttpClient) -> Option<ProviderKind> {
    for kind in ProviderKind::ALL {
        match fetch_models(kind, api_key, http).await {
            Ok(_) => {
                info!("API key verified against {}", kind);
                return Some(kind);
            }
            Err(e) => debug!("Key probe against {} failed: {}", kind, e),
        }
    }
    warn!("API key not accepted by any known provider");
    None
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::Mutex;

    /// Recorded outbound request.
    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub method: &'static str,
        pub url: String,
        pub headers: Vec<(String, String)>,
        pub body: Option<serde_json::Value>,
    }

    /// Mock HTTP client routing by URL substring.
    ///
    /// Unrouted URLs answer 404.
    pub struct MockHttpClient {
        routes: Vec<(String, Result<HttpResponse, String>)>,
        pub requests: Mutex<Vec<RecordedRequest>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self {
                routes: Vec::new(),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn route(mut self, url_part: &str, status: u16, body: &str) -> Self {
            self.routes
                .push((url_part.to_string(), Ok(HttpResponse::new(status, body))));
            self
        }

        pub fn fail(mut self, url_part: &str, message: &str) -> Self {
            self.routes.push((url_part.to_string(), Err(message.to_string())));
            self
        }

        fn respond(&self, url: &str) -> Result<HttpResponse> {
            for (part, response) in &self.routes {
                if url.contains(part.as_str()) {
                    return response.clone().map_err(|m| anyhow!(m));
                }
            }
            Ok(HttpResponse::new(404, "{\"error\":{\"message\":\"not found\"}}"))
        }

        fn record(&self, method: &'static str, url: &str, headers: &[(&str, &str)], body: Option<&serde_json::Value>) {
            self.requests.lock().unwrap().push(RecordedRequest {
                method,
                url: url.to_string(),
                headers: headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
                body: body.cloned(),
            });
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn post_json(
            &self,
            url: &str,
            headers: &[(&str, &str)],
            body: &serde_json::Value,
        ) -> Result<HttpResponse> {
            self.record("POST", url, headers, Some(body));
            self.respond(url)
        }

        async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
            self.record("GET", url, headers, None);
            self.respond(url)
        }
    }

    fn request<'a>(history: &'a History, cwd: &'a Path) -> TranslationRequest<'a> {
        TranslationRequest {
            input: "list all files",
            cwd,
            shell: ShellKind::Bash,
            history,
        }
    }

    fn provider(kind: ProviderKind, http: Arc<MockHttpClient>) -> ApiProvider {
        ApiProvider::new(kind, "test-key", None, http)
    }

    #[test]
    fn test_prompt_mentions_context() {
        let mut history = History::new();
        history.append("pwd", "");
        let cwd = Path::new("/home/user/project");
        let prompt = build_prompt(&request(&history, cwd));

        assert!(prompt.contains("Target Shell: Bash"));
        assert!(prompt.contains("Current Directory: /home/user/project"));
        assert!(prompt.contains("$ pwd"));
        assert!(prompt.contains("User Request: list all files"));
        assert!(prompt.contains("Output ONLY the raw shell command"));
        assert!(prompt.contains("Do NOT use markdown"));
    }

    #[test]
    fn test_default_models() {
        let http = Arc::new(MockHttpClient::new());
        assert_eq!(provider(ProviderKind::OpenAi, http.clone()).model(), "gpt-4o-mini");
        assert_eq!(provider(ProviderKind::Groq, http.clone()).model(), "llama-3.3-70b-versatile");
        let custom = ApiProvider::new(ProviderKind::Google, "k", Some("gemini-1.5-pro"), http.clone());
        assert_eq!(custom.model(), "gemini-1.5-pro");
        let blank = ApiProvider::new(ProviderKind::Anthropic, "k", Some("  "), http);
        assert_eq!(blank.model(), "claude-3-haiku-20240307");
    }

    #[tokio::test]
    async fn test_openai_wire_format() {
        let http = Arc::new(MockHttpClient::new().route(
            "api.openai.com/v1/chat/completions",
            200,
            r#"{"choices":[{"message":{"content":"  ls -la\n"}}]}"#,
        ));
        let history = History::new();
        let cwd = Path::new("/tmp");

        let result = provider(ProviderKind::OpenAi, http.clone())
            .translate(&request(&history, cwd))
            .await;
        assert_eq!(result.unwrap(), "ls -la");

        let sent = &http.requests()[0];
        assert_eq!(sent.method, "POST");
        assert!(sent.headers.contains(&("Authorization".to_string(), "Bearer test-key".to_string())));
        let body = sent.body.as_ref().unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 100);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn test_anthropic_wire_format() {
        let http = Arc::new(MockHttpClient::new().route(
            "api.anthropic.com/v1/messages",
            200,
            r#"{"content":[{"type":"text","text":"git status"}]}"#,
        ));
        let history = History::new();
        let cwd = Path::new("/tmp");

        let result = provider(ProviderKind::Anthropic, http.clone())
            .translate(&request(&history, cwd))
            .await;
        assert_eq!(result.unwrap(), "git status");

        let sent = &http.requests()[0];
        assert!(sent.headers.contains(&("x-api-key".to_string(), "test-key".to_string())));
        assert!(sent.headers.contains(&("anthropic-version".to_string(), "2023-06-01".to_string())));
    }

    #[tokio::test]
    async fn test_google_wire_format() {
        let http = Arc::new(MockHttpClient::new().route(
            ":generateContent",
            200,
            r#"{"candidates":[{"content":{"parts":[{"text":"Get-ChildItem"}]}}]}"#,
        ));
        let history = History::new();
        let cwd = Path::new("/tmp");

        let result = provider(ProviderKind::Google, http.clone())
            .translate(&request(&history, cwd))
            .await;
        assert_eq!(result.unwrap(), "Get-ChildItem");

        let sent = &http.requests()[0];
        assert!(sent.url.contains("models/gemini-2.5-flash:generateContent?key=test-key"));
        let body = sent.body.as_ref().unwrap();
        assert!(body["contents"][0]["parts"][0]["text"].as_str().unwrap().contains("list all files"));
    }

    #[tokio::test]
    async fn test_groq_wire_format() {
        let http = Arc::new(MockHttpClient::new().route(
            "api.groq.com/openai/v1/chat/completions",
            200,
            r#"{"choices":[{"message":{"content":"df -h"}}]}"#,
        ));
        let history = History::new();
        let cwd = Path::new("/tmp");

        let result = provider(ProviderKind::Groq, http.clone())
            .translate(&request(&history, cwd))
            .await;
        assert_eq!(result.unwrap(), "df -h");
        assert_eq!(http.requests()[0].body.as_ref().unwrap()["max_tokens"], 150);
    }

    #[tokio::test]
    async fn test_non_success_status_is_failure() {
        let http = Arc::new(MockHttpClient::new().route(
            "api.groq.com",
            401,
            r#"{"error":{"message":"Invalid API Key"}}"#,
        ));
        let history = History::new();
        let cwd = Path::new("/tmp");

        let err = provider(ProviderKind::Groq, http)
            .translate(&request(&history, cwd))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ProviderError::Status {
                provider: "Groq".to_string(),
                status: 401,
                message: "Invalid API Key".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_empty_result_is_failure() {
        let http = Arc::new(
            MockHttpClient::new()
                .route("api.openai.com", 200, r#"{"choices":[]}"#)
                .route("api.anthropic.com", 200, r#"{"content":[{"text":"   "}]}"#),
        );
        let history = History::new();
        let cwd = Path::new("/tmp");

        let err = provider(ProviderKind::OpenAi, http.clone())
            .translate(&request(&history, cwd))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Empty { .. }));

        let err = provider(ProviderKind::Anthropic, http)
            .translate(&request(&history, cwd))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Empty { .. }));
    }

    #[tokio::test]
    async fn test_malformed_and_transport_failures() {
        let http = Arc::new(
            MockHttpClient::new()
                .route("api.openai.com", 200, "<html>gateway</html>")
                .fail("api.anthropic.com", "connection refused"),
        );
        let history = History::new();
        let cwd = Path::new("/tmp");

        let err = provider(ProviderKind::OpenAi, http.clone())
            .translate(&request(&history, cwd))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Malformed { .. }));

        let err = provider(ProviderKind::Anthropic, http)
            .translate(&request(&history, cwd))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_error_message_falls_back_to_body() {
        assert_eq!(error_message(r#"{"error":"quota exceeded"}"#), "quota exceeded");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
        assert!(error_message(&"z".repeat(300)).ends_with("..."));
    }

    #[tokio::test]
    async fn test_fetch_models_per_vendor() {
        let http = MockHttpClient::new()
            .route("api.openai.com/v1/models", 200, r#"{"data":[{"id":"gpt-4o"},{"id":"dall-e-3"}]}"#)
            .route("generativelanguage", 200, r#"{"models":[{"name":"models/gemini-2.5-flash"}]}"#)
            .route("api.anthropic.com/v1/models", 200, r#"{"data":[{"id":"claude-b"},{"id":"claude-a"}]}"#);

        let openai = fetch_models(ProviderKind::OpenAi, "k", &http).await.unwrap();
        assert_eq!(openai, vec!["dall-e-3", "gpt-4o"]);

        let google = fetch_models(ProviderKind::Google, "k", &http).await.unwrap();
        assert_eq!(google, vec!["gemini-2.5-flash"]);

        let anthropic = fetch_models(ProviderKind::Anthropic, "k", &http).await.unwrap();
        assert_eq!(anthropic, vec!["claude-b", "claude-a"]);
    }

    #[tokio::test]
    async fn test_available_models_falls_back_to_known_list() {
        let http = MockHttpClient::new().route("api.groq.com", 500, "oops");
        let models = available_models(ProviderKind::Groq, "k", &http).await;
        assert_eq!(models[0], "llama-3.3-70b-versatile");

        let http = MockHttpClient::new().route("api.openai.com", 200, r#"{"data":[]}"#);
        let models = available_models(ProviderKind::OpenAi, "k", &http).await;
        assert_eq!(models.len(), 4);
    }

    #[tokio::test]
    async fn test_detect_provider_by_prefix() {
        let http = MockHttpClient::new();

        let s = detect_provider("sk-proj-12345", &http).await;
        assert_eq!(s, ProviderSelection::single(ProviderKind::OpenAi));

        let s = detect_provider("sk-ant-12345", &http).await;
        assert_eq!(s, ProviderSelection::single(ProviderKind::Anthropic));

        let s = detect_provider("sk-12345", &http).await;
        assert_eq!(s.primary, Some(ProviderKind::OpenAi));
        assert_eq!(s.fallbacks, vec![ProviderKind::Anthropic]);

        let s = detect_provider("AIzaSyExample", &http).await;
        assert_eq!(s, ProviderSelection::single(ProviderKind::Google));

        let s = detect_provider("gsk_example", &http).await;
        assert_eq!(s, ProviderSelection::single(ProviderKind::Groq));

        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn test_unrecognized_key_without_probe_success_is_empty() {
        let http = MockHttpClient::new();
        let s = detect_provider("mystery-key", &http).await;
        assert_eq!(s.primary, None);
        assert!(s.fallbacks.is_empty());
        assert_eq!(http.requests().len(), 4);
    }

    #[tokio::test]
    async fn test_unrecognized_key_probes_in_order() {
        let http = MockHttpClient::new()
            .route("api.openai.com", 401, "{}")
            .route("api.anthropic.com", 401, "{}")
            .route("generativelanguage", 403, "{}")
            .route("api.groq.com/openai/v1/models", 200, r#"{"data":[{"id":"llama"}]}"#);

        let s = detect_provider("custom-key", &http).await;
        assert_eq!(s, ProviderSelection::single(ProviderKind::Groq));

        let urls: Vec<String> = http.requests().into_iter().map(|r| r.url).collect();
        assert!(urls[0].contains("openai.com"));
        assert!(urls[1].contains("anthropic.com"));
        assert!(urls[2].contains("generativelanguage"));
        assert!(urls[3].contains("groq.com"));
    }

    #[test]
    fn test_provider_kind_ids() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("Groq".parse::<ProviderKind>().unwrap(), ProviderKind::Groq);
        assert!("mistral".parse::<ProviderKind>().is_err());
        assert_eq!(ProviderKind::OpenAi.to_string(), "OpenAI");
    }
}
