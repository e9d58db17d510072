//! nlshell - a natural-language shell assistant.
//!
//! Lines typed at the prompt either run as-is, when the active shell already
//! accepts them, or are translated into a command by an LLM provider. The
//! library provides:
//!
//! - **Shell detection** and invocation for PowerShell, Bash, Zsh, Cmd and Fish
//! - **Literal-vs-natural-language routing** via shell syntax probes
//! - **Translation** through a primary provider with ordered fallbacks
//! - **Safety gating** of translated commands at four levels
//! - **Bounded history** sent to the model as context
//!
//! # Architecture
//!
//! - [`shell`] - Shell kinds and how to invoke them
//! - [`syntax`] - Whether input is already a valid command
//! - [`executor`] - Runs commands and tracks the working directory
//! - [`safety`] - Safety levels and the confirmation rule
//! - [`history`] - Recent commands and their outcomes
//! - [`http_client`] - HTTP client abstraction
//! - [`llm_provider`] - Vendor adapters, prompt, key detection
//! - [`provider_chain`] - Primary provider plus fallbacks
//! - [`translation`] - Routing, translation and reply sanitizing
//! - [`config`] - Persisted settings
//! - [`menu`] - Terminal picker
//! - [`setup`] - API key and model selection flows
//! - [`session`] - The interactive loop
//!
//! # Example
//!
//! ```ignore
//! use nlshell::session::{Session, SessionDeps};
//!
//! let mut session = Session::new(shell, config, pipeline, deps, stdin, stdout)
//!     .with_interrupts(interrupts);
//! session.run().await?;
//! ```

pub mod config;
pub mod executor;
pub mod history;
pub mod http_client;
pub mod llm_provider;
pub mod menu;
pub mod provider_chain;
pub mod safety;
pub mod session;
pub mod setup;
pub mod shell;
pub mod syntax;
pub mod translation;
