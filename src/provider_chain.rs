//! Primary provider with ordered fallbacks.

use crate::http_client::HttpClient;
use crate::llm_provider::{ApiProvider, Provider, ProviderError, ProviderSelection, TranslationRequest};
use std::sync::Arc;
use tracing::{info, warn};

/// Tries the primary provider, then each fallback in order, once per call.
pub struct MultiClient {
    primary: Box<dyn Provider>,
    fallbacks: Vec<Box<dyn Provider>>,
}

impl MultiClient {
    pub fn new(primary: Box<dyn Provider>, fallbacks: Vec<Box<dyn Provider>>) -> Self {
        Self { primary, fallbacks }
    }

    /// Builds the chain for a detected selection.
    ///
    /// `model` applies to the primary only; fallbacks use their vendor
    /// default. Returns `None` when the selection has no primary.
    pub fn from_selection(
        selection: &ProviderSelection,
        api_key: &str,
        model: Option<&str>,
        http: Arc<dyn HttpClient>,
    ) -> Option<Self> {
        let primary = selection.primary?;
        let fallbacks = selection
            .fallbacks
            .iter()
            .map(|kind| Box::new(ApiProvider::new(*kind, api_key, None, http.clone())) as Box<dyn Provider>)
            .collect();
        Some(Self::new(
            Box::new(ApiProvider::new(primary, api_key, model, http)),
            fallbacks,
        ))
    }

    pub fn primary_name(&self) -> &str {
        self.primary.name()
    }

    pub fn primary_model(&self) -> &str {
        self.primary.model()
    }

    pub fn fallback_names(&self) -> Vec<&str> {
        self.fallbacks.iter().map(|p| p.name()).collect()
    }

    /// Returns the first successful translation, or the last failure.
    pub async fn translate(&self, request: &TranslationRequest<'_>) -> Result<String, ProviderError> {
        let mut last_error = match self.primary.translate(request).await {
            Ok(command) => return Ok(command),
            Err(e) => e,
        };
        warn!("Primary provider failed: {}", last_error);

        for fallback in &self.fallbacks {
            info!("Falling back to {} ({})", fallback.name(), fallback.model());
            match fallback.translate(request).await {
                Ok(command) => return Ok(command),
                Err(e) => {
                    warn!("Fallback provider failed: {}", e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}
