//! # Text generation
//!
//! The single capability the specialists need from a model backend:
//! `generate(system_prompt, input) -> text`.

use crate::error::{Error, Result};
use crate::provider::{ChatMessage, CompletionRequest, LlmProvider, UsageTracker};
use std::sync::Mutex;
use tracing::debug;

/// Produces text from a system prompt and user input
#[allow(async_fn_in_trait)]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system_prompt: &str, input: &str) -> Result<String>;
}

/// Adapts any `LlmProvider` into a `TextGenerator`
pub struct ProviderGenerator<P: LlmProvider> {
    provider: P,
    model: Option<String>,
    temperature: Option<f32>,
    usage: Mutex<UsageTracker>,
}

impl<P: LlmProvider> ProviderGenerator<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            model: None,
            temperature: None,
            usage: Mutex::new(UsageTracker::new()),
        }
    }

    /// Override the provider's default model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Snapshot of token usage so far
    pub fn usage(&self) -> UsageTracker {
        self.usage
            .lock()
            .map(|tracker| tracker.clone())
            .unwrap_or_default()
    }

    fn request(&self, system_prompt: &str, input: &str) -> CompletionRequest {
        let mut request = CompletionRequest::new(vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(input),
        ]);
        if let Some(model) = &self.model {
            request = request.with_model(model.clone());
        }
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        request
    }
}

impl<P: LlmProvider> TextGenerator for ProviderGenerator<P> {
    async fn generate(&self, system_prompt: &str, input: &str) -> Result<String> {
        let request = self.request(system_prompt, input);
        debug!(
            provider = self.provider.name(),
            model = request.model.as_deref().unwrap_or(self.provider.default_model()),
            input_chars = input.len(),
            "generating text"
        );

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| e.into_error("generator::generate"))?;

        if let Ok(mut tracker) = self.usage.lock() {
            tracker.track(&response.model, &response.usage);
        }

        match response.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(Error::external_service("model returned no content")
                .with_operation("generator::generate")
                .with_context("provider", self.provider.name())),
        }
    }
}
