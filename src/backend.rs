//! LLM access shared by the summary and visualisation stages.
//!
//! Both stages need the same thing from a model: send a system message and a
//! user message once, get text back. [`CompletionBackend`] captures exactly
//! that so the stages can be driven by an `edgequake-llm` provider in
//! production and by a scripted fake in tests.

use crate::error::BackendError;
use async_trait::async_trait;
use edgequake_llm::{
    AnthropicProvider, ChatMessage, CompletionOptions, LLMProvider, OpenAIProvider,
    ProviderFactory,
};
use std::sync::Arc;
use tracing::debug;

/// One chat request: optional system message, one user message, sampling knobs.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub user: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

/// A single-shot text completion backend.
///
/// Implementations make exactly one attempt; retries are not part of the
/// contract.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Send the request and return the raw response text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError>;
}

/// [`CompletionBackend`] over an `edgequake-llm` provider.
pub struct LlmBackend {
    name: String,
    provider: Arc<dyn LLMProvider>,
}

impl LlmBackend {
    /// Wrap a pre-built provider.
    pub fn new(name: impl Into<String>, provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            name: name.into(),
            provider,
        }
    }

    /// Build a provider from a configured key.
    ///
    /// `openai` and `anthropic` are constructed directly with `api_key`.
    /// Any other name goes through `ProviderFactory`, which resolves its own
    /// credentials.
    pub fn with_key(provider_name: &str, api_key: &str, model: &str) -> Result<Self, BackendError> {
        let provider: Arc<dyn LLMProvider> = match provider_name.to_ascii_lowercase().as_str() {
            "openai" => Arc::new(OpenAIProvider::new(api_key).with_model(model)),
            "anthropic" => Arc::new(AnthropicProvider::new(api_key).with_model(model)),
            _ => ProviderFactory::create_llm_provider(provider_name, model)
                .map_err(|e| BackendError::Status(format!("provider '{provider_name}': {e}")))?,
        };
        Ok(Self::new(format!("{provider_name}/{model}"), provider))
    }
}

#[async_trait]
impl CompletionBackend for LlmBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(&request.user));

        let options = CompletionOptions {
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(BackendError::from)?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.name, response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

/// How a stage's backend was resolved from configuration.
#[derive(Clone)]
pub enum BackendSlot {
    /// No credential configured: the stage runs its degraded path.
    Unconfigured,
    /// Ready to call.
    Ready(Arc<dyn CompletionBackend>),
    /// A credential exists but the provider could not be built. Treated as a
    /// backend failure on every call.
    Broken(BackendError),
}

impl BackendSlot {
    /// Build a slot from an optional credential and a provider/model pair.
    pub fn resolve(api_key: Option<&str>, provider_name: &str, model: &str) -> Self {
        let Some(key) = api_key else {
            return BackendSlot::Unconfigured;
        };
        match LlmBackend::with_key(provider_name, key, model) {
            Ok(backend) => BackendSlot::Ready(Arc::new(backend)),
            Err(e) => BackendSlot::Broken(e),
        }
    }
}

impl std::fmt::Debug for BackendSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendSlot::Unconfigured => f.write_str("Unconfigured"),
            BackendSlot::Ready(b) => write!(f, "Ready({})", b.name()),
            BackendSlot::Broken(e) => write!(f, "Broken({e})"),
        }
    }
}
