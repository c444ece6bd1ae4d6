//! Visualisation-prompt stage: summary → short image-generation prompt.
//!
//! Like the summary stage this is total. The returned text is always usable
//! as an image prompt, even when it is a default or an `Error: …` message.

use crate::backend::{BackendSlot, CompletionBackend, CompletionRequest};
use crate::config::DigestConfig;
use crate::error::BackendError;
use crate::outcome::{Degradation, Outcome};
use crate::prompts::{
    image_prompt_request, DEFAULT_IMAGE_PROMPT, EMPTY_IMAGE_PROMPT_RESPONSE,
    EMPTY_SUMMARY_IMAGE_PROMPT, IMAGE_PROMPT_BACKEND_LABEL, IMAGE_PROMPT_CUE,
};
use crate::summary::SummaryInput;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{info, warn};

/// Turns a summary into a 20–30 word prompt for an image model.
#[derive(Debug, Clone)]
pub struct PromptGenerator {
    backend: BackendSlot,
    max_tokens: usize,
}

impl PromptGenerator {
    /// Resolve the backend from the prompt credential and model.
    pub fn from_config(config: &DigestConfig) -> Self {
        Self {
            backend: BackendSlot::resolve(
                config.prompt_api_key.as_deref(),
                &config.prompt_provider,
                &config.prompt_model,
            ),
            max_tokens: config.prompt_max_tokens,
        }
    }

    /// Use an explicit backend (custom provider, or a fake in tests).
    pub fn with_backend(config: &DigestConfig, backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend: BackendSlot::Ready(backend),
            max_tokens: config.prompt_max_tokens,
        }
    }

    /// A generator that always takes the no-credential path.
    pub fn unconfigured(config: &DigestConfig) -> Self {
        Self {
            backend: BackendSlot::Unconfigured,
            max_tokens: config.prompt_max_tokens,
        }
    }

    /// Build an image prompt from a raw or parsed summary.
    pub async fn make_prompt<'a>(&self, summary: impl Into<SummaryInput<'a>>) -> Outcome<String> {
        let backend = match &self.backend {
            BackendSlot::Unconfigured => {
                warn!("Prompt credential not configured; using default visualization prompt");
                return Outcome::degraded(
                    DEFAULT_IMAGE_PROMPT.to_string(),
                    Degradation::MissingCredential,
                );
            }
            BackendSlot::Broken(e) => return degraded_failure(e),
            BackendSlot::Ready(backend) => backend,
        };

        let text = summary.into().to_text();
        if text.trim().is_empty() {
            warn!("Empty summary given to prompt generation; using default prompt");
            return Outcome::degraded(
                EMPTY_SUMMARY_IMAGE_PROMPT.to_string(),
                Degradation::EmptyInput,
            );
        }

        let request = CompletionRequest {
            system: None,
            user: image_prompt_request(&text),
            temperature: None,
            max_tokens: Some(self.max_tokens),
        };

        info!("Requesting visualization prompt from {}", backend.name());

        match backend.complete(&request).await {
            Ok(content) if !content.trim().is_empty() => {
                Outcome::live(clean_prompt(&content))
            }
            Ok(_) | Err(BackendError::EmptyResponse) => {
                warn!("Prompt backend returned an empty response");
                Outcome::degraded(
                    EMPTY_IMAGE_PROMPT_RESPONSE.to_string(),
                    Degradation::EmptyResponse,
                )
            }
            Err(e) => degraded_failure(&e),
        }
    }
}

fn degraded_failure(e: &BackendError) -> Outcome<String> {
    warn!("Prompt backend failed: {}", e);
    Outcome::degraded(
        e.to_degraded_text(IMAGE_PROMPT_BACKEND_LABEL),
        Degradation::BackendFailure(e.to_string()),
    )
}

static RE_PROMPT_PREAMBLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^here(?:'s| is) a prompt:").unwrap());

/// Strip the preambles models like to add before the prompt itself.
///
/// 1. Keep only what follows the last echo of the request's cue line.
/// 2. Drop a leading "Here's a prompt:" / "Here is a prompt:".
pub fn clean_prompt(raw: &str) -> String {
    let mut prompt = raw.trim();
    if let Some(idx) = prompt.rfind(IMAGE_PROMPT_CUE) {
        prompt = prompt[idx + IMAGE_PROMPT_CUE.len()..].trim();
    }
    if RE_PROMPT_PREAMBLE.is_match(prompt) {
        if let Some((_, rest)) = prompt.split_once(':') {
            prompt = rest.trim();
        }
    }
    prompt.to_string()
}
