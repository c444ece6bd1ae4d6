//! Summary stage: extracted paper text → labelled [`RawSummary`].
//!
//! This stage never fails. Without a credential it returns the mock summary;
//! with one it makes a single request and returns whatever the model said,
//! trimmed. Any backend failure becomes an `Error: …` summary that the parser
//! later files under `Full Summary`.

use crate::backend::{BackendSlot, CompletionBackend, CompletionRequest};
use crate::config::DigestConfig;
use crate::error::BackendError;
use crate::outcome::{Degradation, Outcome};
use crate::prompts::{
    summary_request, EMPTY_SUMMARY_RESPONSE, MOCK_SUMMARY, SUMMARY_BACKEND_LABEL,
    SUMMARY_SYSTEM_PROMPT,
};
use crate::summary::RawSummary;
use std::sync::Arc;
use tracing::{info, warn};

/// Produces structured summaries of paper text.
#[derive(Debug, Clone)]
pub struct Summarizer {
    backend: BackendSlot,
    temperature: f32,
    max_tokens: Option<usize>,
}

impl Summarizer {
    /// Resolve the backend from the summary credential and model.
    pub fn from_config(config: &DigestConfig) -> Self {
        Self {
            backend: BackendSlot::resolve(
                config.summary_api_key.as_deref(),
                &config.summary_provider,
                &config.summary_model,
            ),
            temperature: config.summary_temperature,
            max_tokens: config.summary_max_tokens,
        }
    }

    /// Use an explicit backend (custom provider, or a fake in tests).
    pub fn with_backend(config: &DigestConfig, backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend: BackendSlot::Ready(backend),
            temperature: config.summary_temperature,
            max_tokens: config.summary_max_tokens,
        }
    }

    /// A summarizer that always takes the no-credential path.
    pub fn unconfigured(config: &DigestConfig) -> Self {
        Self {
            backend: BackendSlot::Unconfigured,
            temperature: config.summary_temperature,
            max_tokens: config.summary_max_tokens,
        }
    }

    /// Summarise `text` into the four labelled sections.
    pub async fn summarize(&self, text: &str) -> Outcome<RawSummary> {
        let backend = match &self.backend {
            BackendSlot::Unconfigured => {
                warn!("Summary credential not configured; returning mock summary");
                return Outcome::degraded(
                    RawSummary::new(MOCK_SUMMARY),
                    Degradation::MissingCredential,
                );
            }
            BackendSlot::Broken(e) => return degraded_failure(e),
            BackendSlot::Ready(backend) => backend,
        };

        let request = CompletionRequest {
            system: Some(SUMMARY_SYSTEM_PROMPT.to_string()),
            user: summary_request(text),
            temperature: Some(self.temperature),
            max_tokens: self.max_tokens,
        };

        info!(
            "Requesting summary from {} ({} chars of text)",
            backend.name(),
            text.len()
        );

        match backend.complete(&request).await {
            Ok(content) if !content.trim().is_empty() => {
                Outcome::live(RawSummary::new(content.trim()))
            }
            Ok(_) | Err(BackendError::EmptyResponse) => {
                warn!("Summary backend returned an empty response");
                Outcome::degraded(
                    RawSummary::new(EMPTY_SUMMARY_RESPONSE),
                    Degradation::EmptyResponse,
                )
            }
            Err(e) => degraded_failure(&e),
        }
    }
}

fn degraded_failure(e: &BackendError) -> Outcome<RawSummary> {
    warn!("Summary backend failed: {}", e);
    Outcome::degraded(
        RawSummary::new(e.to_degraded_text(SUMMARY_BACKEND_LABEL)),
        Degradation::BackendFailure(e.to_string()),
    )
}
