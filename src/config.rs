//! Configuration types for the digest pipeline.
//!
//! All pipeline behaviour is controlled through [`DigestConfig`], built via
//! its [`DigestConfigBuilder`]. The config is immutable once built and is
//! handed to each stage at construction time; nothing in the pipeline reads
//! process-global state after that point.
//!
//! The three backend credentials are independently optional. A missing
//! credential is not an error: the corresponding stage falls back to its
//! degraded behaviour (mock summary, default prompt, placeholder image).

use crate::error::DigestError;
use crate::summary::SectionLabels;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable holding the summarisation backend key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable holding the prompt-generation backend key.
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
/// Environment variable holding the image-generation backend key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Configuration for the digest pipeline.
///
/// Built via [`DigestConfig::builder()`], [`DigestConfig::from_env()`] or
/// [`DigestConfig::default()`] (no credentials, every AI stage degraded).
///
/// # Example
/// ```rust
/// use edgequake_digest::DigestConfig;
///
/// let config = DigestConfig::builder()
///     .docs_dir("out/docs")
///     .summary_model("gpt-4o-mini")
///     .build()
///     .unwrap();
/// assert!(config.summary_api_key.is_none());
/// ```
#[derive(Clone)]
pub struct DigestConfig {
    /// Where incoming PDFs are stored. Default: `uploads`.
    pub uploads_dir: PathBuf,

    /// Where the Markdown/DOCX pairs are written. Default: `docs`.
    pub docs_dir: PathBuf,

    /// Where generated or placeholder PNGs are written. Default: `static/images`.
    pub images_dir: PathBuf,

    /// Image copied when generation is unavailable.
    /// Default: `static/images/placeholder.png`.
    pub placeholder_image: PathBuf,

    /// Tag inserted into image file names. Default: `visualization`.
    pub image_tag: String,

    /// Summarisation backend credential (`OPENAI_API_KEY`).
    pub summary_api_key: Option<String>,

    /// Summary provider. `openai` and `anthropic` are built with the key above;
    /// other names go through the edgequake-llm provider factory. Default: `openai`.
    pub summary_provider: String,

    /// Summarisation model. Default: `gpt-3.5-turbo`.
    pub summary_model: String,

    /// Sampling temperature for summaries. Default: 0.5.
    ///
    /// Low enough to stay faithful to the paper, high enough that the model
    /// does not copy sentences verbatim.
    pub summary_temperature: f32,

    /// Output cap for summaries. `None` lets the model finish. Default: `None`.
    pub summary_max_tokens: Option<usize>,

    /// Prompt-generation backend credential (`ANTHROPIC_API_KEY`).
    pub prompt_api_key: Option<String>,

    /// Provider name for prompt generation. Default: `anthropic`.
    pub prompt_provider: String,

    /// Prompt-generation model. Default: `claude-3-sonnet-20240229`.
    pub prompt_model: String,

    /// Output cap for the image prompt. Default: 100.
    ///
    /// The prompt is meant to be 20–30 words; 100 tokens leaves headroom for
    /// a preamble that post-processing strips.
    pub prompt_max_tokens: usize,

    /// Image-generation backend credential (`GEMINI_API_KEY`).
    pub image_api_key: Option<String>,

    /// Image model used by the generation backend. Default: `imagen-3.0-generate-002`.
    pub image_model: String,

    /// Base URL of the image-generation API.
    pub image_api_base: String,

    /// Recognised section labels, in order.
    pub section_labels: SectionLabels,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            docs_dir: PathBuf::from("docs"),
            images_dir: PathBuf::from("static/images"),
            placeholder_image: PathBuf::from("static/images/placeholder.png"),
            image_tag: "visualization".to_string(),
            summary_api_key: None,
            summary_provider: "openai".to_string(),
            summary_model: "gpt-3.5-turbo".to_string(),
            summary_temperature: 0.5,
            summary_max_tokens: None,
            prompt_api_key: None,
            prompt_provider: "anthropic".to_string(),
            prompt_model: "claude-3-sonnet-20240229".to_string(),
            prompt_max_tokens: 100,
            image_api_key: None,
            image_model: "imagen-3.0-generate-002".to_string(),
            image_api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            section_labels: SectionLabels::default(),
        }
    }
}

/// Shows whether a secret is present without printing it.
fn redact(key: &Option<String>) -> &'static str {
    if key.is_some() {
        "<set>"
    } else {
        "<unset>"
    }
}

impl fmt::Debug for DigestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestConfig")
            .field("uploads_dir", &self.uploads_dir)
            .field("docs_dir", &self.docs_dir)
            .field("images_dir", &self.images_dir)
            .field("placeholder_image", &self.placeholder_image)
            .field("image_tag", &self.image_tag)
            .field("summary_api_key", &redact(&self.summary_api_key))
            .field("summary_provider", &self.summary_provider)
            .field("summary_model", &self.summary_model)
            .field("summary_temperature", &self.summary_temperature)
            .field("summary_max_tokens", &self.summary_max_tokens)
            .field("prompt_api_key", &redact(&self.prompt_api_key))
            .field("prompt_provider", &self.prompt_provider)
            .field("prompt_model", &self.prompt_model)
            .field("prompt_max_tokens", &self.prompt_max_tokens)
            .field("image_api_key", &redact(&self.image_api_key))
            .field("image_model", &self.image_model)
            .field("section_labels", &self.section_labels.labels())
            .finish()
    }
}

/// Read an env var, treating empty values as unset.
fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl DigestConfig {
    /// Create a new builder for `DigestConfig`.
    pub fn builder() -> DigestConfigBuilder {
        DigestConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults plus the three credentials read from the environment.
    pub fn from_env() -> Self {
        Self::builder().credentials_from_env().config
    }

    /// Create the uploads, documents and images directories if absent.
    pub fn ensure_directories(&self) -> Result<(), DigestError> {
        for dir in [&self.uploads_dir, &self.docs_dir, &self.images_dir] {
            create_dir(dir)?;
        }
        Ok(())
    }
}

fn create_dir(dir: &Path) -> Result<(), DigestError> {
    std::fs::create_dir_all(dir).map_err(|e| DigestError::DirectoryCreateFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;
    debug!("Ensured directory {}", dir.display());
    Ok(())
}

/// Builder for [`DigestConfig`].
#[derive(Debug)]
pub struct DigestConfigBuilder {
    config: DigestConfig,
}

impl DigestConfigBuilder {
    /// Put the uploads, docs and images directories under one root,
    /// with the placeholder at `<root>/static/images/placeholder.png`.
    pub fn root_dir(mut self, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        self.config.uploads_dir = root.join("uploads");
        self.config.docs_dir = root.join("docs");
        self.config.images_dir = root.join("static/images");
        self.config.placeholder_image = root.join("static/images/placeholder.png");
        self
    }

    pub fn uploads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.uploads_dir = dir.into();
        self
    }

    pub fn docs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.docs_dir = dir.into();
        self
    }

    pub fn images_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.images_dir = dir.into();
        self
    }

    pub fn placeholder_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.placeholder_image = path.into();
        self
    }

    pub fn image_tag(mut self, tag: impl Into<String>) -> Self {
        self.config.image_tag = tag.into();
        self
    }

    /// Fill any unset credential from `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`
    /// and `GEMINI_API_KEY`.
    pub fn credentials_from_env(mut self) -> Self {
        if self.config.summary_api_key.is_none() {
            self.config.summary_api_key = env_key(OPENAI_API_KEY_ENV);
        }
        if self.config.prompt_api_key.is_none() {
            self.config.prompt_api_key = env_key(ANTHROPIC_API_KEY_ENV);
        }
        if self.config.image_api_key.is_none() {
            self.config.image_api_key = env_key(GEMINI_API_KEY_ENV);
        }
        self
    }

    pub fn summary_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.summary_api_key = Some(key.into());
        self
    }

    pub fn summary_provider(mut self, name: impl Into<String>) -> Self {
        self.config.summary_provider = name.into();
        self
    }

    pub fn summary_model(mut self, model: impl Into<String>) -> Self {
        self.config.summary_model = model.into();
        self
    }

    pub fn summary_temperature(mut self, t: f32) -> Self {
        self.config.summary_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn summary_max_tokens(mut self, n: usize) -> Self {
        self.config.summary_max_tokens = Some(n);
        self
    }

    pub fn prompt_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.prompt_api_key = Some(key.into());
        self
    }

    pub fn prompt_provider(mut self, name: impl Into<String>) -> Self {
        self.config.prompt_provider = name.into();
        self
    }

    pub fn prompt_model(mut self, model: impl Into<String>) -> Self {
        self.config.prompt_model = model.into();
        self
    }

    pub fn prompt_max_tokens(mut self, n: usize) -> Self {
        self.config.prompt_max_tokens = n.max(1);
        self
    }

    pub fn image_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.image_api_key = Some(key.into());
        self
    }

    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.config.image_model = model.into();
        self
    }

    pub fn image_api_base(mut self, base: impl Into<String>) -> Self {
        self.config.image_api_base = base.into();
        self
    }

    pub fn section_labels(mut self, labels: SectionLabels) -> Self {
        self.config.section_labels = labels;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DigestConfig, DigestError> {
        let c = &self.config;
        if c.section_labels.labels().is_empty() {
            return Err(DigestError::InvalidConfig(
                "At least one section label is required".into(),
            ));
        }
        if let Some(bad) = c
            .section_labels
            .labels()
            .iter()
            .find(|l| l.trim().is_empty() || l.contains(':') || l.contains('\n'))
        {
            return Err(DigestError::InvalidConfig(format!(
                "Section label {bad:?} must be non-empty and contain no ':' or newline"
            )));
        }
        if c.image_tag.trim().is_empty() || c.image_tag.contains(['/', '\\']) {
            return Err(DigestError::InvalidConfig(format!(
                "Image tag {:?} must be a non-empty file-name fragment",
                c.image_tag
            )));
        }
        Ok(self.config)
    }
}
