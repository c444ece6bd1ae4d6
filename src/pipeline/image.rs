//! Image stage: visualisation prompt → PNG under the images directory.
//!
//! This stage is best effort. With no image credential, or when generation
//! fails for any reason (transport, HTTP status, safety filter, undecodable
//! bytes), a fixed placeholder image is copied under a fresh name instead.
//! Only a missing placeholder or a failed copy yields `None`, which callers
//! treat as "no image available".

use crate::config::DigestConfig;
use crate::error::BackendError;
use crate::output::{GeneratedImage, ImageSource};
use crate::pipeline::intake::file_stem;
use crate::pipeline::timestamp;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A text-to-image backend. Returns encoded image bytes (any format the
/// `image` crate can decode).
#[async_trait]
pub trait ImageBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, BackendError>;
}

/// Imagen through the Gemini API `:predict` endpoint.
pub struct ImagenBackend {
    client: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl ImagenBackend {
    pub fn new(
        api_base: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:predict",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Default, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    rai_filtered_reason: Option<String>,
}

/// Pull the first image out of a `:predict` response body.
fn decode_prediction(body: PredictResponse) -> Result<Vec<u8>, BackendError> {
    let first = body.predictions.into_iter().next().ok_or_else(|| {
        BackendError::Status("no image returned (prompt may have been blocked)".to_string())
    })?;
    if let Some(reason) = first.rai_filtered_reason {
        return Err(BackendError::Status(format!("prompt blocked: {reason}")));
    }
    let encoded = first.bytes_base64_encoded.ok_or(BackendError::EmptyResponse)?;
    STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| BackendError::Unexpected(format!("invalid base64 image: {e}")))
}

#[async_trait]
impl ImageBackend for ImagenBackend {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, BackendError> {
        let body = serde_json::json!({
            "instances": [{ "prompt": prompt }],
            "parameters": { "sampleCount": 1 },
        });

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: PredictResponse = response.json().await?;
        decode_prediction(parsed)
    }
}

/// Saves one image per run, generated or placeholder.
#[derive(Clone)]
pub struct ImageProvider {
    images_dir: PathBuf,
    placeholder: PathBuf,
    tag: String,
    backend: Option<Arc<dyn ImageBackend>>,
}

impl std::fmt::Debug for ImageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageProvider")
            .field("images_dir", &self.images_dir)
            .field("placeholder", &self.placeholder)
            .field("tag", &self.tag)
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .finish()
    }
}

impl ImageProvider {
    /// Use Imagen when `GEMINI_API_KEY` is configured, placeholders otherwise.
    pub fn from_config(config: &DigestConfig) -> Self {
        let backend = config.image_api_key.as_ref().map(|key| {
            Arc::new(ImagenBackend::new(
                config.image_api_base.clone(),
                config.image_model.clone(),
                key.clone(),
            )) as Arc<dyn ImageBackend>
        });
        Self {
            images_dir: config.images_dir.clone(),
            placeholder: config.placeholder_image.clone(),
            tag: config.image_tag.clone(),
            backend,
        }
    }

    /// Replace (or remove) the generation backend.
    pub fn with_backend(mut self, backend: Option<Arc<dyn ImageBackend>>) -> Self {
        self.backend = backend;
        self
    }

    /// `true` when a generation backend is attached.
    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    /// `<stem>_<tag>_<YYYYmmdd_HHMMSS>.png`
    pub fn image_file_name(&self, name_prefix: &str) -> String {
        format!("{}_{}_{}.png", file_stem(name_prefix), self.tag, timestamp())
    }

    /// Produce an image for `prompt`, falling back to the placeholder.
    pub async fn generate(&self, prompt: &str, name_prefix: &str) -> Option<GeneratedImage> {
        let file_name = self.image_file_name(name_prefix);
        let dest = self.images_dir.join(&file_name);
        let relative_path = format!("images/{file_name}");

        let Some(backend) = &self.backend else {
            info!("Image credential not configured; using placeholder image");
            return self.copy_placeholder(&dest, relative_path).await;
        };

        debug!("Requesting image from {} for prompt: {}", backend.name(), prompt);
        let saved = match backend.generate(prompt).await {
            Ok(bytes) => save_as_png(bytes, dest.clone()).await,
            Err(e) => Err(e),
        };

        match saved {
            Ok(()) => {
                info!("Generated image {}", dest.display());
                Some(GeneratedImage {
                    relative_path,
                    path: absolute(&dest),
                    source: ImageSource::Generated,
                })
            }
            Err(e) => {
                warn!("Image generation failed ({}); falling back to placeholder", e);
                self.copy_placeholder(&dest, relative_path).await
            }
        }
    }

    async fn copy_placeholder(&self, dest: &Path, relative_path: String) -> Option<GeneratedImage> {
        if !self.placeholder.is_file() {
            warn!("Placeholder image not found at {}", self.placeholder.display());
            return None;
        }
        match tokio::fs::copy(&self.placeholder, dest).await {
            Ok(_) => {
                info!("Used placeholder image: {}", relative_path);
                Some(GeneratedImage {
                    relative_path,
                    path: absolute(dest),
                    source: ImageSource::Placeholder,
                })
            }
            Err(e) => {
                warn!("Error copying placeholder image: {}", e);
                None
            }
        }
    }
}

/// Decode whatever the backend returned and store it as PNG.
async fn save_as_png(bytes: Vec<u8>, dest: PathBuf) -> Result<(), BackendError> {
    tokio::task::spawn_blocking(move || {
        let img = image::load_from_memory(&bytes)
            .map_err(|e| BackendError::Unexpected(format!("undecodable image: {e}")))?;
        img.save_with_format(&dest, image::ImageFormat::Png)
            .map_err(|e| BackendError::Unexpected(format!("cannot write image: {e}")))
    })
    .await
    .map_err(|e| BackendError::Unexpected(format!("image task panicked: {e}")))?
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
