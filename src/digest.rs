//! The orchestrator: one uploaded PDF in, one [`DigestReport`] out.
//!
//! Stages run strictly in order:
//!
//! ```text
//! Received ─▶ Extracted ─▶ Summarized ─▶ Persisted ─▶ Visualized ─▶ Rendered
//! ```
//!
//! Only the first two can fail the request (bad upload, unreadable PDF).
//! From `Summarized` on, every stage has a fallback value, so a run that got
//! past extraction always produces a report. Fallbacks are recorded in
//! [`DigestReport::degraded`] and reported to the progress callback.

use crate::backend::CompletionBackend;
use crate::config::DigestConfig;
use crate::error::DigestError;
use crate::outcome::{Degradation, Outcome};
use crate::output::{DigestReport, ImageSource, StageNote};
use crate::pipeline::documents::DocumentWriter;
use crate::pipeline::extract::{extract_text, PdfiumExtractor, TextExtractor};
use crate::pipeline::image::{ImageBackend, ImageProvider};
use crate::pipeline::intake::{store_upload, Upload};
use crate::pipeline::summarize::Summarizer;
use crate::pipeline::visualize::PromptGenerator;
use crate::progress::{ProgressCallback, Stage};
use crate::session::SessionState;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Runs the digest pipeline. Cheap to share: wrap in an `Arc` and call
/// [`Digester::process`] from as many tasks as needed.
#[derive(Clone)]
pub struct Digester {
    config: DigestConfig,
    extractor: Arc<dyn TextExtractor>,
    summarizer: Summarizer,
    prompter: PromptGenerator,
    images: ImageProvider,
    documents: DocumentWriter,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for Digester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Digester")
            .field("config", &self.config)
            .field("summarizer", &self.summarizer)
            .field("prompter", &self.prompter)
            .field("images", &self.images)
            .field("documents", &self.documents)
            .finish_non_exhaustive()
    }
}

impl Digester {
    /// Build the production pipeline and create the working directories.
    pub fn new(config: DigestConfig) -> Result<Self, DigestError> {
        config.ensure_directories()?;
        Ok(Self {
            extractor: Arc::new(PdfiumExtractor),
            summarizer: Summarizer::from_config(&config),
            prompter: PromptGenerator::from_config(&config),
            images: ImageProvider::from_config(&config),
            documents: DocumentWriter::new(&config.docs_dir, config.section_labels.clone()),
            progress: None,
            config,
        })
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_summary_backend(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.summarizer = Summarizer::with_backend(&self.config, backend);
        self
    }

    pub fn with_prompt_backend(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.prompter = PromptGenerator::with_backend(&self.config, backend);
        self
    }

    /// Replace the image backend; `None` forces the placeholder path.
    pub fn with_image_backend(mut self, backend: Option<Arc<dyn ImageBackend>>) -> Self {
        self.images = self.images.with_backend(backend);
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn config(&self) -> &DigestConfig {
        &self.config
    }

    pub fn documents(&self) -> &DocumentWriter {
        &self.documents
    }

    /// Run every stage for one upload.
    ///
    /// # Errors
    /// Only intake and extraction failures are returned; see
    /// [`DigestError::is_retry_upload`].
    pub async fn process(&self, upload: &Upload) -> Result<DigestReport, DigestError> {
        let started = Instant::now();
        let mut notes: Vec<StageNote> = Vec::new();

        // ── Received ─────────────────────────────────────────────────────
        self.start(Stage::Received);
        let stored = store_upload(upload, &self.config.uploads_dir)
            .await
            .inspect_err(|e| warn!("Upload rejected: {}", e))?;
        let safe_name = stored
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut session = SessionState::new(safe_name);
        session.stored_path = Some(stored.clone());
        self.complete(Stage::Received);

        // ── Extracted ────────────────────────────────────────────────────
        self.start(Stage::Extracted);
        let text = match extract_text(self.extractor.clone(), &stored).await {
            Ok(text) => text,
            Err(e) => {
                error!("Error extracting text from PDF: {}", e);
                session.clear();
                return Err(as_extraction_failure(e, stored));
            }
        };
        info!("Extracted {} characters", text.len());
        session.extracted_text = Some(text);
        self.complete(Stage::Extracted);

        // ── Summarized ───────────────────────────────────────────────────
        self.start(Stage::Summarized);
        let text = session.take_extracted_text().unwrap_or_default();
        let summary = self.summarizer.summarize(&text).await;
        let summary = self.record(Stage::Summarized, summary, &mut notes);
        session.raw_summary = Some(summary);
        self.complete(Stage::Summarized);

        // ── Persisted ────────────────────────────────────────────────────
        self.start(Stage::Persisted);
        let name_prefix = session.original_filename.clone().unwrap_or_default();
        let raw = session
            .raw_summary
            .as_ref()
            .map(|s| s.as_str().to_string())
            .unwrap_or_default();
        let artifacts = self
            .documents
            .persist(raw.clone(), name_prefix.clone())
            .await;
        if artifacts.markdown.is_none() || artifacts.docx.is_none() {
            warn!("Not every summary document could be saved");
        }
        session.artifacts = Some(artifacts);
        self.complete(Stage::Persisted);

        // ── Visualized ───────────────────────────────────────────────────
        self.start(Stage::Visualized);
        let prompt = self.prompter.make_prompt(raw.as_str()).await;
        let prompt = self.record(Stage::Visualized, prompt, &mut notes);
        debug!("Visualization prompt: {}", prompt);

        let image = self.images.generate(&prompt, &name_prefix).await;
        match image.as_ref().map(|img| img.source) {
            Some(ImageSource::Generated) => {}
            Some(ImageSource::Placeholder) => {
                let reason = if self.images.is_configured() {
                    Degradation::BackendFailure("image generation failed, placeholder used".into())
                } else {
                    Degradation::MissingCredential
                };
                self.note(Stage::Visualized, reason, &mut notes);
            }
            None => self.note(
                Stage::Visualized,
                Degradation::BackendFailure("no image available".into()),
                &mut notes,
            ),
        }
        session.visualization_prompt = Some(prompt);
        session.image = image;
        self.complete(Stage::Visualized);

        // ── Rendered ─────────────────────────────────────────────────────
        self.start(Stage::Rendered);
        let raw_summary = session.take_raw_summary();
        let summary = self
            .config
            .section_labels
            .parse(raw_summary.as_ref().map(|s| s.as_str()).unwrap_or_default());
        let report = DigestReport {
            original_filename: session.take_original_filename().unwrap_or_default(),
            raw_summary: raw_summary.map(|s| s.into_string()),
            summary,
            artifacts: session.take_artifacts().unwrap_or_default(),
            visualization_prompt: session.take_visualization_prompt(),
            image: session.take_image(),
            degraded: notes,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        session.clear();
        self.complete(Stage::Rendered);

        info!(
            "Digest of '{}' finished in {}ms ({} degraded stage result(s))",
            report.original_filename,
            report.duration_ms,
            report.degraded.len()
        );
        if let Some(ref cb) = self.progress {
            cb.on_digest_complete(report.degraded.len());
        }
        Ok(report)
    }

    /// Blocking wrapper around [`Digester::process`] for non-async callers.
    ///
    /// Creates a fresh tokio runtime; do not call from inside one.
    pub fn process_sync(&self, upload: &Upload) -> Result<DigestReport, DigestError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| DigestError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.process(upload))
    }

    /// Path of a previously saved document, refusing traversal.
    pub fn resolve_download(&self, name: &str) -> Result<PathBuf, DigestError> {
        self.documents.resolve_download(name)
    }

    // ── Stage bookkeeping ────────────────────────────────────────────────

    fn start(&self, stage: Stage) {
        info!("{}…", stage.activity());
        if let Some(ref cb) = self.progress {
            cb.on_stage_start(stage);
        }
    }

    fn complete(&self, stage: Stage) {
        debug!("Stage {} complete", stage);
        if let Some(ref cb) = self.progress {
            cb.on_stage_complete(stage);
        }
    }

    fn note(&self, stage: Stage, reason: Degradation, notes: &mut Vec<StageNote>) {
        warn!("Stage {} degraded: {}", stage, reason);
        if let Some(ref cb) = self.progress {
            cb.on_stage_degraded(stage, &reason);
        }
        notes.push(StageNote {
            stage: stage.as_str(),
            reason,
        });
    }

    /// Unwrap an outcome, noting the degradation if any.
    fn record<T>(&self, stage: Stage, outcome: Outcome<T>, notes: &mut Vec<StageNote>) -> T {
        if let Some(reason) = outcome.reason().cloned() {
            self.note(stage, reason, notes);
        }
        outcome.into_value()
    }
}

/// Every extraction problem surfaces as `ExtractionFailed`, except a missing
/// pdfium library, whose message carries its own fix.
fn as_extraction_failure(e: DigestError, path: PathBuf) -> DigestError {
    match e {
        DigestError::ExtractionFailed { .. } | DigestError::PdfiumBindingFailed(_) => e,
        other => DigestError::ExtractionFailed {
            path,
            detail: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::ScriptedBackend;
    use crate::progress::DigestProgressCallback;
    use std::path::Path;
    use std::sync::Mutex;

    struct FixedText(&'static str);

    impl TextExtractor for FixedText {
        fn extract(&self, _pdf_path: &Path) -> Result<String, DigestError> {
            Ok(self.0.to_string())
        }
    }

    #[derive(Default)]
    struct Events(Mutex<Vec<String>>);

    impl DigestProgressCallback for Events {
        fn on_stage_start(&self, stage: Stage) {
            self.0.lock().unwrap().push(format!("start:{stage}"));
        }
        fn on_stage_complete(&self, stage: Stage) {
            self.0.lock().unwrap().push(format!("done:{stage}"));
        }
        fn on_stage_degraded(&self, stage: Stage, _reason: &Degradation) {
            self.0.lock().unwrap().push(format!("degraded:{stage}"));
        }
    }

    fn digester(root: &Path) -> Digester {
        let config = DigestConfig::builder().root_dir(root).build().unwrap();
        Digester::new(config)
            .unwrap()
            .with_extractor(Arc::new(FixedText("Some paper text.")))
    }

    #[tokio::test]
    async fn each_stage_starts_and_completes_once() {
        let tmp = tempfile::tempdir().unwrap();
        let events = Arc::new(Events::default());
        let d = digester(tmp.path())
            .with_summary_backend(ScriptedBackend::replying("Abstract: A."))
            .with_prompt_backend(ScriptedBackend::replying("A blue diagram."))
            .with_progress(events.clone());

        let up = Upload::from_bytes("paper.pdf", b"%PDF".to_vec());
        d.process(&up).await.unwrap();

        let events = events.0.lock().unwrap();
        for stage in Stage::ALL {
            let starts = events.iter().filter(|e| **e == format!("start:{stage}")).count();
            let dones = events.iter().filter(|e| **e == format!("done:{stage}")).count();
            assert_eq!((starts, dones), (1, 1), "stage {stage}: {events:?}");
        }
    }

    #[tokio::test]
    async fn extraction_error_is_wrapped() {
        struct Broken;
        impl TextExtractor for Broken {
            fn extract(&self, _pdf_path: &Path) -> Result<String, DigestError> {
                Err(DigestError::Internal("corrupt xref".into()))
            }
        }

        let tmp = tempfile::tempdir().unwrap();
        let d = digester(tmp.path()).with_extractor(Arc::new(Broken));
        let err = d
            .process(&Upload::from_bytes("paper.pdf", b"%PDF".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, DigestError::ExtractionFailed { .. }));
        assert!(err.is_retry_upload());
    }

    #[test]
    fn process_sync_runs_outside_a_runtime() {
        let tmp = tempfile::tempdir().unwrap();
        let report = digester(tmp.path())
            .process_sync(&Upload::from_bytes("paper.pdf", b"%PDF".to_vec()))
            .unwrap();
        assert_eq!(report.original_filename, "paper.pdf");
    }

    #[test]
    fn digester_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Digester>();
    }
}
