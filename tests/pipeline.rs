//! Integration tests for the full digest pipeline.
//!
//! Every external dependency is replaced by an in-process fake: a fixed-text
//! extractor instead of pdfium, scripted completion backends instead of
//! LLM providers, and an in-memory image backend. Each test runs in its own
//! temporary root so no state leaks between them.

use async_trait::async_trait;
use edgequake_digest::prompts::{DEFAULT_IMAGE_PROMPT, MOCK_SUMMARY};
use edgequake_digest::summary::{DEFAULT_LABELS, FULL_SUMMARY_KEY};
use edgequake_digest::{
    BackendError, CompletionBackend, CompletionRequest, Degradation, DigestConfig, DigestError,
    Digester, ImageBackend, ImageSource, TextExtractor, Upload,
};
use image::{DynamicImage, Rgba, RgbaImage};
use regex::Regex;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::{Arc, Mutex};

// ── Fakes ────────────────────────────────────────────────────────────────────

struct FixedText(String);

impl TextExtractor for FixedText {
    fn extract(&self, _pdf_path: &Path) -> Result<String, DigestError> {
        Ok(self.0.clone())
    }
}

/// Replies once with a canned result and remembers what it was asked.
struct Scripted {
    reply: Mutex<Option<Result<String, BackendError>>>,
    seen: Mutex<Vec<CompletionRequest>>,
}

impl Scripted {
    fn ok(text: &str) -> Arc<Self> {
        Self::with(Ok(text.to_string()))
    }

    fn err(e: BackendError) -> Arc<Self> {
        Self::with(Err(e))
    }

    fn with(reply: Result<String, BackendError>) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Some(reply)),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        self.seen.lock().unwrap().push(request.clone());
        self.reply
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(BackendError::Unexpected("called twice".into())))
    }
}

struct StaticImage;

#[async_trait]
impl ImageBackend for StaticImage {
    fn name(&self) -> &str {
        "static"
    }

    async fn generate(&self, _prompt: &str) -> Result<Vec<u8>, BackendError> {
        Ok(png_bytes(8))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

const PAPER_TEXT: &str = "We study things. We find results. We discuss them.";

fn png_bytes(side: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(side, side, Rgba([9, 9, 9, 255])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn config(root: &Path, with_placeholder: bool) -> DigestConfig {
    let config = DigestConfig::builder().root_dir(root).build().unwrap();
    config.ensure_directories().unwrap();
    if with_placeholder {
        std::fs::write(&config.placeholder_image, png_bytes(2)).unwrap();
    }
    config
}

fn digester(root: &Path, with_placeholder: bool) -> Digester {
    Digester::new(config(root, with_placeholder))
        .unwrap()
        .with_extractor(Arc::new(FixedText(PAPER_TEXT.into())))
}

fn pdf_upload(name: &str) -> Upload {
    Upload::from_bytes(name, b"%PDF-1.4 fake".to_vec())
}

fn docx_body(path: &Path) -> String {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut part = archive.by_name("word/document.xml").unwrap();
    let mut xml = String::new();
    part.read_to_string(&mut xml).unwrap();
    xml
}

fn dir_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

// ── No credentials ──────────────────────────────────────────────────────────

#[tokio::test]
async fn without_credentials_every_stage_falls_back() {
    let tmp = tempfile::tempdir().unwrap();
    let d = digester(tmp.path(), true);

    let report = d.process(&pdf_upload("paper.pdf")).await.unwrap();

    let keys: Vec<_> = report.summary.keys().collect();
    assert_eq!(keys, DEFAULT_LABELS);
    assert_eq!(report.visualization_prompt.as_deref(), Some(DEFAULT_IMAGE_PROMPT));

    let image = report.image.as_ref().expect("placeholder copied");
    assert_eq!(image.source, ImageSource::Placeholder);
    let re = Regex::new(r"^paper_visualization_\d{8}_\d{6}\.png$").unwrap();
    let name = image.path.file_name().unwrap().to_string_lossy();
    assert!(re.is_match(&name), "unexpected image name {name}");

    assert!(report.markdown_file_name().is_some());
    assert!(report.docx_file_name().is_some());
    assert!(!report.is_fully_live());
    assert!(report
        .degraded
        .iter()
        .all(|n| n.reason == Degradation::MissingCredential));
    assert_eq!(report.degraded[0].stage, "summarized");
}

#[tokio::test]
async fn mock_summary_is_stored_verbatim() {
    let tmp = tempfile::tempdir().unwrap();
    let report = digester(tmp.path(), true)
        .process(&pdf_upload("paper.pdf"))
        .await
        .unwrap();

    assert_eq!(report.raw_summary.as_deref(), Some(MOCK_SUMMARY));
    let md = report.artifacts.markdown.as_ref().unwrap();
    assert_eq!(std::fs::read_to_string(&md.path).unwrap(), MOCK_SUMMARY);
}

#[tokio::test]
async fn missing_placeholder_means_no_image() {
    let tmp = tempfile::tempdir().unwrap();
    let report = digester(tmp.path(), false)
        .process(&pdf_upload("paper.pdf"))
        .await
        .unwrap();

    assert!(report.image.is_none());
    assert!(report.image_path().is_none());
    // The documents are still written.
    assert!(report.markdown_file_name().is_some());
}

// ── Live backends ───────────────────────────────────────────────────────────

#[tokio::test]
async fn labelled_summary_flows_through_every_stage() {
    let tmp = tempfile::tempdir().unwrap();
    let summary = Scripted::ok("Abstract: A.\nIntroduction: B.\nResults: C.\nDiscussion: D.");
    let prompt = Scripted::ok("Here's a prompt: A glowing lattice of data points.");
    let d = digester(tmp.path(), true)
        .with_summary_backend(summary.clone())
        .with_prompt_backend(prompt.clone())
        .with_image_backend(Some(Arc::new(StaticImage)));

    let report = d.process(&pdf_upload("paper.pdf")).await.unwrap();

    let sections: Vec<_> = report.summary.iter().collect();
    assert_eq!(
        sections,
        [
            ("Abstract", "A."),
            ("Introduction", "B."),
            ("Results", "C."),
            ("Discussion", "D."),
        ]
    );
    assert_eq!(
        report.visualization_prompt.as_deref(),
        Some("A glowing lattice of data points.")
    );
    assert_eq!(report.image.as_ref().unwrap().source, ImageSource::Generated);
    assert!(report.is_fully_live(), "{:?}", report.degraded);

    // One request each, carrying the previous stage's output.
    let summary_reqs = summary.requests();
    assert_eq!(summary_reqs.len(), 1);
    assert!(summary_reqs[0].user.contains(PAPER_TEXT));
    assert_eq!(summary_reqs[0].temperature, Some(0.5));
    let prompt_reqs = prompt.requests();
    assert_eq!(prompt_reqs.len(), 1);
    assert!(prompt_reqs[0].user.contains("Results: C."));
    assert_eq!(prompt_reqs[0].max_tokens, Some(100));

    let xml = docx_body(&report.artifacts.docx.as_ref().unwrap().path);
    assert_eq!(xml.matches(r#"<w:pStyle w:val="Heading1"/>"#).count(), 4);
    assert!(xml.contains(">Discussion<"));
}

#[tokio::test]
async fn plain_text_summary_becomes_one_untitled_paragraph() {
    let tmp = tempfile::tempdir().unwrap();
    let d = digester(tmp.path(), true)
        .with_summary_backend(Scripted::ok("just some plain text"))
        .with_prompt_backend(Scripted::ok("An abstract shape."));

    let report = d.process(&pdf_upload("paper.pdf")).await.unwrap();

    assert_eq!(report.summary.len(), 1);
    assert_eq!(report.summary.get(FULL_SUMMARY_KEY), Some("just some plain text"));

    let xml = docx_body(&report.artifacts.docx.as_ref().unwrap().path);
    assert!(!xml.contains("Heading1"));
    assert_eq!(xml.matches("</w:p>").count(), 1);
    assert!(xml.contains("just some plain text"));
}

#[tokio::test]
async fn summary_backend_failure_is_reported_as_text() {
    let tmp = tempfile::tempdir().unwrap();
    let d = digester(tmp.path(), true)
        .with_summary_backend(Scripted::err(BackendError::RateLimited("slow down".into())))
        .with_prompt_backend(Scripted::ok("A traffic jam of tokens."));

    let report = d.process(&pdf_upload("paper.pdf")).await.unwrap();

    let raw = report.raw_summary.as_deref().unwrap();
    assert_eq!(raw, "Error: OpenAI API Rate Limit Exceeded - slow down");
    assert_eq!(report.summary.get(FULL_SUMMARY_KEY), Some(raw));
    assert!(matches!(
        report.degraded[0].reason,
        Degradation::BackendFailure(_)
    ));
    // Later stages still ran on the error text.
    assert_eq!(
        report.visualization_prompt.as_deref(),
        Some("A traffic jam of tokens.")
    );
}

#[tokio::test]
async fn empty_prompt_response_is_degraded() {
    let tmp = tempfile::tempdir().unwrap();
    let d = digester(tmp.path(), true)
        .with_summary_backend(Scripted::ok("Abstract: A."))
        .with_prompt_backend(Scripted::ok("   "));

    let report = d.process(&pdf_upload("paper.pdf")).await.unwrap();

    let prompt = report.visualization_prompt.as_deref().unwrap();
    assert!(prompt.starts_with("Error:"), "{prompt}");
    assert!(report
        .degraded
        .iter()
        .any(|n| n.stage == "visualized" && n.reason == Degradation::EmptyResponse));
}

// ── Intake and extraction errors ────────────────────────────────────────────

#[tokio::test]
async fn non_pdf_upload_is_rejected_before_any_work() {
    let tmp = tempfile::tempdir().unwrap();
    let summary = Scripted::ok("Abstract: A.");
    let d = digester(tmp.path(), true).with_summary_backend(summary.clone());

    let err = d
        .process(&Upload::from_bytes("notes.txt", b"hello".to_vec()))
        .await
        .unwrap_err();

    assert!(matches!(err, DigestError::InvalidUpload { .. }));
    assert!(err.is_retry_upload());
    assert!(summary.requests().is_empty());
    assert_eq!(dir_entries(&tmp.path().join("uploads")), 0);
    assert_eq!(dir_entries(&tmp.path().join("docs")), 0);
}

#[tokio::test]
async fn empty_file_name_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let err = digester(tmp.path(), true)
        .process(&pdf_upload(""))
        .await
        .unwrap_err();
    assert!(matches!(err, DigestError::InvalidUpload { .. }));
}

#[tokio::test]
async fn blank_extraction_fails_without_artifacts() {
    let tmp = tempfile::tempdir().unwrap();
    let d = digester(tmp.path(), true).with_extractor(Arc::new(FixedText("  \n ".into())));

    let err = d.process(&pdf_upload("scan.pdf")).await.unwrap_err();

    assert!(matches!(err, DigestError::ExtractionFailed { .. }));
    assert!(err.is_retry_upload());
    assert_eq!(dir_entries(&tmp.path().join("docs")), 0);
}

// ── Naming and retrieval ────────────────────────────────────────────────────

#[tokio::test]
async fn client_file_name_is_sanitised() {
    let tmp = tempfile::tempdir().unwrap();
    let report = digester(tmp.path(), true)
        .process(&pdf_upload("../../My Paper.pdf"))
        .await
        .unwrap();

    assert_eq!(report.original_filename, "My_Paper.pdf");
    assert!(tmp.path().join("uploads/My_Paper.pdf").is_file());

    let re = Regex::new(r"^My_Paper_\d{8}_\d{6}\.md$").unwrap();
    assert!(re.is_match(report.markdown_file_name().unwrap()));
    assert_eq!(
        report.markdown_file_name().unwrap().trim_end_matches(".md"),
        report.docx_file_name().unwrap().trim_end_matches(".docx")
    );
}

#[tokio::test]
async fn saved_documents_can_be_fetched_but_not_escaped() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("secret.txt"), "x").unwrap();
    let d = digester(tmp.path(), true);
    let report = d.process(&pdf_upload("paper.pdf")).await.unwrap();

    let name = report.docx_file_name().unwrap();
    let path = d.resolve_download(name).unwrap();
    assert!(path.is_file());

    for bad in ["../secret.txt", "/etc/passwd", "a/../../secret.txt"] {
        assert!(
            matches!(d.resolve_download(bad), Err(DigestError::PathTraversal { .. })),
            "{bad} should be refused"
        );
    }
    assert!(matches!(
        d.resolve_download("missing.docx"),
        Err(DigestError::DocumentNotFound { .. })
    ));
}

#[tokio::test]
async fn one_digester_serves_concurrent_requests() {
    let tmp = tempfile::tempdir().unwrap();
    let d = Arc::new(digester(tmp.path(), true));

    let a = tokio::spawn({
        let d = d.clone();
        async move { d.process(&pdf_upload("first.pdf")).await }
    });
    let b = tokio::spawn({
        let d = d.clone();
        async move { d.process(&pdf_upload("second.pdf")).await }
    });

    let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
    assert_eq!(a.original_filename, "first.pdf");
    assert_eq!(b.original_filename, "second.pdf");
    assert_ne!(a.markdown_file_name(), b.markdown_file_name());
}

#[test]
fn report_serialises_to_json() {
    let tmp = tempfile::tempdir().unwrap();
    let report = digester(tmp.path(), true)
        .process_sync(&pdf_upload("paper.pdf"))
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    let keys: Vec<_> = json["summary"].as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys.len(), 4);
    assert_eq!(json["image"]["source"], "placeholder");
    assert_eq!(json["degraded"][0]["reason"]["kind"], "missing_credential");
}
