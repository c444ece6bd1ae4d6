//! # edgequake-digest
//!
//! Turn a research-paper PDF into a sectioned summary, a Markdown/DOCX pair,
//! a one-paragraph visualization prompt and an illustrative image.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF upload
//!  │
//!  ├─ 1. Intake     validate .pdf, sanitise the name, store under uploads/
//!  ├─ 2. Extract    page text via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Summarize  LLM → "Abstract: … Introduction: … Results: … Discussion: …"
//!  ├─ 4. Persist    <name>_<timestamp>.md + .docx under docs/
//!  ├─ 5. Visualize  LLM → image prompt → PNG (or placeholder) under static/images/
//!  └─ 6. Render     DigestReport
//! ```
//!
//! Every AI call has a designed fallback. With no credentials at all a run
//! still completes: mock summary, default prompt, placeholder image. Which
//! stages fell back is recorded in [`DigestReport::degraded`]. Only a bad
//! upload or an unreadable PDF fails the request.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_digest::{DigestConfig, Digester, Upload};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credentials from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let digester = Digester::new(DigestConfig::from_env())?;
//!     let report = digester.process(&Upload::from_path("paper.pdf")).await?;
//!     for (section, text) in report.summary.iter() {
//!         println!("{section}: {text}");
//!     }
//!     println!("prompt: {}", report.display_prompt());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature   | Default | Description |
//! |-----------|---------|-------------|
//! | `cli`     | on      | Enables the `pdfdigest` binary (clap + anyhow + tracing-subscriber + indicatif + dotenvy) |
//! | `bundled` | off     | Embed the pdfium library in the binary at compile time |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-digest = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod digest;
pub mod error;
pub mod outcome;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;
pub mod summary;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{BackendSlot, CompletionBackend, CompletionRequest, LlmBackend};
pub use config::{DigestConfig, DigestConfigBuilder};
pub use digest::Digester;
pub use error::{BackendError, DigestError};
pub use outcome::{Degradation, Outcome};
pub use output::{
    ArtifactFormat, ArtifactRef, DigestReport, GeneratedImage, ImageSource, SavedArtifacts,
    StageNote,
};
pub use pipeline::documents::DocumentWriter;
pub use pipeline::extract::{PdfiumExtractor, TextExtractor};
pub use pipeline::image::{ImageBackend, ImageProvider, ImagenBackend};
pub use pipeline::intake::{Upload, UploadSource};
pub use pipeline::summarize::Summarizer;
pub use pipeline::visualize::PromptGenerator;
pub use progress::{DigestProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use session::SessionState;
pub use summary::{linearize, parse, ParsedSummary, RawSummary, SectionLabels, SummaryInput};
