//! Result types produced by one digest run.

use crate::outcome::Degradation;
use crate::prompts::{NO_PROMPT_TEXT, NO_SUMMARY_TEXT};
use crate::summary::ParsedSummary;
use serde::Serialize;
use std::path::PathBuf;

/// Logical format of a saved summary document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    Markdown,
    Docx,
}

impl ArtifactFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactFormat::Markdown => "md",
            ArtifactFormat::Docx => "docx",
        }
    }
}

/// One saved document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRef {
    pub format: ArtifactFormat,
    /// Bare file name, the handle used for downloads.
    pub file_name: String,
    /// Absolute path on disk.
    pub path: PathBuf,
}

/// The Markdown/DOCX pair written for one summary. Either may be missing if
/// its write failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SavedArtifacts {
    pub markdown: Option<ArtifactRef>,
    pub docx: Option<ArtifactRef>,
}

/// Where an image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSource {
    Generated,
    Placeholder,
}

/// An image saved for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedImage {
    /// Web-relative path, e.g. `images/paper_visualization_20240101_120000.png`.
    pub relative_path: String,
    /// Absolute path on disk.
    pub path: PathBuf,
    pub source: ImageSource,
}

/// A stage that fell back to its degraded value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageNote {
    pub stage: &'static str,
    pub reason: Degradation,
}

/// Everything the presentation layer needs after a run.
#[derive(Debug, Clone, Serialize)]
pub struct DigestReport {
    /// Sanitised name of the uploaded PDF.
    pub original_filename: String,
    pub raw_summary: Option<String>,
    pub summary: ParsedSummary,
    pub artifacts: SavedArtifacts,
    pub visualization_prompt: Option<String>,
    pub image: Option<GeneratedImage>,
    /// Degraded stages, in pipeline order. Empty on a fully live run.
    pub degraded: Vec<StageNote>,
    pub duration_ms: u64,
}

impl DigestReport {
    pub fn markdown_file_name(&self) -> Option<&str> {
        self.artifacts.markdown.as_ref().map(|a| a.file_name.as_str())
    }

    pub fn docx_file_name(&self) -> Option<&str> {
        self.artifacts.docx.as_ref().map(|a| a.file_name.as_str())
    }

    pub fn image_path(&self) -> Option<&str> {
        self.image.as_ref().map(|i| i.relative_path.as_str())
    }

    /// Raw summary, or the "nothing generated" text.
    pub fn display_summary(&self) -> &str {
        self.raw_summary.as_deref().unwrap_or(NO_SUMMARY_TEXT)
    }

    /// Visualisation prompt, or the "nothing generated" text.
    pub fn display_prompt(&self) -> &str {
        self.visualization_prompt.as_deref().unwrap_or(NO_PROMPT_TEXT)
    }

    pub fn is_fully_live(&self) -> bool {
        self.degraded.is_empty()
    }
}
