//! Per-request state threaded between pipeline stages.
//!
//! A [`SessionState`] is created when an upload is accepted, filled in stage
//! by stage, drained with the `take_*` accessors when the report is built,
//! and then cleared. Nothing here outlives one request.

use crate::output::{GeneratedImage, SavedArtifacts};
use crate::summary::RawSummary;
use std::path::PathBuf;

#[derive(Debug, Default)]
pub struct SessionState {
    pub original_filename: Option<String>,
    pub stored_path: Option<PathBuf>,
    pub extracted_text: Option<String>,
    pub raw_summary: Option<RawSummary>,
    pub artifacts: Option<SavedArtifacts>,
    pub visualization_prompt: Option<String>,
    pub image: Option<GeneratedImage>,
}

impl SessionState {
    /// Start a session for an accepted upload.
    pub fn new(original_filename: impl Into<String>) -> Self {
        Self {
            original_filename: Some(original_filename.into()),
            ..Default::default()
        }
    }

    pub fn take_original_filename(&mut self) -> Option<String> {
        self.original_filename.take()
    }

    pub fn take_extracted_text(&mut self) -> Option<String> {
        self.extracted_text.take()
    }

    pub fn take_raw_summary(&mut self) -> Option<RawSummary> {
        self.raw_summary.take()
    }

    pub fn take_artifacts(&mut self) -> Option<SavedArtifacts> {
        self.artifacts.take()
    }

    pub fn take_visualization_prompt(&mut self) -> Option<String> {
        self.visualization_prompt.take()
    }

    pub fn take_image(&mut self) -> Option<GeneratedImage> {
        self.image.take()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.original_filename.is_none()
            && self.stored_path.is_none()
            && self.extracted_text.is_none()
            && self.raw_summary.is_none()
            && self.artifacts.is_none()
            && self.visualization_prompt.is_none()
            && self.image.is_none()
    }
}
