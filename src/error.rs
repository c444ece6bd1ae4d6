//! Error types for the edgequake-digest library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DigestError`] — **Structural**: the request cannot proceed at all
//!   (no file, not a PDF, text extraction failed). Returned as
//!   `Err(DigestError)` from [`crate::digest::Digester::process`]; the caller
//!   should send the user back to the upload step.
//!
//! * [`BackendError`] — **Degradable**: an LLM or image backend misbehaved.
//!   It never escapes a pipeline stage; each stage turns it into a degraded
//!   value (error-text summary, default prompt, placeholder image) so the
//!   request always completes.

use edgequake_llm::LlmError;
use std::path::PathBuf;
use thiserror::Error;

/// All structural errors returned by the edgequake-digest library.
#[derive(Debug, Error)]
pub enum DigestError {
    // ── Intake errors ─────────────────────────────────────────────────────
    /// The upload is missing, has an empty name, or is not a `.pdf`.
    #[error("Invalid upload '{file_name}': {reason}\nUpload a single .pdf file and try again.")]
    InvalidUpload { file_name: String, reason: String },

    /// The uploaded file could not be copied into the uploads directory.
    #[error("Failed to store upload '{path}': {source}")]
    UploadStoreFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The text extractor failed or produced no text.
    #[error("Text extraction failed for '{path}': {detail}")]
    ExtractionFailed { path: PathBuf, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
If the auto-download failed, set PDFIUM_LIB_PATH=/path/to/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Download errors ───────────────────────────────────────────────────
    /// Requested document name escapes the documents directory or is malformed.
    #[error("Refusing to serve '{name}': path is outside the documents directory")]
    PathTraversal { name: String },

    /// Requested document does not exist.
    #[error("Document not found: '{name}'")]
    DocumentNotFound { name: String },

    // ── Filesystem / config errors ────────────────────────────────────────
    /// An output directory could not be created.
    #[error("Failed to create directory '{path}': {source}")]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DigestError {
    /// `true` when the right response is "send the user back to upload".
    ///
    /// Only configuration and internal errors are not caused by the upload
    /// itself.
    pub fn is_retry_upload(&self) -> bool {
        matches!(
            self,
            DigestError::InvalidUpload { .. }
                | DigestError::UploadStoreFailed { .. }
                | DigestError::ExtractionFailed { .. }
                | DigestError::PdfiumBindingFailed(_)
        )
    }
}

/// A failed call to an LLM or image backend.
///
/// The kind drives the human-readable label embedded in degraded values,
/// e.g. `Error: OpenAI API Rate Limit Exceeded - …`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// Could not reach the backend (DNS, TLS, connection reset, timeout).
    #[error("Connection Error - {0}")]
    Connection(String),

    /// HTTP 429 or an explicit quota message.
    #[error("Rate Limit Exceeded - {0}")]
    RateLimited(String),

    /// Non-success status or an API-level rejection (auth, bad request, safety filter).
    #[error("Status Error - {0}")]
    Status(String),

    /// The backend answered but carried no usable content.
    #[error("returned an empty response")]
    EmptyResponse,

    /// Anything else.
    #[error("unexpected error - {0}")]
    Unexpected(String),
}

impl BackendError {
    /// Render as the `Error: …` text that flows through the pipeline.
    pub fn to_degraded_text(&self, backend_label: &str) -> String {
        match self {
            BackendError::Unexpected(detail) => format!(
                "Error: An unexpected error occurred with the {backend_label} - {detail}"
            ),
            other => format!("Error: {backend_label} {other}"),
        }
    }
}

impl From<LlmError> for BackendError {
    fn from(e: LlmError) -> Self {
        let message = e.to_string();
        match e {
            LlmError::NetworkError(_) | LlmError::Timeout => BackendError::Connection(message),
            LlmError::RateLimited(_) => BackendError::RateLimited(message),
            LlmError::ApiError(_)
            | LlmError::AuthError(_)
            | LlmError::InvalidRequest(_)
            | LlmError::ModelNotFound(_) => BackendError::Status(message),
            _ => BackendError::Unexpected(message),
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            BackendError::Connection(e.to_string())
        } else if let Some(status) = e.status() {
            if status.as_u16() == 429 {
                BackendError::RateLimited(e.to_string())
            } else {
                BackendError::Status(e.to_string())
            }
        } else {
            BackendError::Unexpected(e.to_string())
        }
    }
}
