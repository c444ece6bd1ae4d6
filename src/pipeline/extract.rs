//! Text extraction: concatenated page text from a PDF via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! [`extract_text`] moves the work onto tokio's blocking pool so the runtime
//! workers never stall on a large document.

use crate::error::DigestError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Something that turns a PDF file into plain text.
///
/// The pipeline treats extraction as a black box: it either returns the
/// document text or fails, and a failure sends the user back to upload.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, pdf_path: &Path) -> Result<String, DigestError>;
}

/// Default extractor backed by pdfium.
///
/// The pdfium library is located (and downloaded on first use) by
/// `pdfium-auto`; set `PDFIUM_LIB_PATH` to use an existing copy.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumExtractor;

impl TextExtractor for PdfiumExtractor {
    fn extract(&self, pdf_path: &Path) -> Result<String, DigestError> {
        let pdfium = pdfium_auto::bind_pdfium_silent()
            .map_err(|e| DigestError::PdfiumBindingFailed(e.to_string()))?;

        let document = pdfium.load_pdf_from_file(pdf_path, None).map_err(|e| {
            DigestError::ExtractionFailed {
                path: pdf_path.to_path_buf(),
                detail: format!("{:?}", e),
            }
        })?;

        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        let mut text = String::new();
        for (idx, page) in pages.iter().enumerate() {
            let page_text = page.text().map_err(|e| DigestError::ExtractionFailed {
                path: pdf_path.to_path_buf(),
                detail: format!("page {}: {:?}", idx + 1, e),
            })?;
            let chunk = page_text.all();
            debug!("Page {} → {} chars", idx + 1, chunk.len());
            text.push_str(&chunk);
        }

        Ok(text)
    }
}

/// Run an extractor on the blocking pool and reject empty output.
pub async fn extract_text(
    extractor: Arc<dyn TextExtractor>,
    pdf_path: &Path,
) -> Result<String, DigestError> {
    let path: PathBuf = pdf_path.to_path_buf();
    let text = tokio::task::spawn_blocking(move || extractor.extract(&path))
        .await
        .map_err(|e| DigestError::Internal(format!("Extraction task panicked: {}", e)))??;

    if text.trim().is_empty() {
        return Err(DigestError::ExtractionFailed {
            path: pdf_path.to_path_buf(),
            detail: "no text layer found".to_string(),
        });
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    impl TextExtractor for Fixed {
        fn extract(&self, _pdf_path: &Path) -> Result<String, DigestError> {
            Ok(self.0.to_string())
        }
    }

    struct Failing;

    impl TextExtractor for Failing {
        fn extract(&self, pdf_path: &Path) -> Result<String, DigestError> {
            Err(DigestError::ExtractionFailed {
                path: pdf_path.to_path_buf(),
                detail: "corrupt xref".into(),
            })
        }
    }

    #[tokio::test]
    async fn returns_extracted_text() {
        let text = extract_text(Arc::new(Fixed("page one")), Path::new("a.pdf"))
            .await
            .unwrap();
        assert_eq!(text, "page one");
    }

    #[tokio::test]
    async fn blank_text_is_an_extraction_failure() {
        let err = extract_text(Arc::new(Fixed("  \n ")), Path::new("a.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, DigestError::ExtractionFailed { .. }));
    }

    #[tokio::test]
    async fn extractor_error_propagates() {
        let err = extract_text(Arc::new(Failing), Path::new("a.pdf"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("corrupt xref"));
    }
}
