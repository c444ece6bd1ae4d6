//! Document stage: persist a summary as a Markdown + DOCX pair.
//!
//! Both files share one `<prefix>_<timestamp>` base name so they can be
//! associated with the request that produced them. The two writes are
//! independent: if one fails it is logged and reported as `None`, and the
//! other is still attempted.

use crate::error::DigestError;
use crate::output::{ArtifactFormat, ArtifactRef, SavedArtifacts};
use crate::pipeline::docx::DocxDocument;
use crate::pipeline::intake::{file_stem, resolve_within};
use crate::pipeline::timestamp;
use crate::summary::{SectionLabels, ERROR_KEY, FULL_SUMMARY_KEY};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Writes summary documents into one directory and serves them back.
#[derive(Debug, Clone)]
pub struct DocumentWriter {
    docs_dir: PathBuf,
    labels: SectionLabels,
}

impl DocumentWriter {
    pub fn new(docs_dir: impl Into<PathBuf>, labels: SectionLabels) -> Self {
        Self {
            docs_dir: docs_dir.into(),
            labels,
        }
    }

    pub fn docs_dir(&self) -> &Path {
        &self.docs_dir
    }

    /// Save `raw` as `<stem>_<timestamp>.md` and `<stem>_<timestamp>.docx`.
    ///
    /// `name_prefix` may carry an extension (`paper.pdf`); it is dropped.
    pub fn save(&self, raw: &str, name_prefix: &str) -> SavedArtifacts {
        let base = format!("{}_{}", file_stem(name_prefix), timestamp());
        self.save_as(raw, &base)
    }

    /// [`save`](Self::save) on tokio's blocking pool. File and zip I/O stay
    /// off the runtime workers.
    pub async fn persist(&self, raw: String, name_prefix: String) -> SavedArtifacts {
        let writer = self.clone();
        match tokio::task::spawn_blocking(move || writer.save(&raw, &name_prefix)).await {
            Ok(saved) => saved,
            Err(e) => {
                warn!("Document task panicked: {}", e);
                SavedArtifacts::default()
            }
        }
    }

    fn save_as(&self, raw: &str, base: &str) -> SavedArtifacts {
        let markdown = self.write_artifact(ArtifactFormat::Markdown, base, |file| {
            file.write_all(raw.as_bytes())
        });

        let document = self.compose_docx(raw);
        let docx = self.write_artifact(ArtifactFormat::Docx, base, |file| {
            document.write_to(file)
        });

        SavedArtifacts { markdown, docx }
    }

    /// Lay out the DOCX body from the parsed summary.
    pub fn compose_docx(&self, raw: &str) -> DocxDocument {
        let parsed = self.labels.parse(raw);
        let mut doc = DocxDocument::new();

        if parsed.is_full_summary() {
            doc.add_paragraph(parsed.get(FULL_SUMMARY_KEY).unwrap_or(raw));
        } else {
            for (section, content) in parsed.iter().filter(|(k, _)| *k != ERROR_KEY) {
                doc.add_heading(section);
                doc.add_paragraph(content);
            }
        }

        if doc.is_empty() {
            doc.add_paragraph(raw);
        }
        doc
    }

    /// Write one file atomically (temp file in the same directory, then
    /// rename). Failures are logged and yield `None`.
    fn write_artifact<F>(&self, format: ArtifactFormat, base: &str, write: F) -> Option<ArtifactRef>
    where
        F: FnOnce(&mut std::fs::File) -> std::io::Result<()>,
    {
        let file_name = format!("{}.{}", base, format.extension());
        let dest = self.docs_dir.join(&file_name);

        let result = (|| -> std::io::Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&self.docs_dir)?;
            write(tmp.as_file_mut())?;
            tmp.as_file_mut().flush()?;
            tmp.persist(&dest).map_err(|e| e.error)?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                let path = dest.canonicalize().unwrap_or_else(|_| dest.clone());
                info!("Summary saved to {}", path.display());
                Some(ArtifactRef {
                    format,
                    file_name,
                    path,
                })
            }
            Err(e) => {
                warn!("Failed to save {:?} file {}: {}", format, dest.display(), e);
                None
            }
        }
    }

    /// Map a document name to its file, refusing anything outside the
    /// documents directory.
    pub fn resolve_download(&self, name: &str) -> Result<PathBuf, DigestError> {
        resolve_within(&self.docs_dir, name)
    }
}
