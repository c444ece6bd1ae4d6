//! Upload intake and download resolution.
//!
//! Intake validates the user-supplied file name, sanitises it, and stores the
//! PDF in the uploads directory so the extractor has a stable path. Download
//! resolution is the reverse trip: map a document name back to a file, never
//! letting the name climb out of the directory it belongs to.

use crate::error::DigestError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Extensions accepted at intake (compared case-insensitively).
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf"];

/// Where the uploaded bytes currently are.
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// A file already on disk (e.g. a multipart temp file or a CLI argument).
    Path(PathBuf),
    /// An in-memory body.
    Bytes(Vec<u8>),
}

/// One uploaded file as received from the outer layer.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Name supplied by the client, before sanitising.
    pub file_name: String,
    pub source: UploadSource,
}

impl Upload {
    /// Upload an on-disk file under its own name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            file_name,
            source: UploadSource::Path(path),
        }
    }

    /// Upload an in-memory body under a client-supplied name.
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            source: UploadSource::Bytes(bytes),
        }
    }
}

/// `true` when `file_name` has an allowed extension.
pub fn allowed_file(file_name: &str) -> bool {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => ALLOWED_EXTENSIONS
            .iter()
            .any(|allowed| ext.eq_ignore_ascii_case(allowed)),
        None => false,
    }
}

static RE_UNSAFE_FILENAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]").unwrap());

/// Reduce a client file name to a safe, flat ASCII name.
///
/// Path separators become word breaks, whitespace runs become `_`, anything
/// outside `[A-Za-z0-9_.-]` is dropped, and leading/trailing `.`/`_` are
/// trimmed. `../../etc/passwd` becomes `etc_passwd`.
pub fn secure_filename(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = RE_UNSAFE_FILENAME.replace_all(&joined, "");
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// File name without its final extension (`paper.v2.pdf` → `paper.v2`).
pub fn file_stem(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

/// Validate an upload and return its sanitised name.
pub fn validate(upload: &Upload) -> Result<String, DigestError> {
    let reject = |reason: &str| DigestError::InvalidUpload {
        file_name: upload.file_name.clone(),
        reason: reason.to_string(),
    };

    if upload.file_name.trim().is_empty() {
        return Err(reject("no file name"));
    }
    if let UploadSource::Path(ref p) = upload.source {
        if !p.is_file() {
            return Err(reject("no file was uploaded"));
        }
    }
    if !allowed_file(&upload.file_name) {
        return Err(reject("only .pdf files are accepted"));
    }

    let safe = secure_filename(&upload.file_name);
    if safe.is_empty() || !allowed_file(&safe) {
        return Err(reject("file name has no usable characters"));
    }
    Ok(safe)
}

/// Validate and copy the upload into `uploads_dir`, returning the stored path.
pub async fn store_upload(upload: &Upload, uploads_dir: &Path) -> Result<PathBuf, DigestError> {
    let safe_name = validate(upload)?;
    let dest = uploads_dir.join(&safe_name);

    let io_result = match upload.source {
        UploadSource::Path(ref src) => tokio::fs::copy(src, &dest).await.map(|_| ()),
        UploadSource::Bytes(ref bytes) => tokio::fs::write(&dest, bytes).await,
    };
    io_result.map_err(|e| DigestError::UploadStoreFailed {
        path: dest.clone(),
        source: e,
    })?;

    info!("Stored upload '{}' as {}", upload.file_name, dest.display());
    Ok(dest)
}

/// Resolve `name` to a file directly or indirectly inside `base`.
///
/// Rejects empty names, absolute paths, `..` components, and anything whose
/// canonical path (symlinks followed) lands outside `base`.
pub fn resolve_within(base: &Path, name: &str) -> Result<PathBuf, DigestError> {
    let traversal = || DigestError::PathTraversal {
        name: name.to_string(),
    };

    if name.trim().is_empty() || name.contains('\0') {
        return Err(traversal());
    }
    let requested = Path::new(name);
    if !requested
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    {
        warn!("Rejected document name '{}'", name);
        return Err(traversal());
    }

    let candidate = base.join(requested);
    let not_found = || DigestError::DocumentNotFound {
        name: name.to_string(),
    };
    let canonical_base = base.canonicalize().map_err(|_| not_found())?;
    let canonical = candidate.canonicalize().map_err(|_| not_found())?;

    if !canonical.starts_with(&canonical_base) {
        warn!("Rejected document name '{}' (escapes {})", name, base.display());
        return Err(traversal());
    }
    if !canonical.is_file() {
        return Err(not_found());
    }
    debug!("Resolved '{}' → {}", name, canonical.display());
    Ok(canonical)
}
