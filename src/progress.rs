//! Progress-callback trait for per-stage digest events.
//!
//! Attach an [`Arc<dyn DigestProgressCallback>`] with
//! [`crate::digest::Digester::with_progress`] to observe a run as it moves
//! through the pipeline. The library never decides how events are shown: the
//! CLI draws a spinner, a web layer could forward them to a socket.
//!
//! # Example
//!
//! ```rust
//! use edgequake_digest::{DigestProgressCallback, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl DigestProgressCallback for CountingCallback {
//!     fn on_stage_complete(&self, stage: Stage) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{} done", stage);
//!     }
//! }
//!
//! let cb: Arc<dyn DigestProgressCallback> = Arc::new(CountingCallback {
//!     completed: AtomicUsize::new(0),
//! });
//! cb.on_stage_complete(Stage::Extracted);
//! ```

use crate::outcome::Degradation;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Pipeline states, in the order one run passes through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Received,
    Extracted,
    Summarized,
    Persisted,
    Visualized,
    Rendered,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Received,
        Stage::Extracted,
        Stage::Summarized,
        Stage::Persisted,
        Stage::Visualized,
        Stage::Rendered,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Extracted => "extracted",
            Stage::Summarized => "summarized",
            Stage::Persisted => "persisted",
            Stage::Visualized => "visualized",
            Stage::Rendered => "rendered",
        }
    }

    /// Present-tense description for progress displays.
    pub fn activity(self) -> &'static str {
        match self {
            Stage::Received => "Storing upload",
            Stage::Extracted => "Extracting text",
            Stage::Summarized => "Summarizing",
            Stage::Persisted => "Saving documents",
            Stage::Visualized => "Generating visualization",
            Stage::Rendered => "Assembling report",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Called by [`crate::digest::Digester`] as a run advances.
///
/// Stages run sequentially within one run, but one callback may be shared by
/// concurrent runs, hence `Send + Sync`. All methods default to no-ops.
pub trait DigestProgressCallback: Send + Sync {
    /// Called just before `stage` starts.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when `stage` produced a live result.
    fn on_stage_complete(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when `stage` finished on its fallback path.
    fn on_stage_degraded(&self, stage: Stage, reason: &Degradation) {
        let _ = (stage, reason);
    }

    /// Called once after the report is assembled.
    ///
    /// `degraded_stages` counts stages that fell back.
    fn on_digest_complete(&self, degraded_stages: usize) {
        let _ = degraded_stages;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl DigestProgressCallback for NoopProgressCallback {}

pub type ProgressCallback = Arc<dyn DigestProgressCallback>;
