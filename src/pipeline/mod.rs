//! Pipeline stages for turning one uploaded PDF into a digest.
//!
//! Each submodule implements exactly one step, so every stage can be tested
//! alone and swapped (e.g. a different extractor or image backend) without
//! touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! intake ──▶ extract ──▶ summarize ──▶ documents ──▶ visualize ──▶ image
//! (store)    (pdfium)    (LLM)         (.md/.docx)   (LLM prompt)  (PNG)
//! ```
//!
//! 1. [`intake`]    — validate and sanitise the upload, store it on disk
//! 2. [`extract`]   — concatenate page text; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`summarize`] — request a sectioned summary; degrades to mock or
//!    error text, never fails
//! 4. [`documents`] — write the Markdown/DOCX pair (layout in [`docx`])
//! 5. [`visualize`] — derive a one-paragraph image prompt from the summary
//! 6. [`image`]     — generate the image, or fall back to a placeholder

pub mod documents;
pub mod docx;
pub mod extract;
pub mod image;
pub mod intake;
pub mod summarize;
pub mod visualize;

/// Local wall-clock timestamp used in every artifact name: `YYYYmmdd_HHMMSS`.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_shape() {
        let ts = timestamp();
        assert_eq!(ts.len(), 15);
        assert_eq!(&ts[8..9], "_");
        assert!(ts.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
    }
}
