//! Prompts and fixed fallback texts for the summary and visualisation stages.
//!
//! Degraded texts sit next to the prompts. They are part of the contract with
//! whatever renders the result, since they flow through the pipeline exactly
//! like real model output.

/// System message for the summarisation model.
pub const SUMMARY_SYSTEM_PROMPT: &str =
    "You are a helpful assistant skilled in summarizing research papers into structured formats.";

/// Build the summarisation request for the extracted paper text.
pub fn summary_request(paper_text: &str) -> String {
    format!(
        "\nPlease summarize the following research paper text.\n\
Structure the summary into these distinct sections: Abstract, Introduction, Results, and Discussion.\n\
Ensure each section is clearly labeled (e.g., \"Abstract: ...\", \"Introduction: ...\").\n\
\n\
Research Paper Text:\n\
{paper_text}\n"
    )
}

/// Returned instead of a summary when no summarisation credential is set.
///
/// Every recognised label is present so the rest of the pipeline exercises
/// the structured path.
pub const MOCK_SUMMARY: &str = "Abstract: OpenAI API key not found. This is a mock abstract.
Introduction: The system requires an OpenAI API key for real summarization with GPT.
Results: Mock results are shown.
Discussion: Please set the OPENAI_API_KEY environment variable for actual AI processing.
";

/// Returned when the summarisation backend answers with no content.
pub const EMPTY_SUMMARY_RESPONSE: &str =
    "Error: OpenAI API returned an empty response. Please check the API status or try again.";

/// Label used in `Error: …` texts produced by the summarisation stage.
pub const SUMMARY_BACKEND_LABEL: &str = "OpenAI API";

/// Cue line that ends the visualisation request; models sometimes echo it.
pub const IMAGE_PROMPT_CUE: &str = "Generated Image Prompt:";

/// Build the visualisation-prompt request for a linearised summary.
pub fn image_prompt_request(summary: &str) -> String {
    format!(
        "\nBased on the following research paper summary, generate a concise and visually \
descriptive prompt (around 20-30 words) that can be used by an image generation AI to create \
a compelling visualization representing the core findings or essence of the paper.\n\
\n\
Summary:\n\
{summary}\n\
\n\
{IMAGE_PROMPT_CUE}\n"
    )
}

/// Returned instead of a visualisation prompt when no prompt credential is set.
pub const DEFAULT_IMAGE_PROMPT: &str = "Anthropic API key not set. Using default prompt: \
A generic scientific concept representing research findings.";

/// Returned without a backend call when the summary is blank.
pub const EMPTY_SUMMARY_IMAGE_PROMPT: &str =
    "Empty summary. Default prompt: Abstract visualization of data.";

/// Returned when the prompt backend answers with no content.
pub const EMPTY_IMAGE_PROMPT_RESPONSE: &str =
    "Error: Anthropic API (Claude) returned an empty response for visualization prompt.";

/// Label used in `Error: …` texts produced by the visualisation stage.
pub const IMAGE_PROMPT_BACKEND_LABEL: &str = "Anthropic API";

/// Shown by result views when no summary exists for the session.
pub const NO_SUMMARY_TEXT: &str = "No summary generated.";

/// Shown by result views when no prompt exists for the session.
pub const NO_PROMPT_TEXT: &str = "No visualization prompt generated.";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{parse, DEFAULT_LABELS};

    #[test]
    fn mock_summary_has_every_label() {
        let parsed = parse(MOCK_SUMMARY);
        let keys: Vec<&str> = parsed.keys().collect();
        assert_eq!(keys, DEFAULT_LABELS.to_vec());
    }

    #[test]
    fn summary_request_embeds_text_and_labels() {
        let req = summary_request("PAPER BODY");
        assert!(req.contains("Research Paper Text:\nPAPER BODY"));
        for label in DEFAULT_LABELS {
            assert!(req.contains(label), "missing {label}");
        }
    }

    #[test]
    fn image_prompt_request_ends_with_cue() {
        let req = image_prompt_request("Abstract: a");
        assert!(req.contains("Summary:\nAbstract: a"));
        assert!(req.trim_end().ends_with(IMAGE_PROMPT_CUE));
        assert!(req.contains("20-30 words"));
    }
}
