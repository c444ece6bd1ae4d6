//! Structured-summary parsing: raw labelled text → ordered sections.
//!
//! The summarisation model is asked to answer with lines such as
//! `Abstract: …`, `Introduction: …`. Nothing guarantees it complies, so the
//! parser is tolerant: unknown lines attach to the section in progress, text
//! before the first label is dropped, and a reply with no label at all is kept
//! whole under [`FULL_SUMMARY_KEY`].
//!
//! Multi-line section bodies are joined with single spaces. Paragraph breaks
//! inside a section are therefore collapsed; downstream documents rely on that
//! one-paragraph-per-section shape.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// Key used when no recognised label was found.
pub const FULL_SUMMARY_KEY: &str = "Full Summary";

/// Key used when the input was not text.
pub const ERROR_KEY: &str = "Error";

/// Message stored under [`ERROR_KEY`] for non-textual input.
pub const NOT_TEXT_MESSAGE: &str = "Summary was not in expected string format.";

/// Default section vocabulary, in the order the model is asked to produce it.
pub const DEFAULT_LABELS: [&str; 4] = ["Abstract", "Introduction", "Results", "Discussion"];

/// Unstructured text returned by the summarisation stage.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RawSummary(String);

impl RawSummary {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Parse with the default vocabulary.
    pub fn parse(&self) -> ParsedSummary {
        parse(&self.0)
    }
}

impl fmt::Display for RawSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RawSummary {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Ordered list of recognised section labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionLabels {
    labels: Vec<String>,
}

impl Default for SectionLabels {
    fn default() -> Self {
        Self::new(DEFAULT_LABELS)
    }
}

impl SectionLabels {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// The label a trimmed line opens, if any, and the text after its colon.
    fn match_line<'a>(&self, line: &'a str) -> Option<(&'a str, &'a str)> {
        self.labels.iter().find_map(|label| {
            let rest = line.strip_prefix(label.as_str())?;
            let body = rest.strip_prefix(':')?;
            Some((&line[..label.len()], body))
        })
    }

    /// Split `raw` into labelled sections.
    pub fn parse(&self, raw: &str) -> ParsedSummary {
        let mut parsed = ParsedSummary::default();
        let mut current: Option<(&str, Vec<&str>)> = None;

        for line in raw.trim().split('\n') {
            let line = line.trim();
            if let Some((label, body)) = self.match_line(line) {
                if let Some((section, fragments)) = current.take() {
                    parsed.flush(section, &fragments);
                }
                current = Some((label.trim(), vec![body.trim()]));
            } else if let Some((_, fragments)) = current.as_mut() {
                fragments.push(line);
            }
        }

        if let Some((section, fragments)) = current {
            parsed.flush(section, &fragments);
        }

        if parsed.is_empty() {
            return ParsedSummary::single(FULL_SUMMARY_KEY, raw.trim());
        }
        parsed
    }
}

/// Ordered section name → content mapping.
///
/// Keys are recognised labels, [`FULL_SUMMARY_KEY`], or [`ERROR_KEY`].
/// Serialises as a JSON object with keys in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSummary {
    sections: Vec<(String, String)>,
}

impl ParsedSummary {
    fn single(key: &str, value: &str) -> Self {
        Self {
            sections: vec![(key.to_string(), value.to_string())],
        }
    }

    /// The sentinel mapping for input that was not text.
    pub fn not_text() -> Self {
        Self::single(ERROR_KEY, NOT_TEXT_MESSAGE)
    }

    /// Record a finished section. A repeated label replaces the earlier
    /// content but keeps its original position.
    fn flush(&mut self, section: &str, fragments: &[&str]) {
        if fragments.is_empty() {
            return;
        }
        let content = fragments.join(" ").trim().to_string();
        match self.sections.iter_mut().find(|(k, _)| k == section) {
            Some((_, v)) => *v = content,
            None => self.sections.push((section.to_string(), content)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sections.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// `true` when no label was recognised and the text is kept whole.
    pub fn is_full_summary(&self) -> bool {
        self.sections.len() == 1 && self.sections[0].0 == FULL_SUMMARY_KEY
    }
}

impl Serialize for ParsedSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sections.len()))?;
        for (k, v) in &self.sections {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Parse with the default `Abstract / Introduction / Results / Discussion` vocabulary.
pub fn parse(raw: &str) -> ParsedSummary {
    SectionLabels::default().parse(raw)
}

/// Parse bytes that should hold UTF-8 text.
pub fn parse_bytes(raw: &[u8]) -> ParsedSummary {
    match std::str::from_utf8(raw) {
        Ok(text) => parse(text),
        Err(_) => ParsedSummary::not_text(),
    }
}

/// Parse a JSON value that should be a string (e.g. restored session state).
pub fn parse_value(raw: &serde_json::Value) -> ParsedSummary {
    match raw.as_str() {
        Some(text) => parse(text),
        None => ParsedSummary::not_text(),
    }
}

/// Render sections back to `Label: content` lines.
pub fn linearize(summary: &ParsedSummary) -> String {
    summary
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// A summary in either of the forms the prompt stage accepts.
#[derive(Debug, Clone, Copy)]
pub enum SummaryInput<'a> {
    Raw(&'a str),
    Parsed(&'a ParsedSummary),
}

impl SummaryInput<'_> {
    /// Flatten to the text sent to the model.
    pub fn to_text(&self) -> String {
        match self {
            SummaryInput::Raw(s) => (*s).to_string(),
            SummaryInput::Parsed(p) => linearize(p),
        }
    }
}

impl<'a> From<&'a str> for SummaryInput<'a> {
    fn from(s: &'a str) -> Self {
        SummaryInput::Raw(s)
    }
}

impl<'a> From<&'a String> for SummaryInput<'a> {
    fn from(s: &'a String) -> Self {
        SummaryInput::Raw(s.as_str())
    }
}

impl<'a> From<&'a RawSummary> for SummaryInput<'a> {
    fn from(s: &'a RawSummary) -> Self {
        SummaryInput::Raw(s.as_str())
    }
}

impl<'a> From<&'a ParsedSummary> for SummaryInput<'a> {
    fn from(p: &'a ParsedSummary) -> Self {
        SummaryInput::Parsed(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(p: &ParsedSummary) -> Vec<(&str, &str)> {
        p.iter().collect()
    }

    #[test]
    fn four_labels_on_four_lines() {
        let raw = "Abstract: A.\nIntroduction: B.\nResults: C.\nDiscussion: D.";
        let p = parse(raw);
        assert_eq!(
            pairs(&p),
            vec![
                ("Abstract", "A."),
                ("Introduction", "B."),
                ("Results", "C."),
                ("Discussion", "D."),
            ]
        );
    }

    #[test]
    fn plain_text_is_full_summary() {
        let p = parse("just some plain text");
        assert_eq!(pairs(&p), vec![(FULL_SUMMARY_KEY, "just some plain text")]);
        assert!(p.is_full_summary());
    }

    #[test]
    fn full_summary_is_trimmed() {
        let p = parse("\n  no labels here  \n\n");
        assert_eq!(p.get(FULL_SUMMARY_KEY), Some("no labels here"));
    }

    #[test]
    fn continuation_lines_are_space_joined() {
        let raw = "Abstract: first line\nsecond line\n\nthird after blank\nResults: r";
        let p = parse(raw);
        // The blank line is an empty fragment, which leaves a double space.
        assert_eq!(
            p.get("Abstract"),
            Some("first line second line  third after blank")
        );
        assert_eq!(p.get("Results"), Some("r"));
    }

    #[test]
    fn preamble_before_first_label_is_dropped() {
        let raw = "Sure! Here is your summary.\nAbstract: A\nDiscussion: D";
        let p = parse(raw);
        assert_eq!(pairs(&p), vec![("Abstract", "A"), ("Discussion", "D")]);
    }

    #[test]
    fn bare_label_yields_empty_section() {
        let p = parse("Abstract:\nIntroduction: I");
        assert_eq!(pairs(&p), vec![("Abstract", ""), ("Introduction", "I")]);
    }

    #[test]
    fn body_on_following_lines() {
        let p = parse("Abstract:\n  body text  ");
        assert_eq!(p.get("Abstract"), Some("body text"));
    }

    #[test]
    fn label_must_be_followed_by_colon() {
        let p = parse("Abstract without colon\nResultsX: nope");
        assert!(p.is_full_summary());
    }

    #[test]
    fn indented_labels_are_recognised() {
        let p = parse("   Abstract: A\n\tResults: R");
        assert_eq!(pairs(&p), vec![("Abstract", "A"), ("Results", "R")]);
    }

    #[test]
    fn repeated_label_keeps_first_position() {
        let p = parse("Abstract: one\nResults: r\nAbstract: two");
        assert_eq!(pairs(&p), vec![("Abstract", "two"), ("Results", "r")]);
    }

    #[test]
    fn colon_inside_body_is_kept() {
        let p = parse("Results: accuracy: 93%");
        assert_eq!(p.get("Results"), Some("accuracy: 93%"));
    }

    #[test]
    fn crlf_lines_are_trimmed() {
        let p = parse("Abstract: A\r\nResults: R\r\n");
        assert_eq!(pairs(&p), vec![("Abstract", "A"), ("Results", "R")]);
    }

    #[test]
    fn invalid_utf8_is_error_entry() {
        let p = parse_bytes(&[0xff, 0xfe, 0x00]);
        assert_eq!(pairs(&p), vec![(ERROR_KEY, NOT_TEXT_MESSAGE)]);
    }

    #[test]
    fn non_string_json_is_error_entry() {
        let p = parse_value(&serde_json::json!({"Abstract": "x"}));
        assert_eq!(pairs(&p), vec![(ERROR_KEY, NOT_TEXT_MESSAGE)]);

        let p = parse_value(&serde_json::json!("Abstract: x"));
        assert_eq!(p.get("Abstract"), Some("x"));
    }

    #[test]
    fn custom_vocabulary() {
        let labels = SectionLabels::new(["Methods", "Limitations"]);
        let p = labels.parse("Abstract: ignored\nMethods: m\nLimitations: l");
        assert_eq!(pairs(&p), vec![("Methods", "m"), ("Limitations", "l")]);
    }

    #[test]
    fn linearize_then_parse_is_identity() {
        let original = parse("Abstract: a b\nIntroduction: c\nResults: d\nDiscussion: e f");
        let text = linearize(&original);
        assert_eq!(
            text,
            "Abstract: a b\nIntroduction: c\nResults: d\nDiscussion: e f"
        );
        assert_eq!(parse(&text), original);
    }

    #[test]
    fn serialises_in_order() {
        let p = parse("Results: r\nAbstract: a");
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"Results":"r","Abstract":"a"}"#);
    }

    #[test]
    fn summary_input_from_parsed_linearizes() {
        let p = parse("Abstract: a\nResults: r");
        assert_eq!(SummaryInput::from(&p).to_text(), "Abstract: a\nResults: r");
        assert_eq!(SummaryInput::from("plain").to_text(), "plain");
    }
}
