//! Live-or-degraded values returned by every AI integration point.
//!
//! The summary, prompt and image stages are total functions: they always
//! hand back a value of the expected shape. [`Outcome`] keeps that value
//! usable as-is while recording *why* it is not the real thing, so callers
//! branch on a tag instead of on error handling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a stage produced a stand-in value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Degradation {
    /// The backend credential is not configured.
    MissingCredential,
    /// The input was empty, so no backend call was made.
    EmptyInput,
    /// The backend answered without usable content.
    EmptyResponse,
    /// The backend call failed.
    BackendFailure(String),
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::MissingCredential => f.write_str("credential not configured"),
            Degradation::EmptyInput => f.write_str("empty input"),
            Degradation::EmptyResponse => f.write_str("empty backend response"),
            Degradation::BackendFailure(detail) => write!(f, "backend failure: {detail}"),
        }
    }
}

/// A stage result: the real value, or a designed fallback plus its reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Live { value: T },
    Degraded { value: T, reason: Degradation },
}

impl<T> Outcome<T> {
    pub fn live(value: T) -> Self {
        Outcome::Live { value }
    }

    pub fn degraded(value: T, reason: Degradation) -> Self {
        Outcome::Degraded { value, reason }
    }

    pub fn value(&self) -> &T {
        match self {
            Outcome::Live { value } | Outcome::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Outcome::Live { value } | Outcome::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded { .. })
    }

    /// The degradation reason, if any.
    pub fn reason(&self) -> Option<&Degradation> {
        match self {
            Outcome::Live { .. } => None,
            Outcome::Degraded { reason, .. } => Some(reason),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Live { value } => Outcome::Live { value: f(value) },
            Outcome::Degraded { value, reason } => Outcome::Degraded {
                value: f(value),
                reason,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_value_is_still_usable() {
        let o = Outcome::degraded("fallback".to_string(), Degradation::MissingCredential);
        assert!(o.is_degraded());
        assert_eq!(o.value(), "fallback");
        assert_eq!(o.reason(), Some(&Degradation::MissingCredential));
    }

    #[test]
    fn map_keeps_tag() {
        let o = Outcome::degraded(2, Degradation::EmptyInput).map(|n| n * 10);
        assert_eq!(o.into_value(), 20);

        let o = Outcome::live(1).map(|n| n + 1);
        assert!(!o.is_degraded());
        assert_eq!(o.reason(), None);
    }

    #[test]
    fn serialises_with_status_tag() {
        let o = Outcome::degraded("x", Degradation::BackendFailure("down".into()));
        let json = serde_json::to_value(&o).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["reason"]["kind"], "backend_failure");
        assert_eq!(json["reason"]["detail"], "down");
    }
}
