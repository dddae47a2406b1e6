//! Confidence marker emitted at the top of every synthesis

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static CONFIDENCE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\*\*)?Confidence:(\*\*)?\s*(High|Medium|Med|Low)(\*\*)?")
        .expect("confidence marker pattern is valid")
});

/// Judge's self-reported confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Display label (`HIGH`, `MEDIUM`, `LOW`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "HIGH",
            Confidence::Medium => "MEDIUM",
            Confidence::Low => "LOW",
        }
    }

    fn from_marker(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "high" => Some(Confidence::High),
            "medium" | "med" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Split the confidence marker off a synthesized answer.
///
/// Returns the parsed level (if any marker is present) and the answer with
/// the first marker removed and surrounding whitespace trimmed. Content
/// without a marker is only trimmed.
pub fn extract_confidence(content: &str) -> (Option<Confidence>, String) {
    let Some(captures) = CONFIDENCE_MARKER.captures(content) else {
        return (None, content.trim().to_string());
    };

    let confidence = captures
        .get(3)
        .and_then(|m| Confidence::from_marker(m.as_str()));

    let Some(whole) = captures.get(0) else {
        return (confidence, content.trim().to_string());
    };

    let mut cleaned = String::with_capacity(content.len());
    cleaned.push_str(&content[..whole.start()]);
    cleaned.push_str(&content[whole.end()..]);
    (confidence, cleaned.trim().to_string())
}
