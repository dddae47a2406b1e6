//! Action drafts embedded in worker output

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json\s*\n(.*?)\n\s*```").expect("json fence pattern is valid")
});

const DEFAULT_SUBJECT: &str = "Draft from Consensus Engine";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Email,
    Ticket,
    Message,
    Calendar,
}

/// A drafted action (e-mail, ticket, message) extracted from a worker reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDraft {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

#[derive(Deserialize)]
struct TaggedDraft {
    action: String,
    #[serde(flatten)]
    draft: ActionDraft,
}

impl ActionDraft {
    /// `mailto:` link for e-mail drafts
    pub fn mailto_uri(&self) -> Option<String> {
        if self.kind != ActionKind::Email {
            return None;
        }
        let subject = self.subject.as_deref().unwrap_or(DEFAULT_SUBJECT);
        Some(format!(
            "mailto:{}?subject={}&body={}",
            self.recipient.as_deref().unwrap_or_default(),
            urlencoding::encode(subject),
            urlencoding::encode(&self.body)
        ))
    }
}

/// Find the first fenced ```json block tagged `"action": "draft_action"`.
///
/// Best effort: any parse failure simply yields `None`.
pub fn extract_action_draft(content: &str) -> Option<ActionDraft> {
    JSON_FENCE.captures_iter(content).find_map(|captures| {
        let block = captures.get(1)?.as_str();
        let tagged: TaggedDraft = serde_json::from_str(block).ok()?;
        (tagged.action == "draft_action").then_some(tagged.draft)
    })
}
