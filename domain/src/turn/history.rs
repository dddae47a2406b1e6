//! Immutable conversation history captured at turn start

use super::entities::ChatTurn;
use super::stage::TurnStage;
use serde::{Deserialize, Serialize};

/// One earlier exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub prompt: String,
    pub answer: String,
}

/// Trailing window of completed turns, passed by value through the pipeline
/// so concurrent reads of the live session never race with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    entries: Vec<HistoryEntry>,
}

impl HistorySnapshot {
    pub fn new(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    /// Last `window` completed turns, oldest first
    pub fn capture(turns: &[ChatTurn], window: usize) -> Self {
        let completed: Vec<_> = turns
            .iter()
            .filter(|t| t.stage() == TurnStage::Complete)
            .collect();
        let skip = completed.len().saturating_sub(window);
        let entries = completed
            .into_iter()
            .skip(skip)
            .map(|t| HistoryEntry {
                prompt: t.prompt().to_string(),
                answer: t.confidence().1,
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Plain-text transcript for prompts
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("User: {}\nAssistant: {}", e.prompt, e.answer))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
