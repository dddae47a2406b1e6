//! Chat session entity

use super::entities::ChatTurn;
use super::history::HistorySnapshot;
use crate::core::string::char_prefix;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title of a session that has not been named yet
pub const DEFAULT_TITLE: &str = "New Conversation";

const TITLE_CHARS: usize = 30;

/// Ordered collection of turns (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    id: String,
    title: String,
    #[serde(default)]
    turns: Vec<ChatTurn>,
    updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: DEFAULT_TITLE.to_string(),
            turns: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn turn(&self, id: &str) -> Option<&ChatTurn> {
        self.turns.iter().find(|t| t.id() == id)
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Append a new turn; the first turn names the session.
    pub fn push_turn(&mut self, turn: ChatTurn) {
        if self.turns.is_empty() && self.title == DEFAULT_TITLE {
            self.title = format!("{}...", char_prefix(turn.prompt(), TITLE_CHARS));
        }
        self.turns.push(turn);
        self.updated_at = Utc::now();
    }

    /// Replace a turn with a newer snapshot of itself.
    ///
    /// Returns `false` when the session holds no turn with that id.
    pub fn update_turn(&mut self, turn: &ChatTurn) -> bool {
        match self.turns.iter_mut().find(|t| t.id() == turn.id()) {
            Some(slot) => {
                *slot = turn.clone();
                self.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// History window for the next turn
    pub fn history(&self, window: usize) -> HistorySnapshot {
        HistorySnapshot::capture(&self.turns, window)
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_turn_names_session() {
        let mut session = ChatSession::new();
        assert_eq!(session.title(), DEFAULT_TITLE);

        session.push_turn(ChatTurn::new(
            "How do I design a rate limiter for a public API?",
            vec![],
            None,
        ));
        assert_eq!(session.title(), "How do I design a rate limiter...");

        session.push_turn(ChatTurn::new("Second question", vec![], None));
        assert_eq!(session.title(), "How do I design a rate limiter...");
        assert_eq!(session.turns().len(), 2);
    }

    #[test]
    fn test_update_turn_replaces_by_id() {
        let mut session = ChatSession::new();
        let mut turn = ChatTurn::new("q", vec![], None);
        session.push_turn(turn.clone());

        turn.fail("boom").unwrap();
        assert!(session.update_turn(&turn));
        assert_eq!(session.turn(turn.id()).unwrap().error(), Some("boom"));

        let stranger = ChatTurn::new("other", vec![], None);
        assert!(!session.update_turn(&stranger));
    }
}
