//! Session persistence port

use async_trait::async_trait;
use consensus_domain::{ChatSession, UserPreferences};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable storage for preferences and chat sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stored preferences, or `None` when nothing was saved yet
    async fn load_preferences(&self) -> Result<Option<UserPreferences>, StoreError>;

    async fn save_preferences(&self, preferences: &UserPreferences) -> Result<(), StoreError>;

    /// All non-empty sessions, most recently updated first
    async fn load_sessions(&self) -> Result<Vec<ChatSession>, StoreError>;

    /// Insert or replace a session by id
    async fn save_session(&self, session: &ChatSession) -> Result<(), StoreError>;

    /// Returns `false` when no session had that id
    async fn delete_session(&self, id: &str) -> Result<bool, StoreError>;

    async fn clear_sessions(&self) -> Result<(), StoreError>;
}

/// Store that keeps nothing, for one-shot runs
pub struct NoSessionStore;

#[async_trait]
impl SessionStore for NoSessionStore {
    async fn load_preferences(&self) -> Result<Option<UserPreferences>, StoreError> {
        Ok(None)
    }

    async fn save_preferences(&self, _preferences: &UserPreferences) -> Result<(), StoreError> {
        Ok(())
    }

    async fn load_sessions(&self) -> Result<Vec<ChatSession>, StoreError> {
        Ok(Vec::new())
    }

    async fn save_session(&self, _session: &ChatSession) -> Result<(), StoreError> {
        Ok(())
    }

    async fn delete_session(&self, _id: &str) -> Result<bool, StoreError> {
        Ok(false)
    }

    async fn clear_sessions(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
