//! JSON file store for preferences and chat sessions.
//!
//! Layout under the data directory:
//!
//! ```text
//! preferences.json   UserPreferences
//! sessions.json      [ChatSession, ...] most recently updated first
//! ```
//!
//! Every write goes to a `.tmp` sibling first and is renamed into place, so
//! a crash never leaves a half-written file behind.

use async_trait::async_trait;
use consensus_application::ports::session_store::{SessionStore, StoreError};
use consensus_domain::{ChatSession, UserPreferences};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const PREFERENCES_FILE: &str = "preferences.json";
const SESSIONS_FILE: &str = "sessions.json";

pub struct JsonFileSessionStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles on `sessions.json`
    sessions_lock: Mutex<()>,
}

impl JsonFileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            sessions_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    async fn read_sessions(&self) -> Result<Vec<ChatSession>, StoreError> {
        Ok(read_json(&self.path(SESSIONS_FILE)).await?.unwrap_or_default())
    }

    async fn write_sessions(&self, mut sessions: Vec<ChatSession>) -> Result<(), StoreError> {
        sessions.sort_by_key(|s| std::cmp::Reverse(s.updated_at()));
        write_json(&self.path(SESSIONS_FILE), &sessions).await
    }
}

#[async_trait]
impl SessionStore for JsonFileSessionStore {
    async fn load_preferences(&self) -> Result<Option<UserPreferences>, StoreError> {
        read_json(&self.path(PREFERENCES_FILE)).await
    }

    async fn save_preferences(&self, preferences: &UserPreferences) -> Result<(), StoreError> {
        write_json(&self.path(PREFERENCES_FILE), preferences).await
    }

    async fn load_sessions(&self) -> Result<Vec<ChatSession>, StoreError> {
        let _guard = self.sessions_lock.lock().await;
        let mut sessions = self.read_sessions().await?;
        let before = sessions.len();
        sessions.retain(|s| !s.is_empty());
        if sessions.len() < before {
            debug!("Skipped {} empty sessions", before - sessions.len());
        }
        sessions.sort_by_key(|s| std::cmp::Reverse(s.updated_at()));
        Ok(sessions)
    }

    async fn save_session(&self, session: &ChatSession) -> Result<(), StoreError> {
        let _guard = self.sessions_lock.lock().await;
        let mut sessions = self.read_sessions().await?;
        match sessions.iter_mut().find(|s| s.id() == session.id()) {
            Some(slot) => *slot = session.clone(),
            None => sessions.push(session.clone()),
        }
        self.write_sessions(sessions).await
    }

    async fn delete_session(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.sessions_lock.lock().await;
        let mut sessions = self.read_sessions().await?;
        let before = sessions.len();
        sessions.retain(|s| s.id() != id);
        if sessions.len() == before {
            return Ok(false);
        }
        self.write_sessions(sessions).await?;
        Ok(true)
    }

    async fn clear_sessions(&self) -> Result<(), StoreError> {
        let _guard = self.sessions_lock.lock().await;
        match fs::remove_file(self.path(SESSIONS_FILE)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// `None` when the file does not exist yet.
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!("Could not parse {}: {}", path.display(), e);
            Err(e.into())
        }
    }
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(value)?;
    let staged = path.with_extension("json.tmp");
    fs::write(&staged, json).await?;
    fs::rename(&staged, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus_domain::ChatTurn;

    fn session(id: &str, prompt: Option<&str>) -> ChatSession {
        let mut session = ChatSession::with_id(id);
        if let Some(prompt) = prompt {
            session.push_turn(ChatTurn::new(prompt, vec![], None));
        }
        session
    }

    #[tokio::test]
    async fn test_missing_files_load_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path().join("nested"));
        assert!(store.load_preferences().await.unwrap().is_none());
        assert!(store.load_sessions().await.unwrap().is_empty());
        assert!(!store.delete_session("x").await.unwrap());
        store.clear_sessions().await.unwrap();
    }

    #[tokio::test]
    async fn test_preferences_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path());
        let prefs = UserPreferences {
            persona: "SRE".to_string(),
            memory_enabled: false,
            ..Default::default()
        };
        store.save_preferences(&prefs).await.unwrap();
        assert_eq!(store.load_preferences().await.unwrap(), Some(prefs));
        assert!(!dir.path().join("preferences.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_save_replaces_by_id_and_skips_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path());

        store.save_session(&session("a", Some("first"))).await.unwrap();
        store.save_session(&session("empty", None)).await.unwrap();
        let mut updated = session("a", Some("first"));
        updated.push_turn(ChatTurn::new("second", vec![], None));
        store.save_session(&updated).await.unwrap();

        let loaded = store.load_sessions().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id(), "a");
        assert_eq!(loaded[0].turns().len(), 2);
        assert_eq!(loaded[0].title(), "first...");
    }

    #[tokio::test]
    async fn test_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path());
        store.save_session(&session("old", Some("one"))).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.save_session(&session("new", Some("two"))).await.unwrap();

        let ids: Vec<String> = store
            .load_sessions()
            .await
            .unwrap()
            .iter()
            .map(|s| s.id().to_string())
            .collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path());
        store.save_session(&session("a", Some("x"))).await.unwrap();
        store.save_session(&session("b", Some("y"))).await.unwrap();

        assert!(store.delete_session("a").await.unwrap());
        assert!(!store.delete_session("a").await.unwrap());
        assert_eq!(store.load_sessions().await.unwrap().len(), 1);

        store.clear_sessions().await.unwrap();
        assert!(store.load_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sessions.json"), "{oops").unwrap();
        let store = JsonFileSessionStore::new(dir.path());
        assert!(matches!(
            store.load_sessions().await,
            Err(StoreError::Serialization(_))
        ));
    }
}
